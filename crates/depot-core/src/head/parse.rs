//! Header-line parsing for the HEAD probe.

use super::HeadResult;

/// Folds collected response header lines into a [`HeadResult`]. With
/// redirects in play only the final response's headers matter, so later
/// occurrences of a header win.
pub(crate) fn parse_head(effective_url: String, lines: &[String]) -> HeadResult {
    let mut result = HeadResult {
        effective_url,
        content_length: None,
        accept_ranges: false,
        content_disposition: None,
    };

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            if let Ok(n) = value.parse::<u64>() {
                result.content_length = Some(n);
            }
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            result.accept_ranges = value.eq_ignore_ascii_case("bytes");
        } else if name.eq_ignore_ascii_case("content-disposition") {
            result.content_disposition = Some(value.to_string());
        }
    }
    result
}
