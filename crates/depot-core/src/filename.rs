//! Default output-name derivation for downloads.
//!
//! Prefers a Content-Disposition filename, falls back to the last URL path
//! segment, and sanitizes the result for Linux filesystems.

const FALLBACK: &str = "download.bin";
const NAME_MAX: usize = 255;

/// Derives a safe local filename for a download.
pub fn derive_output_name(url: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(disposition_filename)
        .or_else(|| last_path_segment(url));

    let Some(raw) = candidate else {
        return FALLBACK.to_string();
    };
    let clean = sanitize(&raw);
    if clean.is_empty() || clean == "." || clean == ".." {
        FALLBACK.to_string()
    } else {
        clean
    }
}

/// `filename=` parameter of a Content-Disposition value, unquoted.
fn disposition_filename(value: &str) -> Option<String> {
    let part = value
        .split(';')
        .map(str::trim)
        .find_map(|p| p.strip_prefix("filename="))?;
    let name = part.trim().trim_matches('"').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}

fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    out = out.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string();
    while out.len() > NAME_MAX || !out.is_char_boundary(out.len().min(NAME_MAX)) {
        out.pop();
    }
    out
}
