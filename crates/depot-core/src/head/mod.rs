//! HEAD probe for content metadata.
//!
//! Resolves redirects and reports the effective URL so the ranged GETs go
//! straight to the final host, plus the headers the planner and filename
//! derivation need.

mod parse;

use anyhow::{Context, Result};
use std::str;
use std::time::Duration;

/// Metadata learned from the HEAD response.
#[derive(Debug, Clone)]
pub struct HeadResult {
    /// Post-redirect URL the ranged GETs should target.
    pub effective_url: String,
    /// Total size in bytes, if `Content-Length` was present.
    pub content_length: Option<u64>,
    /// True if the server advertised `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `Content-Disposition` value, a filename hint.
    pub content_disposition: Option<String>,
}

/// Performs the HEAD request with the given Referer, following redirects.
pub fn probe(url: &str, referer: &str) -> Result<HeadResult> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.nobody(true)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.referer(referer)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(30))?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform().context("HEAD request failed")?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("HEAD {} returned HTTP {}", url, code);
    }
    let effective_url = easy
        .effective_url()
        .context("no effective URL")?
        .unwrap_or(url)
        .to_string();

    Ok(parse::parse_head(effective_url, &lines))
}
