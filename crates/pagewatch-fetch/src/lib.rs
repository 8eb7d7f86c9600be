//! # Pagewatch Fetch
//! The fetch/extract collaborator: GET the page, strip it down to visible
//! text, fingerprint it.
//!
//! Extraction is deliberately dumb — drop `<script>`/`<style>` blocks,
//! drop tags, collapse whitespace. Change detection needs a stable
//! normalized text, not a DOM.

use sha2::{Digest, Sha256};

use pagewatch_core::error::{PagewatchError, Result};
use pagewatch_core::traits::Fetcher;
use pagewatch_core::types::ExecutionResult;

const USER_AGENT: &str = concat!("pagewatch/", env!("CARGO_PKG_VERSION"));

/// HTTP fetcher with text extraction and SHA-256 fingerprinting.
pub struct SiteFetcher {
    client: reqwest::Client,
}

impl SiteFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PagewatchError::Fetch(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &str) -> Result<ExecutionResult> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PagewatchError::Fetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(ExecutionResult::failure(format!("HTTP {status} from {url}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PagewatchError::Fetch(format!("read body of {url}: {e}")))?;

        let extracted = extract_text(&body);
        if extracted.is_empty() {
            return Ok(ExecutionResult::failure(format!(
                "no extractable content at {url}"
            )));
        }

        let hash = fingerprint(&extracted);
        tracing::debug!("fetched {url}: {} chars, hash {}", extracted.len(), &hash[..12]);
        Ok(ExecutionResult::success(hash, extracted, body))
    }
}

/// Hex SHA-256 of the normalized text.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Reduce an HTML document to normalized visible text. Plain-text bodies
/// pass through with whitespace collapsed.
pub fn extract_text(body: &str) -> String {
    let without_blocks = strip_block(&strip_block(body, "script"), "style");

    let mut text = String::with_capacity(without_blocks.len() / 4);
    let mut in_tag = false;
    for ch in without_blocks.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Tag boundaries separate words ("</td><td>").
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `<tag ...>...</tag>` blocks wholesale, case-insensitively.
fn strip_block(body: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut out = String::with_capacity(body.len());
    let mut pos = 0;
    while let Some(start) = find_ascii_ci(body, &open, pos) {
        out.push_str(&body[pos..start]);
        match find_ascii_ci(body, &close, start) {
            Some(end) => pos = end + close.len(),
            None => {
                // Unterminated block: drop the remainder.
                return out;
            }
        }
    }
    out.push_str(&body[pos..]);
    out
}

/// Byte-wise ASCII-case-insensitive substring search starting at `from`.
/// Matches always begin at `<`, so returned offsets are char boundaries.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < from + n.len() {
        return None;
    }
    (from..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_visible_text_only() {
        let html = r#"<html><head><title>T</title>
            <script>var x = "ignored";</script>
            <style>body { color: red; }</style></head>
            <body><h1>Hello</h1><p>world <b>again</b></p></body></html>"#;
        assert_eq!(extract_text(html), "T Hello world again");
    }

    #[test]
    fn tag_boundaries_separate_words() {
        assert_eq!(extract_text("<td>a</td><td>b</td>"), "a b");
    }

    #[test]
    fn plain_text_passes_through_normalized() {
        assert_eq!(extract_text("  plain\n\ttext  "), "plain text");
    }

    #[test]
    fn unterminated_script_drops_remainder() {
        assert_eq!(extract_text("<p>ok</p><script>var x"), "ok");
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), 64);
    }
}
