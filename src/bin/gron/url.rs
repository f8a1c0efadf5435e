//! HTTP input: fetching a JSON document straight from a URL.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header;

/// Returns true if the input argument should be fetched rather than
/// opened as a file.
pub fn is_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetches `url` and returns the response body as a reader.
pub fn fetch(url: &str, insecure: bool) -> reqwest::Result<Response> {
    let client = Client::builder()
        .danger_accept_invalid_certs(insecure)
        .timeout(Duration::from_secs(20))
        .build()?;

    client
        .get(url)
        .header(
            header::USER_AGENT,
            concat!("gron/", env!("CARGO_PKG_VERSION")),
        )
        .header(header::ACCEPT, "application/json")
        .send()
}
