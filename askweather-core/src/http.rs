//! Helpers shared by the HTTP-backed collaborators.

use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Build a pooled client with a per-request timeout.
pub(crate) fn client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
        warn!("falling back to default HTTP client: {err}");
        Client::new()
    })
}

/// Cap an error body at 200 characters for messages and logs.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "都".repeat(300);
        let out = truncate_body(&long);

        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_body_keeps_exactly_the_limit() {
        let exact = "a".repeat(200);
        assert_eq!(truncate_body(&exact), exact);
    }
}
