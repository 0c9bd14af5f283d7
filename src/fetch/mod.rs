//! Fragment fetching.
//!
//! The engine never talks HTTP directly: every GET goes through a `Fetcher`,
//! so the live page can use [`HttpFetcher`] while tests count calls.

mod http;

pub use http::HttpFetcher;

use async_trait::async_trait;
use thiserror::Error;

/// Marks a request as a reconciliation fetch.
pub const RECONCILE_HEADER: (&str, &str) = ("X-Cable-Ready", "update");

/// Names the frame a nested fetch is resolving.
pub const FRAME_HEADER: &str = "Turbo-Frame";

/// Sent with every fetch so servers can render a partial layout.
pub const REQUESTED_WITH_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to `{url}` failed: {message}")]
    Request { url: String, message: String },
    #[error("`{url}` responded with status {status}")]
    Status { url: String, status: u16 },
}

/// One outbound GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    /// A reconciliation fetch for a region's URL.
    pub fn update(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![(RECONCILE_HEADER.0.to_string(), RECONCILE_HEADER.1.to_string())],
        }
    }

    /// A reconciliation fetch for a nested frame.
    pub fn frame(url: impl Into<String>, frame_id: &str) -> Self {
        Self::update(url).with_header(FRAME_HEADER, frame_id)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP GET primitive returning the response body as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<String, FetchError>;
}

/// Fetch, logging failures instead of returning them.
///
/// A failed URL yields `None`; callers degrade (skip a region, empty a frame)
/// rather than aborting the pass.
pub async fn graciously_fetch(fetcher: &dyn Fetcher, request: FetchRequest) -> Option<String> {
    let url = request.url.clone();
    match fetcher.fetch(request).await {
        Ok(body) => Some(body),
        Err(e) => {
            crate::log!("error"; "could not fetch {}: {}", url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl Fetcher for Failing {
        async fn fetch(&self, request: FetchRequest) -> Result<String, FetchError> {
            Err(FetchError::Status {
                url: request.url,
                status: 502,
            })
        }
    }

    #[test]
    fn test_frame_request_headers() {
        let request = FetchRequest::frame("/comments", "comments_frame");
        assert_eq!(request.header("x-cable-ready"), Some("update"));
        assert_eq!(request.header("Turbo-Frame"), Some("comments_frame"));
    }

    #[test]
    fn test_update_request_has_no_frame_header() {
        let request = FetchRequest::update("/x");
        assert_eq!(request.header(FRAME_HEADER), None);
    }

    #[tokio::test]
    async fn test_graciously_fetch_swallows_errors() {
        let body = graciously_fetch(&Failing, FetchRequest::update("/down")).await;
        assert!(body.is_none());
    }
}
