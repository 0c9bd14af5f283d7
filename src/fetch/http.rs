//! `reqwest`-backed fetcher.

use async_trait::async_trait;
use url::Url;

use super::{FetchError, FetchRequest, Fetcher, REQUESTED_WITH_HEADER};

/// Fetches over HTTP, resolving relative URLs against a base location.
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Option<Url>,
    headers: Vec<(String, String)>,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base: None,
            headers: Vec::new(),
        }
    }

    /// Send these headers with every request, before the request's own.
    pub fn with_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.headers.extend(headers);
        self
    }

    /// Resolve relative region/frame URLs against `base`.
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Absolute URL for `raw`.
    pub fn resolve(&self, raw: &str) -> Result<Url, FetchError> {
        match (Url::parse(raw), &self.base) {
            (Ok(url), _) => Ok(url),
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => base.join(raw),
            (Err(e), _) => Err(e),
        }
        .map_err(|source| FetchError::InvalidUrl {
            url: raw.to_string(),
            source,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<String, FetchError> {
        let url = self.resolve(&request.url)?;
        crate::debug!("fetch"; "GET {}", url);

        let mut builder = self
            .client
            .get(url.clone())
            .header(REQUESTED_WITH_HEADER.0, REQUESTED_WITH_HEADER.1);
        for (name, value) in self.headers.iter().chain(&request.headers) {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = builder.send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(request_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute() {
        let fetcher = HttpFetcher::default();
        let url = fetcher.resolve("https://example.com/todos").unwrap();
        assert_eq!(url.as_str(), "https://example.com/todos");
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let fetcher =
            HttpFetcher::default().with_base(Url::parse("https://example.com/boards/1").unwrap());
        let url = fetcher.resolve("/todos?page=2").unwrap();
        assert_eq!(url.as_str(), "https://example.com/todos?page=2");
    }

    #[test]
    fn test_resolve_relative_without_base_fails() {
        let fetcher = HttpFetcher::default();
        assert!(matches!(
            fetcher.resolve("/todos"),
            Err(FetchError::InvalidUrl { .. })
        ));
    }
}
