//! Test doubles shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::fetch::{FetchError, FetchRequest, Fetcher};

/// Fetcher serving canned bodies and recording every request.
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct MockFetcher {
    routes: FxHashMap<String, String>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), body.to_string());
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub(crate) fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<String, FetchError> {
        self.requests.lock().push(request.clone());
        tokio::task::yield_now().await;
        self.routes
            .get(&request.url)
            .cloned()
            .ok_or(FetchError::Status {
                url: request.url,
                status: 404,
            })
    }
}
