use futures::future::join_all;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::fetch::{FetchRequest, Fetcher, graciously_fetch};

/// URL → fetched document text for one pass.
#[derive(Debug, Default)]
pub struct FragmentStore {
    documents: FxHashMap<String, String>,
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every URL not already stored, concurrently.
    ///
    /// Each distinct URL is requested once, no matter how often it appears in
    /// `urls` or in earlier calls. Failed URLs stay absent. Returns the
    /// number of requests issued.
    pub async fn fetch_all<S: AsRef<str>>(&mut self, fetcher: &dyn Fetcher, urls: &[S]) -> usize {
        let mut seen = FxHashSet::default();
        let missing: Vec<&str> = urls
            .iter()
            .map(AsRef::as_ref)
            .filter(|url| !self.documents.contains_key(*url) && seen.insert(*url))
            .collect();

        let responses = join_all(missing.iter().map(|&url| async move {
            (url, graciously_fetch(fetcher, FetchRequest::update(url)).await)
        }))
        .await;

        for (url, body) in responses {
            if let Some(body) = body {
                self.documents.insert(url.to_string(), body);
            }
        }

        missing.len()
    }

    /// Cached text for `url`, if its fetch succeeded.
    pub fn get(&self, url: &str) -> Option<&str> {
        self.documents.get(url).map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.documents.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
