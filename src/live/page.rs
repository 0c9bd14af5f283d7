use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};

use super::coordinator::{Connection, Coordinator};
use super::debounce::DEFAULT_DEBOUNCE_MS;
use super::events::{Listeners, UpdateListener};
use super::region::REGION_TAG;
use crate::diagnostics::PassLog;
use crate::dom::{Document, NodeId, Selector};
use crate::fetch::Fetcher;
use crate::frame::DEFAULT_MAX_FRAME_DEPTH;
use crate::patch::{MorphPatcher, PERMANENT_ATTRIBUTE, Patcher};
use crate::transport::{STREAM_CHANNEL, Transport};

/// Knobs shared by every region on a page.
#[derive(Debug, Clone)]
pub struct LiveSettings {
    /// Channel coordinators subscribe to.
    pub channel: String,
    /// Window for regions without a `debounce` attribute.
    pub default_debounce: Duration,
    pub max_frame_depth: usize,
    pub permanent_attribute: String,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            channel: STREAM_CHANNEL.to_string(),
            default_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            max_frame_depth: DEFAULT_MAX_FRAME_DEPTH,
            permanent_attribute: PERMANENT_ATTRIBUTE.to_string(),
        }
    }
}

/// The live document and everything a pass needs around it.
///
/// Shared by all coordinators through an `Arc`. The document lock is only
/// held for synchronous stretches, never across a fetch.
pub struct Page {
    document: Mutex<Document>,
    location: RwLock<String>,
    fetcher: Arc<dyn Fetcher>,
    patcher: Arc<dyn Patcher>,
    listeners: RwLock<Listeners>,
    log: PassLog,
    settings: LiveSettings,
}

impl Page {
    pub fn new(document: Document, location: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            document: Mutex::new(document),
            location: RwLock::new(location.into()),
            fetcher,
            patcher: Arc::new(MorphPatcher),
            listeners: RwLock::new(Listeners::default()),
            log: PassLog::new(),
            settings: LiveSettings::default(),
        }
    }

    pub fn with_patcher(mut self, patcher: Arc<dyn Patcher>) -> Self {
        self.patcher = patcher;
        self
    }

    pub fn with_settings(mut self, settings: LiveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_log(mut self, log: PassLog) -> Self {
        self.log = log;
        self
    }

    /// Lock the live document.
    pub fn document(&self) -> MutexGuard<'_, Document> {
        self.document.lock()
    }

    /// Current document location, the default region URL.
    pub fn location(&self) -> String {
        self.location.read().clone()
    }

    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.write() = location.into();
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        &*self.fetcher
    }

    pub fn patcher(&self) -> &dyn Patcher {
        &*self.patcher
    }

    pub fn log(&self) -> &PassLog {
        &self.log
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    pub fn on_update(&self, listener: UpdateListener) {
        self.listeners.write().add(listener);
    }

    pub(crate) fn listeners(&self) -> parking_lot::RwLockReadGuard<'_, Listeners> {
        self.listeners.read()
    }

    /// Every region element in document order.
    pub fn regions(&self) -> Vec<NodeId> {
        let document = self.document();
        document.query_selector_all(document.root(), &Selector::tag(REGION_TAG))
    }

    /// Create and connect a coordinator for every region.
    ///
    /// Regions that cannot connect are logged and skipped.
    pub async fn connect_all(self: &Arc<Self>, transport: Option<&dyn Transport>) -> Vec<Connection> {
        let mut connections = Vec::new();
        for element in self.regions() {
            let coordinator = match Coordinator::new(Arc::clone(self), element) {
                Ok(coordinator) => coordinator,
                Err(e) => {
                    crate::log!("error"; "{}", e);
                    continue;
                }
            };
            match coordinator.connect(transport).await {
                Ok(connection) => connections.push(connection),
                Err(e) => crate::debug!("live"; "region not connected: {}", e),
            }
        }
        connections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    #[test]
    fn test_regions_in_document_order() {
        let page = Page::new(
            Document::parse(
                r#"<div><updates-for identifier="a"></updates-for></div><updates-for identifier="b"></updates-for>"#,
            ),
            "http://example.test/",
            Arc::new(MockFetcher::new()),
        );
        let regions = page.regions();
        let document = page.document();
        let ids: Vec<_> = regions
            .iter()
            .filter_map(|&r| document.attr(r, "identifier"))
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_location_is_mutable() {
        let page = Page::new(Document::new(), "/one", Arc::new(MockFetcher::new()));
        page.set_location("/two");
        assert_eq!(page.location(), "/two");
        assert_eq!(page.settings().default_debounce, Duration::from_millis(20));
    }
}
