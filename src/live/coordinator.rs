use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashSet;
use tokio::task::JoinHandle;

use super::LiveError;
use super::context::PassContext;
use super::debounce::Debouncer;
use super::page::Page;
use super::region::{REGION_TAG, Region, RegionOutcome, region_selector};
use crate::diagnostics::{CancelReason, PassId};
use crate::dom::{NodeId, Selector};
use crate::transport::{Notification, Subscription, Transport};

/// Result of one `update` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Cancelled(CancelReason),
    Completed(PassSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub pass: PassId,
    /// Distinct URLs requested.
    pub fetched: usize,
    pub patched: usize,
    pub aborted: usize,
}

/// Drives passes for one region element.
///
/// Every region has its own coordinator; coordinators sharing an identifier
/// all receive each notification, and all but the first in document order
/// stand down.
#[derive(Clone)]
pub struct Coordinator {
    page: Arc<Page>,
    element: NodeId,
    identifier: String,
    debounce: Duration,
}

impl Coordinator {
    pub fn new(page: Arc<Page>, element: NodeId) -> Result<Self, LiveError> {
        let (identifier, debounce) = {
            let document = page.document();
            if document.tag_name(element) != Some(REGION_TAG) {
                return Err(LiveError::NotARegion);
            }
            let identifier = document
                .attr(element, "identifier")
                .ok_or(LiveError::MissingIdentifier)?
                .to_string();
            let debounce = match document.attr(element, "debounce") {
                Some(value) => leading_millis(value).unwrap_or_else(|| {
                    crate::debug!("live"; "{}: ignoring debounce `{}`", identifier, value);
                    page.settings().default_debounce
                }),
                None => page.settings().default_debounce,
            };
            (identifier, debounce)
        };

        Ok(Self {
            page,
            element,
            identifier,
            debounce,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Live-document query for this coordinator's candidates.
    pub fn query(&self) -> Selector {
        region_selector(&self.identifier)
    }

    /// Subscribe and start handling notifications in the background.
    ///
    /// Preview documents never subscribe. Without a transport the
    /// configuration error is logged and returned.
    pub async fn connect(self, transport: Option<&dyn Transport>) -> Result<Connection, LiveError> {
        if self.page.document().is_preview() {
            return Err(LiveError::Preview);
        }
        let Some(transport) = transport else {
            crate::log!("error"; "{}", LiveError::NoTransport);
            return Err(LiveError::NoTransport);
        };

        let subscription = transport
            .subscribe(&self.page.settings().channel, &self.identifier)
            .await?;
        crate::debug!("live"; "{} subscribed (debounce {:?})", self.identifier, self.debounce);

        let identifier = self.identifier.clone();
        let task = tokio::spawn(self.run(subscription));
        Ok(Connection { identifier, task })
    }

    /// Debounce notifications and run a pass for each settled burst.
    async fn run(self, mut subscription: Subscription) {
        let mut debouncer = Debouncer::new(self.debounce);

        loop {
            tokio::select! {
                biased;
                received = subscription.recv() => match received {
                    Some(notification) => debouncer.add(notification),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if let Some(notification) = debouncer.take_if_ready() {
                        self.update(&notification).await;
                    }
                }
            }
        }
        crate::debug!("live"; "{} subscription closed", self.identifier);
    }

    /// Run one reconciliation pass for `notification`.
    pub async fn update(&self, notification: &Notification) -> PassOutcome {
        let pass = PassId::next();
        let log = self.page.log();
        let location = self.page.location();

        let (regions, active_element) = {
            let document = self.page.document();
            let candidates = document.query_selector_all(document.root(), &self.query());
            log.request(pass, &self.identifier, notification, candidates.len());

            if candidates.first() != Some(&self.element) {
                log.cancel(pass, CancelReason::AlreadyRequested);
                return PassOutcome::Cancelled(CancelReason::AlreadyRequested);
            }

            let regions: Vec<(Region, String)> = candidates
                .into_iter()
                .map(Region::new)
                .filter(|region| region.should_update(&document, notification))
                .map(|region| {
                    let url = region.url(&document, &location);
                    (region, url)
                })
                .collect();
            (regions, document.active_element())
        };

        if regions.is_empty() {
            log.cancel(pass, CancelReason::FilteredOut);
            return PassOutcome::Cancelled(CancelReason::FilteredOut);
        }

        let mut ctx = PassContext::new(pass, active_element);

        let mut seen = FxHashSet::default();
        let urls: Vec<&str> = regions
            .iter()
            .map(|(_, url)| url.as_str())
            .filter(|url| seen.insert(*url))
            .collect();
        let fetched = ctx.store.fetch_all(self.page.fetcher(), &urls).await;
        log.response(pass, &urls);

        let mut summary = PassSummary {
            pass,
            fetched,
            patched: 0,
            aborted: 0,
        };
        for (region, url) in &regions {
            let index = ctx.index.next_index(url);
            match region.process(&self.page, &ctx, url, index).await {
                RegionOutcome::Patched(_) => summary.patched += 1,
                RegionOutcome::Aborted { .. } | RegionOutcome::Discarded => summary.aborted += 1,
            }
        }
        PassOutcome::Completed(summary)
    }
}

/// Milliseconds from the leading digits of `value`, so `"150ms"` reads as 150.
fn leading_millis(value: &str) -> Option<Duration> {
    let value = value.trim_start();
    let value = value.strip_prefix('+').unwrap_or(value);
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok().map(Duration::from_millis)
}

/// A connected coordinator. Dropping it unsubscribes.
pub struct Connection {
    identifier: String,
    task: JoinHandle<()>,
}

impl Connection {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether the subscription ended on the transport side.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn disconnect(self) {}
}

impl Drop for Connection {
    fn drop(&mut self) {
        crate::debug!("live"; "{} disconnected", self.identifier);
        self.task.abort();
    }
}
