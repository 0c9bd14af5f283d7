//! Pass lifecycle diagnostics.
//!
//! Every reconciliation pass gets a `PassId`; each step of the pass is
//! reported against it so interleaved passes stay readable:
//!
//! ```text
//! [pass] #4 request todos (changed: title) 3 region(s)
//! [pass] #5 cancel: update already requested
//! [pass] #4 response /boards/1
//! [morph] #4 start <updates-for> 12
//! [morph] #4 end <updates-for> 12 (2 updated, 1 inserted, 0 removed, 1 preserved)
//! ```
//!
//! Output goes through `debug!`. A `PassLog` built with [`PassLog::recording`]
//! also keeps the entries in memory.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::dom::NodeId;
use crate::logger::clock;
use crate::patch::MorphStats;
use crate::transport::Notification;

static NEXT_PASS: AtomicU64 = AtomicU64::new(1);

/// Identifies one reconciliation pass in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u64);

impl PassId {
    /// Allocate the next pass id. Ids increase monotonically per process.
    pub fn next() -> Self {
        Self(NEXT_PASS.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a coordinator stood down from a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Another region earlier in document order leads this pass.
    AlreadyRequested,
    /// No region accepted the notification.
    FilteredOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AlreadyRequested => "update already requested",
            Self::FilteredOut => "all elements filtered out",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassEvent {
    Request {
        identifier: String,
        changed: Option<Vec<String>>,
        regions: usize,
    },
    Response {
        urls: Vec<String>,
    },
    MorphStart {
        region: NodeId,
    },
    MorphEnd {
        region: NodeId,
        stats: MorphStats,
    },
    /// The response held fewer matching fragments than regions sharing the URL.
    Aborted {
        url: String,
        index: usize,
        found: usize,
    },
    Cancel(CancelReason),
}

impl fmt::Display for PassEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request {
                identifier,
                changed,
                regions,
            } => {
                write!(f, "request {identifier}")?;
                if let Some(changed) = changed {
                    write!(f, " (changed: {})", changed.join(", "))?;
                }
                write!(f, " {regions} region(s)")
            }
            Self::Response { urls } => write!(f, "response {}", urls.join(" ")),
            Self::MorphStart { region } => write!(f, "start {region:?}"),
            Self::MorphEnd { region, stats } => write!(
                f,
                "end {region:?} ({} updated, {} inserted, {} removed, {} preserved)",
                stats.updated, stats.inserted, stats.removed, stats.preserved
            ),
            Self::Aborted { url, index, found } => write!(
                f,
                "aborted: fragment {index} requested, {found} found at {url}"
            ),
            Self::Cancel(reason) => write!(f, "cancel: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub pass: PassId,
    /// Wall clock (UTC) when the entry was written.
    pub at: String,
    pub event: PassEvent,
}

/// Sink for pass lifecycle events.
#[derive(Debug, Default)]
pub struct PassLog {
    recording: bool,
    entries: Mutex<Vec<LogEntry>>,
}

impl PassLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log that also keeps every entry for later inspection.
    pub fn recording() -> Self {
        Self {
            recording: true,
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn request(&self, pass: PassId, identifier: &str, notification: &Notification, regions: usize) {
        self.push(
            pass,
            PassEvent::Request {
                identifier: identifier.to_string(),
                changed: notification.changed.clone(),
                regions,
            },
        );
    }

    pub fn response(&self, pass: PassId, urls: &[&str]) {
        self.push(
            pass,
            PassEvent::Response {
                urls: urls.iter().map(|u| u.to_string()).collect(),
            },
        );
    }

    pub fn morph_start(&self, pass: PassId, region: NodeId) {
        self.push(pass, PassEvent::MorphStart { region });
    }

    pub fn morph_end(&self, pass: PassId, region: NodeId, stats: MorphStats) {
        self.push(pass, PassEvent::MorphEnd { region, stats });
    }

    /// Always printed, not only in verbose mode.
    pub fn aborted(&self, pass: PassId, url: &str, index: usize, found: usize) {
        crate::log!(
            "warn";
            "update aborted due to insufficient number of elements. The offending url is {}.",
            url
        );
        self.push(
            pass,
            PassEvent::Aborted {
                url: url.to_string(),
                index,
                found,
            },
        );
    }

    pub fn cancel(&self, pass: PassId, reason: CancelReason) {
        self.push(pass, PassEvent::Cancel(reason));
    }

    fn push(&self, pass: PassId, event: PassEvent) {
        let module = match event {
            PassEvent::MorphStart { .. } | PassEvent::MorphEnd { .. } => "morph",
            _ => "pass",
        };
        crate::debug!(module; "{} {}", pass, event);

        if self.recording {
            self.entries.lock().push(LogEntry {
                pass,
                at: clock(),
                event,
            });
        }
    }

    /// Recorded entries, oldest first. Empty unless recording.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Recorded cancellations, oldest first.
    pub fn cancellations(&self) -> Vec<CancelReason> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e.event {
                PassEvent::Cancel(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    /// Recorded entries belonging to `pass`.
    pub fn pass(&self, pass: PassId) -> Vec<PassEvent> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.pass == pass)
            .map(|e| e.event.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_ids_increase() {
        let a = PassId::next();
        let b = PassId::next();
        assert!(b > a);
    }

    #[test]
    fn test_cancel_reason_text() {
        assert_eq!(CancelReason::AlreadyRequested.to_string(), "update already requested");
        assert_eq!(CancelReason::FilteredOut.to_string(), "all elements filtered out");
    }

    #[test]
    fn test_non_recording_log_keeps_nothing() {
        let log = PassLog::new();
        log.cancel(PassId::next(), CancelReason::FilteredOut);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_recording_log_groups_by_pass() {
        let log = PassLog::recording();
        let (first, second) = (PassId::next(), PassId::next());
        log.request(first, "todos", &Notification::new("todos"), 2);
        log.cancel(second, CancelReason::AlreadyRequested);
        log.response(first, &["/todos"]);

        assert_eq!(log.entries().len(), 3);
        assert_eq!(log.cancellations(), vec![CancelReason::AlreadyRequested]);
        assert_eq!(
            log.pass(first),
            vec![
                PassEvent::Request {
                    identifier: "todos".to_string(),
                    changed: None,
                    regions: 2
                },
                PassEvent::Response {
                    urls: vec!["/todos".to_string()]
                },
            ]
        );
    }

    #[test]
    fn test_request_display() {
        let event = PassEvent::Request {
            identifier: "todos".to_string(),
            changed: Some(vec!["title".to_string(), "body".to_string()]),
            regions: 3,
        };
        assert_eq!(event.to_string(), "request todos (changed: title, body) 3 region(s)");
    }
}
