//! Notification transport.
//!
//! A coordinator subscribes once per region identifier and receives
//! [`Notification`]s on a [`Subscription`]. Two transports exist:
//!
//! - [`ChannelTransport`] - in-process hub, notifications are broadcast by code
//! - [`CableTransport`] - Action Cable consumer over a WebSocket
//!
//! Dropping a `Subscription` unsubscribes.

mod cable;
mod channel;

pub use cable::CableTransport;
pub use channel::ChannelTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel name every `updates-for` region subscribes to.
pub const STREAM_CHANNEL: &str = "CableReady::Stream";

/// A server-side signal that data behind an identifier changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub identifier: String,
    /// Tags describing what changed. `None` means "anything may have changed".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed: Option<Vec<String>>,
}

impl Notification {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            changed: None,
        }
    }

    pub fn with_changed<I, S>(mut self, changed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed = Some(changed.into_iter().map(Into::into).collect());
        self
    }

    /// Fold a later notification into this one.
    ///
    /// The changed tags are unioned; if either side carries no tag list the
    /// result carries none, since that side may have changed anything.
    pub fn merge(&mut self, later: Notification) {
        self.identifier = later.identifier;
        self.changed = match (self.changed.take(), later.changed) {
            (Some(mut tags), Some(more)) => {
                for tag in more {
                    if !tags.contains(&tag) {
                        tags.push(tag);
                    }
                }
                Some(tags)
            }
            _ => None,
        };
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to `{url}`: {message}")]
    Connect { url: String, message: String },
    #[error("transport is closed")]
    Closed,
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Live stream of notifications for one identifier.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Notification>,
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        rx: mpsc::UnboundedReceiver<Notification>,
        on_drop: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            rx,
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Next notification, or `None` once the transport side closed.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.on_drop.take() {
            unsubscribe();
        }
    }
}

/// Subscribes region identifiers to a notification source.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn subscribe(&self, channel: &str, identifier: &str) -> Result<Subscription, TransportError>;
}
