//! Region update events.
//!
//! Listeners see every region patch twice: `before-update` may adjust the
//! operation (swap the source fragment, pick a focus target), `after-update`
//! observes the patched document.

use crate::dom::{Document, NodeId};

pub const BEFORE_UPDATE: &str = "before-update";
pub const AFTER_UPDATE: &str = "after-update";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEvent {
    BeforeUpdate,
    AfterUpdate,
}

impl UpdateEvent {
    pub fn name(self) -> &'static str {
        match self {
            Self::BeforeUpdate => BEFORE_UPDATE,
            Self::AfterUpdate => AFTER_UPDATE,
        }
    }
}

/// One region patch, as seen by listeners.
#[derive(Debug, Clone)]
pub struct UpdateOperation {
    /// Live region element being patched.
    pub element: NodeId,
    /// Fetched response with frames resolved.
    pub html: Document,
    /// Fragment inside `html` whose children become the region's children.
    pub source: NodeId,
    pub permanent_attribute_name: String,
    /// Element to focus after the patch, overriding the captured one.
    pub focus_selector: Option<String>,
}

pub type UpdateListener = Box<dyn Fn(UpdateEvent, &mut UpdateOperation, &Document) + Send + Sync>;

/// Registered update listeners, called in registration order.
#[derive(Default)]
pub struct Listeners {
    listeners: Vec<UpdateListener>,
}

impl Listeners {
    pub fn add(&mut self, listener: UpdateListener) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn dispatch(&self, event: UpdateEvent, operation: &mut UpdateOperation, document: &Document) {
        crate::debug!("event"; "{} on {:?}", event.name(), operation.element);
        for listener in &self.listeners {
            listener(event, operation, document);
        }
    }
}
