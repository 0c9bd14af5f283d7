//! Live regions.
//!
//! An `<updates-for identifier="…">` element is a region: whenever a
//! notification for its identifier arrives, its children are refreshed from
//! freshly fetched HTML.
//!
//! # Architecture
//!
//! ```text
//! Transport ──Notification──► Coordinator (one per region) ──debounce──► update()
//!                                                                          │
//!      leader? ─no─► cancel "update already requested"                     │
//!        │yes                                                              │
//!      filter ─empty─► cancel "all elements filtered out"                  │
//!        │                                                                 │
//!      FragmentStore (one GET per URL) ─► Region::process × N ─► Patcher ◄─┘
//! ```
//!
//! Leader election needs no coordination: every coordinator sharing an
//! identifier computes the same candidate list from the live document, and
//! only the first in document order does the work.
//!
//! # Module Structure
//!
//! - `page` - the live document plus its collaborators
//! - `coordinator` - subscription, debounce, leader election, pass driver
//! - `region` - per-region filtering and patching
//! - `context` - state scoped to one pass
//! - `events` - `before-update` / `after-update` listeners
//! - `debounce` - trailing-edge notification coalescing

mod context;
mod coordinator;
mod debounce;
mod events;
mod page;
mod region;

pub use context::PassContext;
pub use coordinator::{Connection, Coordinator, PassOutcome, PassSummary};
pub use debounce::DEFAULT_DEBOUNCE_MS;
pub use events::{
    AFTER_UPDATE, BEFORE_UPDATE, Listeners, UpdateEvent, UpdateListener, UpdateOperation,
};
pub use page::{LiveSettings, Page};
pub use region::{Region, RegionOutcome, REGION_TAG, region_selector};

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("element is not an `updates-for` region")]
    NotARegion,
    #[error("`updates-for` element has no `identifier` attribute")]
    MissingIdentifier,
    #[error(
        "The `updates-for` helper cannot connect. You must initialize CableReady with an Action Cable consumer."
    )]
    NoTransport,
    #[error("preview documents do not subscribe")]
    Preview,
    #[error(transparent)]
    Transport(#[from] TransportError),
}
