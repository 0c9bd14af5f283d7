//! Headless live-region reconciliation.
//!
//! A document declares `<updates-for identifier="…">` regions. When the
//! server pushes a notification for an identifier, the first region in
//! document order fetches fresh HTML once per URL, resolves eager
//! `<turbo-frame>`s inside it, and morphs every matching region's children in
//! place, keeping focus and permanent nodes intact.
//!
//! # Module Structure
//!
//! - `live` - pages, coordinators, regions: the reconciliation engine
//! - `fragment` - per-pass fetch cache and fragment positions
//! - `frame` - recursive eager turbo-frame loading
//! - `patch` - the keyed morph applied to each region
//! - `dom` - arena HTML document with selector queries
//! - `fetch` - HTTP GET seam
//! - `transport` - notification subscriptions (in-process, Action Cable)
//! - `diagnostics` - pass lifecycle log
//! - `config`, `cli`, `logger` - the `updates-for` command

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod fetch;
pub mod fragment;
pub mod frame;
pub mod live;
pub mod logger;
pub mod patch;
pub mod transport;
mod utils;

#[cfg(test)]
mod testing;

pub use live::{Coordinator, Page, PassOutcome};
pub use transport::Notification;
