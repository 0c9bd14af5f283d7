//! Per-pass fragment bookkeeping.
//!
//! - `store` - URL → fetched document text, one fetch per URL per pass
//! - `index` - URL → cursor handing out fragment positions in processing order
//!
//! Both are owned by a single pass context and dropped with it; nothing here
//! survives from one pass to the next.

mod index;
mod store;

pub use index::FragmentIndex;
pub use store::FragmentStore;
