//! Configuration sections, one per `updates-for.toml` table.

mod cable;
mod fetch;
mod live;
mod log;

pub use cable::CableConfig;
pub use fetch::FetchConfig;
pub use live::LiveSectionConfig;
pub use log::LogConfig;
