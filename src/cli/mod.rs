//! Command-line interface module.

mod args;
pub mod mirror;
pub mod regions;

pub use args::{Cli, Commands};
