//! Subcommand implementations

pub mod forecast;
pub mod piles;
pub mod predict;
pub mod upload;
pub mod weather;
