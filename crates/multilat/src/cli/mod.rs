//! Command-line entry points for the four roles. Configuration layers,
//! lowest to highest priority: TOML config file, environment
//! variables, CLI arguments.

pub mod client;
pub mod logging;
pub mod network;
pub mod node;
pub mod target;
