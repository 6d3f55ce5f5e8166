//! # komon-cli
//!
//! The `komon` command: `tools`, `run`, `analyze` and `chat`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod telemetry;

pub use cli::{Cli, Commands};
pub use config::KomonConfig;
pub use telemetry::init_telemetry;
