//! Gemini provider.
//!
//! ```rust,ignore
//! use komon_model::gemini::{GeminiConfig, GeminiModel};
//!
//! let model = GeminiModel::new(GeminiConfig::new(api_key, "gemini-2.5-pro"))?;
//! ```

mod client;
mod config;
mod convert;

pub use client::GeminiModel;
pub use config::{DEFAULT_GEMINI_MODEL, GEMINI_API_BASE, GeminiConfig};
