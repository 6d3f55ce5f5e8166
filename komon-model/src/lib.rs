//! # komon-model
//!
//! Model providers for the komon agent.
//!
//! - [`GeminiModel`] talks to the hosted Gemini API
//! - [`MockLlm`] replays scripted responses for tests

pub mod gemini;
pub mod mock;
pub mod retry;

pub use gemini::{GeminiConfig, GeminiModel};
pub use mock::MockLlm;
pub use retry::RetryConfig;
