//! # komon-core
//!
//! Core traits and types shared by the komon crates.
//!
//! - [`Agent`] runs one turn of a conversation and streams [`Event`]s
//! - [`Llm`] is a model provider
//! - [`Tool`] is a function the model may call
//! - [`KomonError`] / [`Result`] is the unified error type

pub mod agent;
pub mod callbacks;
pub mod context;
pub mod error;
pub mod event;
pub mod model;
pub mod tool;
pub mod types;

pub use agent::{Agent, EventStream};
pub use callbacks::{AfterToolCallback, ToolInvocation};
pub use context::{InvocationContext, ReadonlyContext};
pub use error::{KomonError, Result};
pub use event::Event;
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata,
};
pub use tool::{Tool, ToolContext, function_declaration};
pub use types::{Content, FunctionResponseData, Part};
