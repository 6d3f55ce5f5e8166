//! # komon-agent
//!
//! The agent side of komon.
//!
//! - [`LlmAgent`] runs the model / tool loop for one turn
//! - [`Runner`] ties an agent to a [`SessionService`] so turns share history
//! - [`gov_doc_parser()`] builds the root agent over a [`komon_tool::ClientRegistry`]

pub mod context;
pub mod gov_doc_parser;
pub mod llm_agent;
pub mod runner;
pub mod session;

pub use context::AgentInvocation;
pub use gov_doc_parser::{AGENT_NAME, APP_NAME, gov_doc_parser, gov_doc_parser_builder};
pub use llm_agent::{DEFAULT_MAX_ITERATIONS, LlmAgent, LlmAgentBuilder};
pub use runner::{Runner, RunnerConfig};
pub use session::{CreateRequest, GetRequest, InMemorySessionService, Session, SessionService};
