//! # komon-tool
//!
//! Tools exposed to the komon agent.
//!
//! - [`ClientRegistry`] holds the static list of client names
//! - [`client`] implements the step 1 lookup and the step 2 form fill
//! - [`FunctionTool`] adapts an async closure to [`komon_core::Tool`]

pub mod client;
pub mod function_tool;
pub mod registry;

pub use client::{
    ClientNameArgs, LookupResult, ProcessDetails, ProcessResult, STEP1_TOOL_NAME, STEP2_TOOL_NAME,
    client_tools, get_client_info, process_client_data, step1_tool, step2_tool,
};
pub use function_tool::FunctionTool;
pub use registry::ClientRegistry;
