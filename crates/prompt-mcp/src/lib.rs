//! prompt-mcp
//!
//! A Model Context Protocol server that exposes a catalogue of
//! parameterised prompt templates as invocable tools. Prompts come from
//! git or local repositories, hot-reload on change, and swap in with no
//! interval during which a surviving tool is unregistered.

pub mod builtins;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod resources;
pub mod server;

pub use error::{Error, Result};
pub use registry::DynamicToolRegistry;
pub use server::{PromptMcpServer, ServerState, WatchSet};
