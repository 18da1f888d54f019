//! Core engine for prompt-manager
//!
//! Owns the repository lifecycle: source synchronisation, change watching,
//! partial and template management, the authoritative runtime state, and
//! the zero-downtime reload engine that keeps the protocol server's tool
//! set in step with the repositories.

pub mod config;
pub mod error;
pub mod partials;
pub mod reload;
pub mod source;
pub mod store;
pub mod template;
pub mod tools;
pub mod watch;

pub use config::{Config, Language, Transport};
pub use error::{Error, Result};
pub use partials::PartialRegistry;
pub use reload::{ReloadEngine, ReloadIssue, ReloadReport};
pub use source::{GitSource, LocalSource, SourceManager, SourceStrategy};
pub use store::{RuntimeStore, StateCounts};
pub use tools::{
    HandlerResult, RenderedMessage, ToolHandle, ToolHandler, ToolRegistry, ToolSpec,
};
pub use watch::{GitPoller, LocalWatcher};
