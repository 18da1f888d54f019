//! The tool-registry contract the engine drives
//!
//! The protocol server owns the concrete registry; the engine only needs
//! the seam defined here. The contract is *not* replace-in-place: a new
//! registration of an id becomes the one served to clients, while the
//! previous handle remains a valid object until it is removed. That is what
//! makes the dual-swap reload possible.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

/// What a registered tool looks like to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Opaque, removable reference to one registration.
///
/// The serial distinguishes successive registrations of the same id, so
/// removing a stale handle can never unregister its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolHandle {
    pub id: String,
    pub serial: u64,
}

/// Message produced by a prompt tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedMessage {
    pub role: String,
    pub text: String,
}

impl RenderedMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            text: text.into(),
        }
    }
}

/// Invocation outcome: a rendered message, or an error string surfaced to
/// the caller as a tool-error result (never a crash).
pub type HandlerResult = std::result::Result<RenderedMessage, String>;

/// Invocation handler. Owns everything it needs to render, including the
/// compiled template; a registry rebuild never affects a running handler.
pub type ToolHandler = Arc<dyn Fn(Value) -> HandlerResult + Send + Sync>;

/// The registry seam between the engine and the protocol server.
pub trait ToolRegistry: Send + Sync {
    /// Register `spec` under its name. A subsequent registration of the
    /// same name supersedes this one for invocations, but the returned
    /// handle stays valid until [`ToolRegistry::remove`] is called on it.
    fn register(&self, spec: ToolSpec, handler: ToolHandler) -> ToolHandle;

    /// Remove one specific registration. Returns `false` when the handle
    /// no longer refers to anything (double removal is safe).
    fn remove(&self, handle: &ToolHandle) -> bool;
}
