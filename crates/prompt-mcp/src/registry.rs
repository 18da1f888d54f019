//! Dynamic tool registry with dual-swap semantics
//!
//! Every prompt id maps to a stack of registrations. The newest entry
//! serves invocations; older entries stay live objects that the reload
//! engine removes once their replacements are in place, so an id is never
//! absent between two passes. Listing follows first-registration order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use prompt_core::{HandlerResult, ToolHandle, ToolHandler, ToolRegistry, ToolSpec};

struct Registration {
    serial: u64,
    spec: ToolSpec,
    handler: ToolHandler,
}

#[derive(Default)]
struct RegistryInner {
    entries: HashMap<String, Vec<Registration>>,
    /// Ids in the order they were first registered.
    order: Vec<String>,
}

/// The live prompt-tool registry behind the protocol server.
#[derive(Default)]
pub struct DynamicToolRegistry {
    serial: AtomicU64,
    inner: RwLock<RegistryInner>,
}

impl DynamicToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest spec per id, in first-registration order.
    pub fn list(&self) -> Vec<ToolSpec> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| {
                inner
                    .entries
                    .get(id)
                    .and_then(|stack| stack.last())
                    .map(|registration| registration.spec.clone())
            })
            .collect()
    }

    /// Invoke the authoritative handler for `name`. `None` when no such
    /// tool is registered.
    pub fn invoke(&self, name: &str, args: serde_json::Value) -> Option<HandlerResult> {
        let handler = {
            let inner = self.read();
            inner
                .entries
                .get(name)
                .and_then(|stack| stack.last())
                .map(|registration| registration.handler.clone())
        };
        // The handler runs outside the lock; a reload can proceed while a
        // render is in flight.
        handler.map(|handler| handler(args))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read()
            .entries
            .get(name)
            .map(|stack| !stack.is_empty())
            .unwrap_or(false)
    }

    /// Number of distinct ids currently invocable.
    pub fn len(&self) -> usize {
        self.read()
            .entries
            .values()
            .filter(|stack| !stack.is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ToolRegistry for DynamicToolRegistry {
    fn register(&self, spec: ToolSpec, handler: ToolHandler) -> ToolHandle {
        let serial = self.serial.fetch_add(1, Ordering::SeqCst) + 1;
        let id = spec.name.clone();
        let mut inner = self.write();
        let stack = inner.entries.entry(id.clone()).or_default();
        let is_new = stack.is_empty();
        stack.push(Registration {
            serial,
            spec,
            handler,
        });
        if is_new && !inner.order.contains(&id) {
            inner.order.push(id.clone());
        }
        tracing::debug!(id = %id, serial, "tool registered");
        ToolHandle { id, serial }
    }

    fn remove(&self, handle: &ToolHandle) -> bool {
        let mut inner = self.write();
        let Some(stack) = inner.entries.get_mut(&handle.id) else {
            return false;
        };
        let before = stack.len();
        stack.retain(|registration| registration.serial != handle.serial);
        let removed = stack.len() < before;
        if stack.is_empty() {
            inner.entries.remove(&handle.id);
            inner.order.retain(|id| id != &handle.id);
        }
        if removed {
            tracing::debug!(id = %handle.id, serial = handle.serial, "tool registration removed");
        }
        removed
    }
}
