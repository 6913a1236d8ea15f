//! Tool registry.
//!
//! The registry is built once by an assembly function from a list of tool
//! definitions and is read-only afterwards. Lookups take `&self`, so the
//! registry can be shared behind an `Arc` by any number of concurrent readers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::Tool;
use crate::{Error, Result};

/// Registry of tools keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    /// Tools indexed by name.
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from tool definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTool`] if two definitions share a name.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Result<Self> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register_arc(tool)?;
        }
        Ok(registry)
    }

    /// Register a tool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTool`] if a tool with the same name exists.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool wrapped in Arc.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateTool`] if a tool with the same name exists.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(Error::DuplicateTool { name });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] for unknown names.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Tool>> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::tool_not_found(name))
    }

    /// Iterate over all registered tools in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    /// Get the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get all tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
