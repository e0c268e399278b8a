//! Tool registry: the catalog of known tools and the user-selected subset.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::tools::{Tool, ToolError, ToolSpec};

/// Catalog of available tools plus the ordered list of enabled ones.
///
/// Every selected name refers to an available tool. `add_tool` and
/// `remove_tool` are idempotent and may be called while a generation is in
/// flight; dispatch works on a [`ToolSet`] snapshot taken at the start of a
/// pass.
pub struct ToolRegistry {
    available: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
    selected: RwLock<Vec<String>>,
}

impl ToolRegistry {
    /// Create a registry with the given tools, none selected.
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self {
            available: Vec::new(),
            index: HashMap::new(),
            selected: RwLock::new(Vec::new()),
        };
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Create an empty registry.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Register a tool. The first registration of a name wins.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            warn!(tool = %name, "duplicate tool registration ignored");
            return;
        }
        self.index.insert(name, self.available.len());
        self.available.push(tool);
    }

    /// Builder-style selection. Unknown names are skipped with a warning.
    pub fn with_selected<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            if let Err(e) = self.add_tool(name.as_ref()) {
                warn!("cannot select tool: {e}");
            }
        }
        self
    }

    /// Select every available tool, in registration order.
    pub fn with_all_selected(self) -> Self {
        let names: Vec<String> = self.available.iter().map(|t| t.name().to_string()).collect();
        self.with_selected(names)
    }

    /// Specifications of all known tools, in registration order.
    pub fn available(&self) -> Vec<ToolSpec> {
        self.available.iter().map(|t| t.spec().clone()).collect()
    }

    /// Look up a known tool by name, selected or not.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.available[i]))
    }

    /// Names of the currently enabled tools, in selection order.
    pub fn selected(&self) -> Vec<String> {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|n| n == name)
    }

    /// Enable a tool. Returns `Ok(false)` if it was already enabled.
    pub fn add_tool(&self, name: &str) -> Result<bool, ToolError> {
        if !self.index.contains_key(name) {
            return Err(ToolError::UnknownTool(name.to_string()));
        }
        let mut selected = self.selected.write().unwrap_or_else(PoisonError::into_inner);
        if selected.iter().any(|n| n == name) {
            return Ok(false);
        }
        selected.push(name.to_string());
        debug!(tool = %name, "tool enabled");
        Ok(true)
    }

    /// Disable a tool. Returns `false` if it was not enabled.
    pub fn remove_tool(&self, name: &str) -> bool {
        let mut selected = self.selected.write().unwrap_or_else(PoisonError::into_inner);
        let before = selected.len();
        selected.retain(|n| n != name);
        let removed = selected.len() != before;
        if removed {
            debug!(tool = %name, "tool disabled");
        }
        removed
    }

    /// Freeze the enabled tools for one dispatch pass.
    pub fn snapshot(&self) -> ToolSet {
        let selected = self.selected.read().unwrap_or_else(PoisonError::into_inner);
        let tools = selected.iter().filter_map(|name| self.get(name)).collect();
        ToolSet { tools }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Immutable set of enabled tools captured at the start of a turn.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter().map(|t| t.spec())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}
