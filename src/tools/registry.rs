//! Tool registry and the declarative registration boundary.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::tools::declarative::{DeclarativeTool, DefinitionLoader, HttpExecutor};
use crate::tools::tool::{Tool, ToolSchema, validate_tool_schema};

/// Registry of available tools.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tool, replacing any tool with the same name.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        for problem in validate_tool_schema(&tool.parameters_schema(), &name) {
            tracing::warn!(tool = %name, %problem, "Tool schema problem");
        }
        if self.tools.write().await.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replaced previously registered tool");
        } else {
            tracing::debug!(tool = %name, "Registered tool");
        }
    }

    pub async fn unregister(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.write().await.remove(name)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().await.get(name).cloned()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// Registered tool names, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn count(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Schemas of every registered tool, sorted by name.
    pub async fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .read()
            .await
            .values()
            .map(|tool| tool.schema())
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Load declarative tools from `base_dir` and register them.
    ///
    /// Returns how many were registered.
    pub async fn register_declarative(
        &self,
        base_dir: impl AsRef<Path>,
        executor: Arc<HttpExecutor>,
    ) -> usize {
        let Some(tools) = declarative_tools(base_dir, executor) else {
            return 0;
        };
        let count = tools.len();
        for tool in tools {
            self.register(tool).await;
        }
        tracing::info!(count, "Registered declarative tools");
        count
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build one tool per valid definition under `<base_dir>/tools/`.
///
/// `None` when there is nothing to register.
pub fn declarative_tools(
    base_dir: impl AsRef<Path>,
    executor: Arc<HttpExecutor>,
) -> Option<Vec<Arc<dyn Tool>>> {
    let report = DefinitionLoader::new(base_dir).load();
    if report.definitions.is_empty() {
        return None;
    }

    Some(
        report
            .definitions
            .into_iter()
            .map(|def| Arc::new(DeclarativeTool::new(def, Arc::clone(&executor))) as Arc<dyn Tool>)
            .collect(),
    )
}
