//! Tool system: the provider side of the tool protocol.
//!
//! Every tool implements the `Tool` trait (name, description, JSON
//! Schema for parameters, execute). The `ToolRouter` holds the
//! registered tools and dispatches calls by name; the tool host serves
//! the router over the subprocess's standard streams.

pub mod amap;
pub mod landmarks;
pub mod static_map;
pub mod weather;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::ToolsConfig;
use crate::types::ToolDefinition;

use amap::MapClient;
use landmarks::LandmarkCache;

/// A capability the model can invoke.
///
/// Tools receive JSON arguments and return a string result. A tool must
/// never panic past its boundary; external-call failures either come
/// back as `Ok` diagnostic text (so the model can react) or as `Err`,
/// which the host flattens into a failure-flagged result.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// What the model reads to decide when to use the tool.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, params: serde_json::Value) -> Result<String>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// Routes tool calls to the correct tool implementation.
pub struct ToolRouter {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRouter {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// All tool definitions, for the discovery handshake.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub async fn execute(&self, name: &str, params: serde_json::Value) -> Result<String> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .with_context(|| format!("Unknown tool: {}", name))?;

        tool.execute(params).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the router with the travel tools registered.
pub fn create_default_router(config: &ToolsConfig) -> Result<ToolRouter> {
    let client = Arc::new(MapClient::new(config)?);
    let cache = LandmarkCache::new(config.cache_dir()?);

    let mut router = ToolRouter::new();
    router.register(Box::new(weather::WeatherSearchTool::new(client.clone())));
    router.register(Box::new(landmarks::FetchLandmarksTool::new(
        client.clone(),
        cache.clone(),
        config.default_keyword.clone(),
    )));
    router.register(Box::new(static_map::GenerateStaticMapTool::new(
        client,
        cache,
        config.map_file.clone(),
        config.default_keyword.clone(),
    )));
    Ok(router)
}
