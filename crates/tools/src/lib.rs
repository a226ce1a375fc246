pub mod registry;
pub mod sales;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use vendabot_core::Result;

pub use registry::ToolRegistry;
pub use sales::SalesDb;

/// Context handed to every tool execution.
#[derive(Clone)]
pub struct ToolContext {
    pub session_key: String,
    pub channel: String,
    pub chat_id: String,
    pub sales: Arc<SalesDb>,
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}
