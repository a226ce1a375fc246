use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;
use vendabot_core::{Error, Result};

use crate::sales::{
    AverageMonthlySalesTool, BestSellingMonthTool, LeastSoldProductsTool,
    ManufacturerComparisonTool, MonthlyRevenueTool, MultipleProductSalesTool,
    ProductSalesByMonthTool, ProductSalesTool, TopProductsTool,
};
use crate::{Tool, ToolContext};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the full sales query toolset.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(TopProductsTool));
        registry.register(Arc::new(MonthlyRevenueTool));
        registry.register(Arc::new(ProductSalesByMonthTool));
        registry.register(Arc::new(ProductSalesTool));
        registry.register(Arc::new(ManufacturerComparisonTool));
        registry.register(Arc::new(AverageMonthlySalesTool));
        registry.register(Arc::new(BestSellingMonthTool));
        registry.register(Arc::new(LeastSoldProductsTool));
        registry.register(Arc::new(MultipleProductSalesTool));

        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool definitions in the OpenAI function-calling format.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let schema = tool.schema();
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters
                    }
                })
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool '{}'", name)))?;
        tool.validate(&params)?;
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SalesDb;

    fn test_ctx() -> ToolContext {
        ToolContext {
            session_key: "test:chat".to_string(),
            channel: "test".to_string(),
            chat_id: "chat".to_string(),
            sales: Arc::new(SalesDb::open_in_memory().unwrap()),
        }
    }

    #[test]
    fn test_defaults_register_all_sales_tools() {
        let registry = ToolRegistry::with_defaults();
        for name in [
            "get_top_products",
            "get_monthly_revenue",
            "get_product_sales_by_month",
            "get_product_sales",
            "get_comparison_by_manufacturer",
            "get_average_monthly_sales",
            "get_best_selling_month",
            "get_least_sold_products",
            "get_multiple_product_sales",
        ] {
            assert!(registry.get(name).is_some(), "missing tool {}", name);
        }
    }

    #[test]
    fn test_schemas_use_function_calling_format() {
        let registry = ToolRegistry::with_defaults();
        let schemas = registry.get_tool_schemas();
        assert_eq!(schemas.len(), 9);
        for schema in &schemas {
            assert_eq!(schema["type"], "function");
            assert!(schema["function"]["name"].is_string());
            assert_eq!(schema["function"]["parameters"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::with_defaults();
        let err = registry
            .execute("get_weather", test_ctx(), json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_execute_validates_params() {
        let registry = ToolRegistry::with_defaults();
        let err = registry
            .execute("get_monthly_revenue", test_ctx(), json!({"month": 6}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("year"));
    }
}
