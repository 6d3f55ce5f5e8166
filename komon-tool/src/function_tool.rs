use async_trait::async_trait;
use komon_core::{Result, Tool, ToolContext};
use schemars::JsonSchema;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type AsyncHandler = Box<
    dyn Fn(Arc<dyn ToolContext>, Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        + Send
        + Sync,
>;

pub struct FunctionTool {
    name: String,
    description: String,
    handler: AsyncHandler,
    parameters_schema: Option<Value>,
}

impl FunctionTool {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<dyn ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Box::new(move |ctx, args| Box::pin(handler(ctx, args))),
            parameters_schema: None,
        }
    }

    /// Derive the parameter schema from `T`, reduced to the subset of JSON
    /// schema that function declarations accept.
    pub fn with_parameters_schema<T: JsonSchema>(mut self) -> Self {
        self.parameters_schema = serde_json::to_value(schemars::schema_for!(T)).ok().map(|mut v| {
            strip_unsupported_keys(&mut v);
            v
        });
        self
    }
}

fn strip_unsupported_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["$schema", "title", "$defs", "definitions", "additionalProperties"] {
                map.remove(key);
            }
            for (key, child) in map.iter_mut() {
                match (key.as_str(), child) {
                    // property names are data, only their schemas are walked
                    ("properties", Value::Object(props)) => {
                        props.values_mut().for_each(strip_unsupported_keys)
                    }
                    (_, child) => strip_unsupported_keys(child),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_unsupported_keys),
        _ => {}
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        self.parameters_schema.clone()
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
        (self.handler)(ctx, args).await
    }
}
