use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// Signature of a tool as presented to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn builder(name: impl Into<String>) -> ToolDefinitionBuilder {
        ToolDefinitionBuilder {
            name: name.into(),
            description: String::new(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Definition with a schema supplied by someone else (tool servers)
    pub fn with_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        let parameters = if parameters.is_object() {
            parameters
        } else {
            json!({ "type": "object", "properties": {} })
        };

        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Chat-completions `tools[]` entry
    pub fn to_function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

pub struct ToolDefinitionBuilder {
    name: String,
    description: String,
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ToolDefinitionBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a parameter of the given JSON-schema type
    pub fn param(
        mut self,
        name: &str,
        schema_type: &str,
        description: &str,
        required: bool,
    ) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": schema_type, "description": description }),
        );
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn string_param(self, name: &str, description: &str) -> Self {
        self.param(name, "string", description, true)
    }

    pub fn build(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description,
            parameters: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

/// Text handed back to the model. Failures travel in-band with `is_error` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    async fn execute(&self, args: Value) -> ToolOutput;
}

/// Adapts an async closure into a [`ToolExecutor`]
pub struct FnToolExecutor<F> {
    definition: ToolDefinition,
    handler: F,
}

impl<F, Fut> FnToolExecutor<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolOutput> + Send + 'static,
{
    pub fn new(definition: ToolDefinition, handler: F) -> Self {
        Self {
            definition,
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> ToolExecutor for FnToolExecutor<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ToolOutput> + Send + 'static,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: Value) -> ToolOutput {
        (self.handler)(args).await
    }
}

/// Local tools available to an agent run, keyed by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a later registration with the same name replaces the earlier one
    pub fn register<T: ToolExecutor + 'static>(&mut self, tool: T) {
        let name = tool.definition().name.clone();
        if self.tools.insert(name.clone(), Arc::new(tool)).is_some() {
            tracing::warn!("Tool '{}' registered twice, keeping the latest", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolExecutor>> {
        self.tools.get(name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition().clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

/// Pull a required string argument out of a tool-call arguments object
pub fn string_arg(args: &Value, name: &str) -> Result<String, ToolOutput> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolOutput::error(format!("Missing required string argument '{}'", name)))
}
