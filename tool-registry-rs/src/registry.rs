//! Tool Registry
//!
//! Holds the registered tools, their parameter schemas and the executor that
//! binds arguments and invokes them.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::instrument;

use document_store::StoreError;
use shared_types_rs::ToolResult;

use crate::binding::{bind_arguments, ToolArguments};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

static TOOL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid tool name regex"));

/// Declared type of a tool parameter. Supplied values are coerced to it
/// before invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Object,
    Any,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "str",
            ParamType::Integer => "int",
            ParamType::Number => "float",
            ParamType::Boolean => "bool",
            ParamType::List => "list",
            ParamType::Object => "dict",
            ParamType::Any => "any",
        };
        write!(f, "{}", name)
    }
}

/// Parameter definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub description: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<Value>,
}

impl ParameterDefinition {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            param_type,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            param_type,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Tool metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub category: String,
    pub parameters: Vec<ParameterDefinition>,
}

impl ToolMetadata {
    /// `name(a: str, b: int)` as shown to the planner.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.param_type))
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Errors raised inside a tool. Never leave the executor.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing required parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    #[error("invalid value for parameter '{parameter}': expected {expected}, got {got}")]
    InvalidParameter {
        parameter: String,
        expected: ParamType,
        got: String,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("execution error: {0}")]
    Execution(String),
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool already exists: {0}")]
    ToolAlreadyExists(String),

    #[error("invalid tool metadata: {0}")]
    InvalidMetadata(String),
}

/// A named, introspectable retrieval operation.
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> &ToolMetadata;

    /// Run with arguments already bound against [`ToolMetadata::parameters`].
    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError>;

    fn help(&self) -> String {
        let metadata = self.metadata();
        let mut help = format!("{}\n\n{}\n\nParameters:\n", metadata.signature(), metadata.description);

        for param in &metadata.parameters {
            let required = if param.required { " (required)" } else { "" };
            let default = match &param.default {
                Some(default) => format!(" [default: {}]", default),
                None => String::new(),
            };
            help.push_str(&format!(
                "  {}{}{}: {}\n",
                param.name, required, default, param.description
            ));
        }

        help
    }
}

pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TOOL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    pub fn register_tool(&self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        validate_tool_metadata(tool.metadata())?;

        let name = tool.metadata().name.clone();
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());

        if tools.contains_key(&name) {
            return Err(RegistryError::ToolAlreadyExists(name));
        }

        info!("Registered tool: {}", name);
        tools.insert(name, tool);
        Ok(())
    }

    pub fn unregister_tool(&self, name: &str) -> Result<(), RegistryError> {
        let mut tools = self.tools.write().unwrap_or_else(|e| e.into_inner());

        if tools.remove(name).is_none() {
            return Err(RegistryError::UnknownTool(name.to_string()));
        }

        info!("Unregistered tool: {}", name);
        Ok(())
    }

    pub fn get_tool(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        tools
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn has_tool(&self, name: &str) -> bool {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        tools.contains_key(name)
    }

    /// Metadata of all tools, optionally filtered by category, sorted by name.
    pub fn list_tools(&self, category: Option<&str>) -> Vec<ToolMetadata> {
        let tools = self.tools.read().unwrap_or_else(|e| e.into_inner());
        let mut listed: Vec<ToolMetadata> = tools
            .values()
            .map(|tool| tool.metadata().clone())
            .filter(|metadata| category.map_or(true, |c| metadata.category == c))
            .collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }

    /// Tool catalogue in the bullet form used by planner prompts.
    pub fn catalogue(&self) -> String {
        self.list_tools(None)
            .iter()
            .map(|metadata| format!("- `{}`: {}", metadata.signature(), metadata.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bind `parameters` and invoke the named tool.
    ///
    /// Only an unregistered name is an `Err`; binding failures, tool errors,
    /// timeouts and panics all come back as `ToolResult::Error`.
    #[instrument(skip(self, parameters), fields(tool = %name))]
    pub async fn execute_tool(
        &self,
        name: &str,
        parameters: &Map<String, Value>,
    ) -> Result<ToolResult, RegistryError> {
        let tool = self.get_tool(name)?;

        let args = match bind_arguments(tool.metadata(), parameters) {
            Ok(args) => args,
            Err(e) => {
                warn!("Argument binding failed for tool {}: {}", name, e);
                return Ok(ToolResult::error(format!("Tool '{}' rejected its arguments: {}", name, e)));
            }
        };

        debug!("Executing tool {} with {} bound argument(s)", name, args.len());
        let start = Instant::now();
        let invocation = AssertUnwindSafe(tool.execute(args)).catch_unwind();

        let result = match tokio::time::timeout(self.timeout, invocation).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                error!("Tool {} failed: {}", name, e);
                ToolResult::error(format!("Tool '{}' failed: {}", name, e))
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!("Tool {} panicked: {}", name, message);
                ToolResult::error(format!("Tool '{}' failed: {}", name, message))
            }
            Err(_) => {
                error!("Tool {} timed out after {:?}", name, self.timeout);
                ToolResult::error(format!(
                    "Tool '{}' timed out after {} seconds",
                    name,
                    self.timeout.as_secs_f64()
                ))
            }
        };

        info!(
            "Tool {} finished with status {} in {}ms",
            name,
            result.status(),
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

fn validate_tool_metadata(metadata: &ToolMetadata) -> Result<(), RegistryError> {
    if !TOOL_NAME_RE.is_match(&metadata.name) {
        return Err(RegistryError::InvalidMetadata(format!(
            "tool name '{}' must be lowercase snake_case",
            metadata.name
        )));
    }

    if metadata.description.trim().is_empty() {
        return Err(RegistryError::InvalidMetadata(format!(
            "tool '{}' has no description",
            metadata.name
        )));
    }

    let mut seen = HashSet::new();
    for param in &metadata.parameters {
        if param.name.trim().is_empty() {
            return Err(RegistryError::InvalidMetadata(format!(
                "tool '{}' declares a parameter without a name",
                metadata.name
            )));
        }
        if !seen.insert(param.name.as_str()) {
            return Err(RegistryError::InvalidMetadata(format!(
                "tool '{}' declares parameter '{}' twice",
                metadata.name, param.name
            )));
        }
    }

    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MockTool {
        metadata: ToolMetadata,
    }

    #[async_trait]
    impl Tool for MockTool {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::success(vec![args.into_map()]))
        }
    }

    struct FailingTool {
        metadata: ToolMetadata,
    }

    #[async_trait]
    impl Tool for FailingTool {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn execute(&self, _args: ToolArguments) -> Result<ToolResult, ToolError> {
            Err(ToolError::Execution("connection reset".to_string()))
        }
    }

    struct PanickingTool {
        metadata: ToolMetadata,
    }

    #[async_trait]
    impl Tool for PanickingTool {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn execute(&self, _args: ToolArguments) -> Result<ToolResult, ToolError> {
            panic!("index out of bounds");
        }
    }

    struct SlowTool {
        metadata: ToolMetadata,
    }

    #[async_trait]
    impl Tool for SlowTool {
        fn metadata(&self) -> &ToolMetadata {
            &self.metadata
        }

        async fn execute(&self, _args: ToolArguments) -> Result<ToolResult, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolResult::empty("too late"))
        }
    }

    fn metadata(name: &str) -> ToolMetadata {
        ToolMetadata {
            name: name.to_string(),
            description: "A mock tool for testing".to_string(),
            category: "testing".to_string(),
            parameters: vec![
                ParameterDefinition::required("person_name", ParamType::String, "Who to look up"),
                ParameterDefinition::optional("year_level", ParamType::Integer, "Year level"),
                ParameterDefinition::optional("limit", ParamType::Integer, "Row cap")
                    .with_default(json!(10)),
            ],
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_register_and_get_tool() {
        let registry = ToolRegistry::new();
        let result = registry.register_tool(Arc::new(MockTool { metadata: metadata("mock_tool") }));
        assert!(result.is_ok());
        assert!(registry.get_tool("mock_tool").is_ok());
        assert!(registry.has_tool("mock_tool"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(MockTool { metadata: metadata("mock_tool") }))
            .unwrap();
        let second = registry.register_tool(Arc::new(MockTool { metadata: metadata("mock_tool") }));
        assert!(matches!(second, Err(RegistryError::ToolAlreadyExists(_))));
    }

    #[test]
    fn test_invalid_metadata_rejected() {
        let registry = ToolRegistry::new();
        let mut bad = metadata("Mock Tool");
        assert!(matches!(
            registry.register_tool(Arc::new(MockTool { metadata: bad.clone() })),
            Err(RegistryError::InvalidMetadata(_))
        ));

        bad.name = "mock_tool".to_string();
        bad.parameters.push(ParameterDefinition::optional("limit", ParamType::Integer, "again"));
        assert!(matches!(
            registry.register_tool(Arc::new(MockTool { metadata: bad })),
            Err(RegistryError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_unregister_tool() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(MockTool { metadata: metadata("mock_tool") }))
            .unwrap();
        assert!(registry.unregister_tool("mock_tool").is_ok());
        assert!(registry.get_tool("mock_tool").is_err());
        assert!(registry.unregister_tool("mock_tool").is_err());
    }

    #[test]
    fn test_list_tools_and_catalogue() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(MockTool { metadata: metadata("zeta_tool") }))
            .unwrap();
        registry
            .register_tool(Arc::new(MockTool { metadata: metadata("alpha_tool") }))
            .unwrap();

        let all = registry.list_tools(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "alpha_tool");
        assert!(registry.list_tools(Some("directory")).is_empty());

        let catalogue = registry.catalogue();
        assert!(catalogue.starts_with("- `alpha_tool(person_name: str, year_level: int, limit: int)`"));
    }

    #[test]
    fn test_help_lists_parameters() {
        let tool = MockTool { metadata: metadata("mock_tool") };
        let help = tool.help();
        assert!(help.contains("person_name (required)"));
        assert!(help.contains("[default: 10]"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_the_only_error() {
        let registry = ToolRegistry::new();
        let result = registry.execute_tool("nope", &Map::new()).await;
        assert!(matches!(result, Err(RegistryError::UnknownTool(name)) if name == "nope"));
    }

    #[tokio::test]
    async fn test_binding_applies_defaults_and_drops_extraneous_keys() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(MockTool { metadata: metadata("mock_tool") }))
            .unwrap();

        let result = registry
            .execute_tool(
                "mock_tool",
                &params(json!({"person_name": "Juan", "year_level": "2", "color": "blue"})),
            )
            .await
            .unwrap();

        let row = &result.data()[0];
        assert_eq!(row.get("person_name"), Some(&json!("Juan")));
        assert_eq!(row.get("year_level"), Some(&json!(2)));
        assert_eq!(row.get("limit"), Some(&json!(10)));
        assert!(row.get("color").is_none());
    }

    #[tokio::test]
    async fn test_missing_required_parameter_becomes_error_result() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(MockTool { metadata: metadata("mock_tool") }))
            .unwrap();

        let result = registry
            .execute_tool("mock_tool", &params(json!({"year_level": 3})))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.summary().unwrap().contains("person_name"));
    }

    #[tokio::test]
    async fn test_tool_error_and_panic_are_contained() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(Arc::new(FailingTool { metadata: metadata("failing_tool") }))
            .unwrap();
        registry
            .register_tool(Arc::new(PanickingTool { metadata: metadata("panicking_tool") }))
            .unwrap();

        let args = params(json!({"person_name": "Juan"}));

        let failed = registry.execute_tool("failing_tool", &args).await.unwrap();
        assert!(failed.is_error());
        assert!(failed.summary().unwrap().contains("connection reset"));

        let panicked = registry.execute_tool("panicking_tool", &args).await.unwrap();
        assert!(panicked.is_error());
        assert!(panicked.summary().unwrap().contains("index out of bounds"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_result() {
        let registry = ToolRegistry::with_timeout(Duration::from_millis(20));
        registry
            .register_tool(Arc::new(SlowTool { metadata: metadata("slow_tool") }))
            .unwrap();

        let result = registry
            .execute_tool("slow_tool", &params(json!({"person_name": "Juan"})))
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.summary().unwrap().contains("timed out"));
    }
}
