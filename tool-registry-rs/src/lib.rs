//! Tool Registry & Executor
//!
//! Tools are named, schema-declared retrieval operations. The registry binds
//! planner-supplied arguments against each tool's declared parameters before
//! invoking it, and converts every failure raised during invocation into an
//! error [`ToolResult`] so that execution is total for registered tools.
//!
//! The institutional directory catalogue (people, schedules, grades,
//! curriculum and a broad fallback search) lives in [`directory`].

pub mod binding;
pub mod directory;
pub mod registry;

pub use binding::{bind_arguments, ToolArguments};
pub use directory::{register_directory_tools, DirectoryCollections, SEARCH_TOOL, SOURCE_FIELD};
pub use registry::{
    ParamType, ParameterDefinition, RegistryError, Tool, ToolError, ToolMetadata, ToolRegistry,
    DEFAULT_TOOL_TIMEOUT,
};

pub use shared_types_rs::ToolResult;
