//! Institutional directory tools
//!
//! Read-only lookups over the people, schedule, grade and curriculum
//! collections. Every returned record carries a `source_collection` field
//! naming where it came from, which narration cites.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use document_store::{value_text, DocumentStore, Filter};
use shared_types_rs::{Document, ToolResult};

use crate::binding::ToolArguments;
use crate::registry::{
    ParamType, ParameterDefinition, RegistryError, Tool, ToolError, ToolMetadata, ToolRegistry,
};

pub const SEARCH_TOOL: &str = "search_directory";
pub const SOURCE_FIELD: &str = "source_collection";
const CATEGORY: &str = "directory";
const DEFAULT_SEARCH_LIMIT: i64 = 50;

/// Collection names backing the directory tools.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryCollections {
    pub students: String,
    pub faculty: String,
    pub staff: String,
    pub schedules: String,
    pub grades: String,
    pub curriculum: String,
    /// Collections scanned by the broad fallback search.
    pub searchable: Vec<String>,
}

impl Default for DirectoryCollections {
    fn default() -> Self {
        let mut collections = Self {
            students: "students".to_string(),
            faculty: "faculty".to_string(),
            staff: "staff".to_string(),
            schedules: "schedules".to_string(),
            grades: "grades".to_string(),
            curriculum: "curriculum".to_string(),
            searchable: Vec::new(),
        };
        collections.searchable = collections.all();
        collections
    }
}

impl DirectoryCollections {
    pub fn with_searchable(mut self, searchable: Vec<String>) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn people(&self) -> Vec<String> {
        vec![self.students.clone(), self.faculty.clone(), self.staff.clone()]
    }

    pub fn all(&self) -> Vec<String> {
        vec![
            self.students.clone(),
            self.faculty.clone(),
            self.staff.clone(),
            self.schedules.clone(),
            self.grades.clone(),
            self.curriculum.clone(),
        ]
    }

    /// Collection implied by a role word such as "students" or "faculty".
    fn for_role(&self, role: &str) -> Option<String> {
        let role = role.trim().to_lowercase();
        let singular = role.strip_suffix('s').unwrap_or(&role);
        [&self.students, &self.faculty, &self.staff]
            .into_iter()
            .find(|c| {
                let c = c.to_lowercase();
                c == role || c.strip_suffix('s').unwrap_or(&c) == singular
            })
            .cloned()
    }
}

/// Register the whole directory catalogue on `registry`.
pub fn register_directory_tools(
    registry: &ToolRegistry,
    store: Arc<dyn DocumentStore>,
    collections: &DirectoryCollections,
) -> Result<(), RegistryError> {
    registry.register_tool(Arc::new(FindPeopleTool::new(store.clone(), collections.clone())))?;
    registry.register_tool(Arc::new(LookupTool::person_profile(store.clone(), collections)))?;
    registry.register_tool(Arc::new(LookupTool::person_schedule(store.clone(), collections)))?;
    registry.register_tool(Arc::new(LookupTool::student_grades(store.clone(), collections)))?;
    registry.register_tool(Arc::new(LookupTool::curriculum(store.clone(), collections)))?;
    registry.register_tool(Arc::new(SearchDirectoryTool::new(store, collections.searchable.clone())))?;
    Ok(())
}

/// How a bound argument constrains a record field.
#[derive(Debug, Clone, Copy)]
enum FieldMatch {
    /// Every word of the argument occurs in the field.
    Name(&'static str),
    /// Case-insensitive equality of the textual rendering.
    Exact(&'static str),
    /// Case-insensitive substring.
    Partial(&'static str),
}

impl FieldMatch {
    fn filter(self, value: &str) -> Filter {
        match self {
            FieldMatch::Name(field) => Filter::And(
                value
                    .split_whitespace()
                    .map(|word| Filter::Contains(field.to_string(), word.to_string()))
                    .collect(),
            ),
            FieldMatch::Exact(field) => Filter::EqualsIgnoreCase(field.to_string(), value.to_string()),
            FieldMatch::Partial(field) => Filter::Contains(field.to_string(), value.to_string()),
        }
    }
}

fn argument_text(args: &ToolArguments, name: &str) -> Option<String> {
    args.get(name)
        .and_then(value_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn constraints(args: &ToolArguments, fields: &[(&'static str, FieldMatch)]) -> (Vec<Filter>, Vec<String>) {
    let mut filters = Vec::new();
    let mut described = Vec::new();
    for (param, field) in fields {
        if let Some(text) = argument_text(args, param) {
            filters.push(field.filter(&text));
            described.push(format!("{}='{}'", param, text));
        }
    }
    (filters, described)
}

fn tag_source(documents: Vec<Document>, collection: &str) -> Vec<Document> {
    documents
        .into_iter()
        .map(|mut doc| {
            doc.insert(SOURCE_FIELD.to_string(), json!(collection));
            doc
        })
        .collect()
}

async fn find_in(
    store: &dyn DocumentStore,
    collections: &[String],
    filters: Vec<Filter>,
) -> Result<Vec<Document>, ToolError> {
    let filter = if filters.is_empty() { Filter::All } else { Filter::And(filters) };
    let mut found = Vec::new();
    for collection in collections {
        let documents = store.find(collection, filter.clone(), None).await?;
        debug!("{} record(s) matched in {}", documents.len(), collection);
        found.extend(tag_source(documents, collection));
    }
    Ok(found)
}

fn empty_summary(what: &str, described: &[String]) -> String {
    if described.is_empty() {
        format!("No {} found.", what)
    } else {
        format!("No {} found matching {}.", what, described.join(", "))
    }
}

/// Group search over students, faculty and staff.
pub struct FindPeopleTool {
    metadata: ToolMetadata,
    store: Arc<dyn DocumentStore>,
    collections: DirectoryCollections,
}

impl FindPeopleTool {
    const FIELDS: [(&'static str, FieldMatch); 5] = [
        ("name", FieldMatch::Name("full_name")),
        ("program", FieldMatch::Exact("program")),
        ("year_level", FieldMatch::Exact("year_level")),
        ("section", FieldMatch::Exact("section")),
        ("department", FieldMatch::Partial("department")),
    ];

    pub fn new(store: Arc<dyn DocumentStore>, collections: DirectoryCollections) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "find_people".to_string(),
                description: "Find people (students, faculty, staff) using filters such as position, program, year level, section, department or a partial name. Use for groups and for any lookup with filters besides a name.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![
                    ParameterDefinition::optional("position", ParamType::String, "Role or job title, e.g. 'student', 'faculty', 'Instructor'"),
                    ParameterDefinition::optional("program", ParamType::String, "Academic program code, e.g. BSCS"),
                    ParameterDefinition::optional("year_level", ParamType::Integer, "Year level, 1 to 4"),
                    ParameterDefinition::optional("section", ParamType::String, "Section letter"),
                    ParameterDefinition::optional("department", ParamType::String, "Department name"),
                    ParameterDefinition::optional("name", ParamType::String, "Full or partial name"),
                ],
            },
            store,
            collections,
        }
    }
}

#[async_trait]
impl Tool for FindPeopleTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let (mut filters, mut described) = constraints(&args, &Self::FIELDS);
        let mut collections = self.collections.people();

        if let Some(position) = args.str("position") {
            described.push(format!("position='{}'", position));
            match self.collections.for_role(position) {
                Some(collection) => collections = vec![collection],
                None => filters.push(FieldMatch::Partial("position").filter(position)),
            }
        }

        let found = find_in(self.store.as_ref(), &collections, filters).await?;
        Ok(ToolResult::from_documents(found, empty_summary("people", &described)))
    }
}

/// Filtered lookup over a fixed set of collections.
pub struct LookupTool {
    metadata: ToolMetadata,
    store: Arc<dyn DocumentStore>,
    collections: Vec<String>,
    fields: Vec<(&'static str, FieldMatch)>,
    noun: &'static str,
}

impl LookupTool {
    pub fn person_profile(store: Arc<dyn DocumentStore>, collections: &DirectoryCollections) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_person_profile".to_string(),
                description: "General lookup of a person by name only. Use for open-ended questions like 'who is <name>'.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![ParameterDefinition::required(
                    "person_name",
                    ParamType::String,
                    "Full or partial name of the person",
                )],
            },
            store,
            collections: collections.people(),
            fields: vec![("person_name", FieldMatch::Name("full_name"))],
            noun: "person",
        }
    }

    pub fn person_schedule(store: Arc<dyn DocumentStore>, collections: &DirectoryCollections) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_person_schedule".to_string(),
                description: "Class schedules or timetables, for a person by name or for a program, year level and section.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![
                    ParameterDefinition::optional("person_name", ParamType::String, "Whose schedule"),
                    ParameterDefinition::optional("program", ParamType::String, "Program code"),
                    ParameterDefinition::optional("year_level", ParamType::Integer, "Year level"),
                    ParameterDefinition::optional("section", ParamType::String, "Section"),
                ],
            },
            store,
            collections: vec![collections.schedules.clone()],
            fields: vec![
                ("person_name", FieldMatch::Name("owner_name")),
                ("program", FieldMatch::Exact("program")),
                ("year_level", FieldMatch::Exact("year_level")),
                ("section", FieldMatch::Exact("section")),
            ],
            noun: "schedules",
        }
    }

    pub fn student_grades(store: Arc<dyn DocumentStore>, collections: &DirectoryCollections) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "get_student_grades".to_string(),
                description: "Student grades and GWA. Call with empty parameters for analytical questions such as 'who is the smartest student'.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![
                    ParameterDefinition::optional("student_name", ParamType::String, "Student name"),
                    ParameterDefinition::optional("program", ParamType::String, "Program code"),
                    ParameterDefinition::optional("year_level", ParamType::Integer, "Year level"),
                    ParameterDefinition::optional("section", ParamType::String, "Section"),
                ],
            },
            store,
            collections: vec![collections.grades.clone()],
            fields: vec![
                ("student_name", FieldMatch::Name("student_name")),
                ("program", FieldMatch::Exact("program")),
                ("year_level", FieldMatch::Exact("year_level")),
                ("section", FieldMatch::Exact("section")),
            ],
            noun: "grade records",
        }
    }

    pub fn curriculum(store: Arc<dyn DocumentStore>, collections: &DirectoryCollections) -> Self {
        Self {
            metadata: ToolMetadata {
                name: "query_curriculum".to_string(),
                description: "Subjects and courses of a program's curriculum, optionally for one year level.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![
                    ParameterDefinition::optional("program", ParamType::String, "Program code"),
                    ParameterDefinition::optional("year_level", ParamType::Integer, "Year level"),
                ],
            },
            store,
            collections: vec![collections.curriculum.clone()],
            fields: vec![
                ("program", FieldMatch::Exact("program")),
                ("year_level", FieldMatch::Exact("year_level")),
            ],
            noun: "curriculum entries",
        }
    }
}

#[async_trait]
impl Tool for LookupTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let (filters, described) = constraints(&args, &self.fields);
        let found = find_in(self.store.as_ref(), &self.collections, filters).await?;
        Ok(ToolResult::from_documents(found, empty_summary(self.noun, &described)))
    }
}

/// Broad keyword search across every searchable collection. Used as the
/// fallback when a primary lookup comes back empty.
pub struct SearchDirectoryTool {
    metadata: ToolMetadata,
    store: Arc<dyn DocumentStore>,
    collections: Vec<String>,
}

impl SearchDirectoryTool {
    pub fn new(store: Arc<dyn DocumentStore>, collections: Vec<String>) -> Self {
        Self {
            metadata: ToolMetadata {
                name: SEARCH_TOOL.to_string(),
                description: "Keyword search across the whole directory. Every term must appear somewhere in a record.".to_string(),
                category: CATEGORY.to_string(),
                parameters: vec![
                    ParameterDefinition::required("query", ParamType::String, "Search terms separated by spaces"),
                    ParameterDefinition::optional("limit", ParamType::Integer, "Maximum records returned")
                        .with_default(json!(DEFAULT_SEARCH_LIMIT)),
                ],
            },
            store,
            collections,
        }
    }
}

#[async_trait]
impl Tool for SearchDirectoryTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    async fn execute(&self, args: ToolArguments) -> Result<ToolResult, ToolError> {
        let query = args.require_str(SEARCH_TOOL, "query")?;
        let limit = args.i64("limit").unwrap_or(DEFAULT_SEARCH_LIMIT).max(1) as usize;

        let terms: Vec<String> = query
            .split(|c: char| c.is_whitespace() || c == ',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if terms.is_empty() {
            return Ok(ToolResult::empty("Nothing to search for."));
        }

        let mut found = Vec::new();
        'collections: for collection in &self.collections {
            let documents = self.store.aggregate(collection, &[]).await?;
            for doc in documents {
                let mut text = String::new();
                for value in doc.values() {
                    collect_text(value, &mut text);
                }
                if terms.iter().all(|term| text.contains(term.as_str())) {
                    found.extend(tag_source(vec![doc], collection));
                    if found.len() >= limit {
                        break 'collections;
                    }
                }
            }
        }

        Ok(ToolResult::from_documents(
            found,
            format!("No records found for '{}'.", query),
        ))
    }
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_text(item, out)),
        other => {
            if let Some(text) = value_text(other) {
                out.push_str(&text.to_lowercase());
                out.push(' ');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::MemoryDocumentStore;
    use serde_json::Map;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn registry() -> ToolRegistry {
        let store = MemoryDocumentStore::new();
        store
            .insert_many(
                "students",
                vec![
                    doc(json!({"full_name": "Juan Dela Cruz", "program": "BSCS", "year_level": 2, "section": "A"})),
                    doc(json!({"full_name": "Maria Santos", "program": "bscs", "year_level": "3", "section": "B"})),
                    doc(json!({"full_name": "Pedro Reyes", "program": "BSIT", "year_level": 2, "section": "A"})),
                ],
            )
            .await
            .unwrap();
        store
            .insert_many(
                "faculty",
                vec![doc(json!({"full_name": "Ana Cruz", "position": "Instructor", "department": "Computer Studies"}))],
            )
            .await
            .unwrap();
        store
            .insert_many(
                "schedules",
                vec![doc(json!({"owner_name": "Ana Cruz", "schedule": [{"subject": "CS101", "day": "Mon"}]}))],
            )
            .await
            .unwrap();

        let registry = ToolRegistry::new();
        register_directory_tools(&registry, Arc::new(store), &DirectoryCollections::default()).unwrap();
        registry
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_catalogue_registered() {
        let registry = registry().await;
        let names: Vec<String> = registry.list_tools(Some("directory")).into_iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec![
                "find_people",
                "get_person_profile",
                "get_person_schedule",
                "get_student_grades",
                "query_curriculum",
                "search_directory",
            ]
        );
    }

    #[tokio::test]
    async fn test_find_people_by_program_ignores_case() {
        let registry = registry().await;
        let result = registry
            .execute_tool("find_people", &params(json!({"program": "BSCS", "position": "students"})))
            .await
            .unwrap();
        assert_eq!(result.data().len(), 2);
        assert!(result
            .data()
            .iter()
            .all(|d| d.get(SOURCE_FIELD) == Some(&json!("students"))));
    }

    #[tokio::test]
    async fn test_find_people_matches_numeric_and_string_year() {
        let registry = registry().await;
        let result = registry
            .execute_tool("find_people", &params(json!({"year_level": "3"})))
            .await
            .unwrap();
        assert_eq!(result.data().len(), 1);
        assert_eq!(result.data()[0].get("full_name"), Some(&json!("Maria Santos")));
    }

    #[tokio::test]
    async fn test_find_people_position_title() {
        let registry = registry().await;
        let result = registry
            .execute_tool("find_people", &params(json!({"position": "instructor"})))
            .await
            .unwrap();
        assert_eq!(result.data().len(), 1);
        assert_eq!(result.data()[0].get(SOURCE_FIELD), Some(&json!("faculty")));
    }

    #[tokio::test]
    async fn test_profile_requires_name_and_reports_empty() {
        let registry = registry().await;

        let missing = registry.execute_tool("get_person_profile", &Map::new()).await.unwrap();
        assert!(missing.is_error());

        let empty = registry
            .execute_tool("get_person_profile", &params(json!({"person_name": "Nobody Here"})))
            .await
            .unwrap();
        assert_eq!(empty.status(), shared_types_rs::ToolStatus::Empty);
        assert!(empty.summary().unwrap().contains("person_name='Nobody Here'"));

        let found = registry
            .execute_tool("get_person_profile", &params(json!({"person_name": "cruz"})))
            .await
            .unwrap();
        assert_eq!(found.data().len(), 2);
    }

    #[tokio::test]
    async fn test_schedule_lookup_by_owner() {
        let registry = registry().await;
        let result = registry
            .execute_tool("get_person_schedule", &params(json!({"person_name": "Ana"})))
            .await
            .unwrap();
        assert_eq!(result.data().len(), 1);
        assert_eq!(result.data()[0].get(SOURCE_FIELD), Some(&json!("schedules")));
    }

    #[tokio::test]
    async fn test_search_directory_requires_every_term() {
        let registry = registry().await;

        let result = registry
            .execute_tool(SEARCH_TOOL, &params(json!({"query": "bscs 2"})))
            .await
            .unwrap();
        assert_eq!(result.data().len(), 1);

        let nested = registry
            .execute_tool(SEARCH_TOOL, &params(json!({"query": "cs101"})))
            .await
            .unwrap();
        assert_eq!(nested.data()[0].get(SOURCE_FIELD), Some(&json!("schedules")));

        let none = registry
            .execute_tool(SEARCH_TOOL, &params(json!({"query": "astronomy"})))
            .await
            .unwrap();
        assert!(!none.has_rows());
    }
}
