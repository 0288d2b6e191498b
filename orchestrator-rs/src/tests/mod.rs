mod scenario_tests;

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};

use document_store::{Document, DocumentStore, MemoryDocumentStore};
use llm_client::{Generator, LlmError, Phase};
use shared_types_rs::{AnalystConfig, QueryLogRecord};

use crate::{Analyst, Generators};

mock! {
    pub Gen {}

    #[async_trait]
    impl Generator for Gen {
        async fn generate(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            json_mode: bool,
            phase: Phase,
        ) -> Result<String, LlmError>;

        fn model_name(&self, phase: Phase) -> String;
    }
}

/// Mock that names its models `{prefix}-{phase}`.
pub(crate) fn named_mock(prefix: &'static str) -> MockGen {
    let mut generator = MockGen::new();
    generator
        .expect_model_name()
        .returning(move |phase| format!("{}-{}", prefix, phase));
    generator
}

pub(crate) fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

pub(crate) async fn directory_store() -> Arc<MemoryDocumentStore> {
    let store = MemoryDocumentStore::new();
    store
        .insert_many(
            "students",
            vec![
                doc(json!({"student_id": "S-1", "full_name": "Ana Cruz", "position": "student", "program": "BSCS", "year_level": 2, "section": "A", "height": 170})),
                doc(json!({"student_id": "S-2", "full_name": "Ben Lim", "position": "student", "program": "BSCS", "year_level": 3, "section": "B", "height": 182})),
                doc(json!({"student_id": "S-3", "full_name": "Cara Sy", "position": "student", "program": "BSIT", "year_level": 2, "section": "A", "height": 165})),
            ],
        )
        .await
        .unwrap();
    store
        .insert_many(
            "faculty",
            vec![doc(json!({"faculty_id": "F-1", "full_name": "Rosa Lim", "position": "Dean", "department": "BSCS Department"}))],
        )
        .await
        .unwrap();
    store
        .insert_many(
            "schedules",
            vec![doc(json!({"owner_name": "BSCS 2A", "program": "BSCS", "year_level": 2, "section": "A", "subject": "Data Structures", "day": "Monday"}))],
        )
        .await
        .unwrap();
    Arc::new(store)
}

pub(crate) fn test_config() -> AnalystConfig {
    let mut config = AnalystConfig::default();
    config.pipeline.generation_timeout_secs = 1;
    config.pipeline.tool_timeout_secs = 5;
    config
}

pub(crate) fn analyst(store: Arc<MemoryDocumentStore>, generator: MockGen) -> Analyst {
    Analyst::configure(test_config(), store, Generators::single(Arc::new(generator))).unwrap()
}

/// Every record the logger wrote, oldest first.
pub(crate) async fn logged(store: &MemoryDocumentStore) -> Vec<QueryLogRecord> {
    store
        .aggregate("query_logs", &[])
        .await
        .unwrap()
        .into_iter()
        .map(|doc| serde_json::from_value(Value::Object(doc)).unwrap())
        .collect()
}

pub(crate) fn planner_reply(plan: Value) -> Result<String, LlmError> {
    Ok(format!("Here is the plan: {}", plan))
}
