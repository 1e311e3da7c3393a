//! Typed finds over the record database layouts the site reads.

use serde_json::{Value, json};

use super::{RecordSource, SortSpec};
use crate::error::JbsResult;

const PROGRAM_LAYOUT: &str = "LearningProgramApi";
const EVENT_LAYOUT: &str = "WorkshopEventApi";

pub struct ProgramRepository;

impl ProgramRepository {
    /// Program records whose code equals `slug`, matched uppercase.
    pub async fn find_by_slug(source: &dyn RecordSource, slug: &str) -> JbsResult<Vec<Value>> {
        source
            .find(
                PROGRAM_LAYOUT,
                json!({ "LearningProgramCode": format!("={}", slug.to_uppercase()) }),
                vec![SortSpec::ascend("LearningProgramNameE")],
            )
            .await
    }
}

pub struct EventRepository;

impl EventRepository {
    pub async fn find_by_id(source: &dyn RecordSource, id: &str) -> JbsResult<Vec<Value>> {
        source
            .find(
                EVENT_LAYOUT,
                json!({ "ID": format!("={id}") }),
                vec![SortSpec::ascend("ID")],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSource {
        calls: Mutex<Vec<(String, Value, Vec<SortSpec>)>>,
    }

    #[async_trait]
    impl RecordSource for RecordingSource {
        async fn find(&self, layout: &str, query: Value, sort: Vec<SortSpec>) -> JbsResult<Vec<Value>> {
            self.calls.lock().unwrap().push((layout.to_string(), query, sort));
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_program_lookup_uppercases_slug() {
        let source = RecordingSource::default();
        ProgramRepository::find_by_slug(&source, "c04").await.unwrap();

        let calls = source.calls.lock().unwrap();
        let (layout, query, sort) = &calls[0];
        assert_eq!(layout, "LearningProgramApi");
        assert_eq!(query, &json!({ "LearningProgramCode": "=C04" }));
        assert_eq!(sort, &vec![SortSpec::ascend("LearningProgramNameE")]);
    }

    #[tokio::test]
    async fn test_event_lookup_matches_exact_id() {
        let source = RecordingSource::default();
        EventRepository::find_by_id(&source, "E-17").await.unwrap();

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0].0, "WorkshopEventApi");
        assert_eq!(calls[0].1, json!({ "ID": "=E-17" }));
    }
}
