use crate::graph::ExtractionGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub extraction_graphs: Vec<ExtractionGraph>,
}

/// An extractor implementation registered on the service, addressable from a
/// policy's `extractor` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_mime_types: Vec<String>,
    #[serde(default)]
    pub outputs: Value,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub id: String,
    /// Derived content carries the id of the content it was extracted from;
    /// root uploads have no parent.
    pub parent_id: Option<String>,
    pub namespace: String,
    pub extraction_graph: String,
    /// Name of the policy that produced this content, if any.
    pub source_policy: Option<String>,
    pub mime_type: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Unknown,
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub extractor: String,
    pub extraction_policy: String,
    pub content_id: String,
    pub outcome: TaskOutcome,
}

/// Aggregate task outcomes for one piece of content across all policies of
/// its graph.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExtractionProgress {
    pub pending: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl ExtractionProgress {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut progress = Self::default();
        for task in tasks {
            match task.outcome {
                TaskOutcome::Unknown => progress.pending += 1,
                TaskOutcome::Success => progress.succeeded += 1,
                TaskOutcome::Failed => progress.failed += 1,
            }
        }
        progress
    }

    /// True once every scheduled task has reached a terminal outcome.
    pub fn is_settled(&self) -> bool {
        self.pending == 0
    }

    pub fn total(&self) -> u64 {
        self.pending + self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    #[serde(default)]
    pub schema: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub content_id: String,
    pub text: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// A document upload prepared locally: the service stores the decoded bytes
/// under `id` and fans extraction out to the graph's root policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub content_base64: String,
    pub checksum_sha256: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub content_id: String,
    pub checksum_sha256: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, outcome: TaskOutcome) -> Task {
        Task {
            id: id.to_string(),
            extractor: "hub/pdf-extractor".to_string(),
            extraction_policy: "pdf_to_text".to_string(),
            content_id: "content-1".to_string(),
            outcome,
        }
    }

    #[test]
    fn progress_counts_task_outcomes() {
        let tasks = vec![
            task("t1", TaskOutcome::Success),
            task("t2", TaskOutcome::Unknown),
            task("t3", TaskOutcome::Failed),
            task("t4", TaskOutcome::Success),
        ];

        let progress = ExtractionProgress::from_tasks(&tasks);
        assert_eq!(progress.pending, 1);
        assert_eq!(progress.succeeded, 2);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.total(), 4);
        assert!(!progress.is_settled());
    }

    #[test]
    fn progress_with_no_outstanding_tasks_is_settled() {
        let tasks = vec![task("t1", TaskOutcome::Success), task("t2", TaskOutcome::Failed)];
        let progress = ExtractionProgress::from_tasks(&tasks);
        assert!(progress.is_settled());
    }

    #[test]
    fn upload_request_serializes_labels_and_checksum() {
        let request = UploadRequest {
            id: "a-client-id".to_string(),
            file_name: "manual.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            content_base64: "JVBERg==".to_string(),
            checksum_sha256: "deadbeef".to_string(),
            labels: HashMap::from([("source".to_string(), "manuals".to_string())]),
        };

        let value = serde_json::to_value(&request).expect("request serializes");
        assert_eq!(value["file_name"], "manual.pdf");
        assert_eq!(value["checksum_sha256"], "deadbeef");
        assert_eq!(value["labels"]["source"], "manuals");
    }
}
