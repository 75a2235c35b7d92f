use crate::error::ApiError;
use crate::graph::ExtractionGraph;
use crate::ingest::{plan_folder_upload, SkippedFile};
use crate::models::{ExtractionProgress, SearchHit, UploadReceipt};
use crate::traits::{ContentSink, GraphRegistry, IndexQuery};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct IngestReport {
    pub receipts: Vec<UploadReceipt>,
    pub skipped: Vec<SkippedFile>,
}

/// Drives the full client-side flow against the service seams: publish a
/// graph, feed it documents, watch extraction settle, query the indexes.
pub struct PipelineCoordinator<R, C, Q>
where
    R: GraphRegistry,
    C: ContentSink,
    Q: IndexQuery,
{
    registry: R,
    content: C,
    indexes: Q,
    poll_interval: Duration,
}

impl<R, C, Q> PipelineCoordinator<R, C, Q>
where
    R: GraphRegistry + Send + Sync,
    C: ContentSink + Send + Sync,
    Q: IndexQuery + Send + Sync,
{
    pub fn new(registry: R, content: C, indexes: Q) -> Self {
        Self {
            registry,
            content,
            indexes,
            poll_interval: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Parses the declarative document once and registers the result once.
    /// A graph that fails validation never reaches the service.
    pub async fn publish_graph(&self, spec: &str) -> Result<ExtractionGraph, ApiError> {
        let graph = ExtractionGraph::from_yaml(spec).map_err(ApiError::Graph)?;
        self.registry.create_extraction_graph(&graph).await?;
        info!(
            graph = %graph.name,
            policies = graph.extraction_policies.len(),
            "extraction graph registered"
        );
        Ok(graph)
    }

    /// Uploads every readable PDF under `folder` into `graph`. Files the
    /// preflight rejects are reported in the returned plan, not fatal.
    pub async fn ingest_folder(
        &self,
        folder: &Path,
        graph: &str,
        labels: &HashMap<String, String>,
    ) -> Result<IngestReport, ApiError> {
        let plan = plan_folder_upload(folder, labels)?;

        for skipped in &plan.skipped {
            warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
        }

        let mut receipts = Vec::new();
        for request in &plan.requests {
            let receipt = self.content.upload(graph, request).await?;
            debug!(content_id = %receipt.content_id, file = %request.file_name, "uploaded");
            receipts.push(receipt);
        }

        Ok(IngestReport {
            receipts,
            skipped: plan.skipped,
        })
    }

    /// Polls task outcomes until every policy of `graph` has finished with
    /// `content_id`, or `max_polls` checks have been spent.
    pub async fn await_extraction(
        &self,
        graph: &str,
        content_id: &str,
        max_polls: usize,
    ) -> Result<ExtractionProgress, ApiError> {
        let mut progress = self.content.extraction_progress(graph, content_id).await?;
        let mut polls = 1;

        while !progress.is_settled() && polls < max_polls {
            debug!(
                content_id,
                pending = progress.pending,
                succeeded = progress.succeeded,
                failed = progress.failed,
                "extraction in flight"
            );
            sleep(self.poll_interval).await;
            progress = self.content.extraction_progress(graph, content_id).await?;
            polls += 1;
        }

        if !progress.is_settled() {
            return Err(ApiError::ExtractionPending {
                content_id: content_id.to_string(),
                pending: progress.pending,
            });
        }

        if progress.failed > 0 {
            warn!(content_id, failed = progress.failed, "extraction finished with failures");
        }

        Ok(progress)
    }

    pub async fn search(
        &self,
        index: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::InvalidArgument("query is empty".to_string()));
        }
        self.indexes.search_index(index, query, top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentMetadata, IndexInfo, UploadRequest};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRegistry {
        created: Mutex<Vec<ExtractionGraph>>,
    }

    #[async_trait]
    impl GraphRegistry for FakeRegistry {
        async fn create_namespace(&self, _name: &str) -> Result<(), ApiError> {
            Ok(())
        }

        async fn create_extraction_graph(&self, graph: &ExtractionGraph) -> Result<(), ApiError> {
            self.created.lock().expect("lock").push(graph.clone());
            Ok(())
        }

        async fn list_extraction_graphs(&self) -> Result<Vec<ExtractionGraph>, ApiError> {
            Ok(self.created.lock().expect("lock").clone())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        uploads: Mutex<Vec<UploadRequest>>,
        progress: Mutex<VecDeque<ExtractionProgress>>,
    }

    #[async_trait]
    impl ContentSink for FakeSink {
        async fn upload(
            &self,
            _graph: &str,
            request: &UploadRequest,
        ) -> Result<UploadReceipt, ApiError> {
            self.uploads.lock().expect("lock").push(request.clone());
            Ok(UploadReceipt {
                content_id: format!("content-{}", request.id),
                checksum_sha256: request.checksum_sha256.clone(),
            })
        }

        async fn list_content(&self, _graph: &str) -> Result<Vec<ContentMetadata>, ApiError> {
            Ok(Vec::new())
        }

        async fn extraction_progress(
            &self,
            _graph: &str,
            _content_id: &str,
        ) -> Result<ExtractionProgress, ApiError> {
            let mut queue = self.progress.lock().expect("lock");
            Ok(queue.pop_front().unwrap_or(ExtractionProgress {
                pending: 0,
                succeeded: 1,
                failed: 0,
            }))
        }
    }

    #[derive(Default)]
    struct FakeIndexes {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl IndexQuery for FakeIndexes {
        async fn list_indexes(&self) -> Result<Vec<IndexInfo>, ApiError> {
            Ok(Vec::new())
        }

        async fn search_index(
            &self,
            _index: &str,
            _query: &str,
            _top_k: usize,
        ) -> Result<Vec<SearchHit>, ApiError> {
            Ok(self.hits.clone())
        }
    }

    fn coordinator() -> PipelineCoordinator<FakeRegistry, FakeSink, FakeIndexes> {
        PipelineCoordinator::new(
            FakeRegistry::default(),
            FakeSink::default(),
            FakeIndexes::default(),
        )
        .with_poll_interval(Duration::from_millis(1))
    }

    const PIPELINE: &str = r#"
name: "pdf_multimodal"
extraction_policies:
  - extractor: "hub/pdf-extractor"
    name: "pdf_to_text"
  - extractor: "hub/chunk-extractor"
    name: "text_to_chunks"
    content_source: "pdf_to_text"
"#;

    #[tokio::test]
    async fn publish_parses_once_and_registers_once() {
        let coordinator = coordinator();

        let graph = coordinator
            .publish_graph(PIPELINE)
            .await
            .expect("pipeline should publish");

        let created = coordinator.registry.created.lock().expect("lock");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0], graph);
        assert_eq!(created[0].name, "pdf_multimodal");
    }

    #[tokio::test]
    async fn invalid_graphs_are_never_submitted() {
        let coordinator = coordinator();

        let result = coordinator.publish_graph("name: [nonsense").await;

        assert!(matches!(result, Err(ApiError::Graph(_))));
        assert!(coordinator.registry.created.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn await_extraction_polls_until_settled() {
        let coordinator = coordinator();
        {
            let mut queue = coordinator.content.progress.lock().expect("lock");
            queue.push_back(ExtractionProgress {
                pending: 2,
                succeeded: 0,
                failed: 0,
            });
            queue.push_back(ExtractionProgress {
                pending: 1,
                succeeded: 1,
                failed: 0,
            });
            queue.push_back(ExtractionProgress {
                pending: 0,
                succeeded: 1,
                failed: 1,
            });
        }

        let progress = coordinator
            .await_extraction("pdf_multimodal", "content-1", 10)
            .await
            .expect("extraction settles");

        assert!(progress.is_settled());
        assert_eq!(progress.succeeded, 1);
        assert_eq!(progress.failed, 1);
    }

    #[tokio::test]
    async fn await_extraction_gives_up_after_max_polls() {
        let coordinator = coordinator();
        {
            let mut queue = coordinator.content.progress.lock().expect("lock");
            for _ in 0..5 {
                queue.push_back(ExtractionProgress {
                    pending: 3,
                    succeeded: 0,
                    failed: 0,
                });
            }
        }

        let result = coordinator
            .await_extraction("pdf_multimodal", "content-1", 3)
            .await;

        assert!(matches!(
            result,
            Err(ApiError::ExtractionPending { content_id, pending })
                if content_id == "content-1" && pending == 3
        ));
    }

    #[tokio::test]
    async fn ingest_reports_skips_without_uploading_them() -> Result<(), Box<dyn std::error::Error>>
    {
        let coordinator = coordinator();
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken")?;

        let report = coordinator
            .ingest_folder(dir.path(), "pdf_multimodal", &HashMap::new())
            .await?;

        assert!(report.receipts.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(coordinator.content.uploads.lock().expect("lock").is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_queries_are_rejected_before_the_network() {
        let coordinator = coordinator();
        let result = coordinator.search("chunks_to_embeddings", "   ", 5).await;
        assert!(matches!(result, Err(ApiError::InvalidArgument(_))));
    }
}
