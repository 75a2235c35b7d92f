use crate::error::ApiError;
use crate::graph::ExtractionGraph;
use crate::models::{
    ContentMetadata, ExtractionProgress, IndexInfo, SearchHit, UploadReceipt, UploadRequest,
};
use async_trait::async_trait;

/// Registration surface of the service: namespaces and the graphs that live
/// in them.
#[async_trait]
pub trait GraphRegistry {
    async fn create_namespace(&self, name: &str) -> Result<(), ApiError>;

    async fn create_extraction_graph(&self, graph: &ExtractionGraph) -> Result<(), ApiError>;

    async fn list_extraction_graphs(&self) -> Result<Vec<ExtractionGraph>, ApiError>;
}

/// Content surface: pushing documents into a graph and observing how far
/// extraction has progressed.
#[async_trait]
pub trait ContentSink {
    async fn upload(&self, graph: &str, request: &UploadRequest)
        -> Result<UploadReceipt, ApiError>;

    async fn list_content(&self, graph: &str) -> Result<Vec<ContentMetadata>, ApiError>;

    async fn extraction_progress(
        &self,
        graph: &str,
        content_id: &str,
    ) -> Result<ExtractionProgress, ApiError>;
}

/// Read side: the indexes populated by embedding policies.
#[async_trait]
pub trait IndexQuery {
    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, ApiError>;

    async fn search_index(
        &self,
        index: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ApiError>;
}
