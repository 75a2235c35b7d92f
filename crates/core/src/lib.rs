pub mod client;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod models;
pub mod pipeline;
mod retry;
pub mod traits;

pub use client::ServiceClient;
pub use config::{ClientConfig, RetryConfig, DEFAULT_ENDPOINT, DEFAULT_NAMESPACE};
pub use error::{ApiError, GraphError, IngestError, Result};
pub use graph::{ExtractionGraph, ExtractionPolicy};
pub use ingest::{
    discover_pdf_files, plan_folder_upload, prepare_upload, preflight_pdf, SkippedFile, UploadPlan,
};
pub use models::{
    ContentMetadata, ExtractionProgress, ExtractorInfo, IndexInfo, Namespace, SearchHit, Task,
    TaskOutcome, UploadReceipt, UploadRequest,
};
pub use pipeline::{IngestReport, PipelineCoordinator};
pub use traits::{ContentSink, GraphRegistry, IndexQuery};
