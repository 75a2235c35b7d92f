use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid graph name: {0:?}")]
    InvalidGraphName(String),

    #[error("invalid policy name: {0:?}")]
    InvalidPolicyName(String),

    #[error("policy {0} has no extractor")]
    MissingExtractor(String),

    #[error("duplicate policy name: {0}")]
    DuplicatePolicy(String),

    #[error("policy {policy} reads from {source}, which is not defined earlier in the graph")]
    UnknownContentSource { policy: String, source: String },

    #[error("policy {0} names itself as content source")]
    SelfReference(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("no pdf files found in {0}")]
    NoPdfFiles(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("graph rejected: {0}")]
    Graph(#[from] GraphError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("extraction still pending for {content_id}: {pending} task(s) outstanding")]
    ExtractionPending { content_id: String, pending: u64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
