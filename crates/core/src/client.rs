use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::graph::ExtractionGraph;
use crate::models::{
    ContentMetadata, ExtractionProgress, ExtractorInfo, IndexInfo, Namespace, SearchHit, Task,
    UploadReceipt, UploadRequest,
};
use crate::retry::with_backoff;
use crate::traits::{ContentSink, GraphRegistry, IndexQuery};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

/// HTTP handle to the extraction service. All graph registration, content
/// upload, and index search traffic goes through this client; the hard work
/// (scheduling, extractor execution, index maintenance) happens server-side.
#[derive(Clone)]
pub struct ServiceClient {
    config: ClientConfig,
    base: String,
    client: Client,
}

impl ServiceClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        // malformed endpoints fail here, not on the first request
        let parsed = Url::parse(&config.endpoint)?;
        let base = parsed.as_str().trim_end_matches('/').to_string();
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            base,
            client,
        })
    }

    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ClientConfig::from_env())
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub fn endpoint(&self) -> &str {
        &self.base
    }

    fn namespace_url(&self, suffix: &str) -> String {
        format!(
            "{}/namespaces/{}/{}",
            self.base, self.config.namespace, suffix
        )
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn check(endpoint: &str, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    /// GETs are idempotent and retried with backoff; mutations go out
    /// exactly once and surface their first failure.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        with_backoff(&self.config.retry, endpoint, || async move {
            debug!(endpoint, "GET");
            let response = self.authed(self.client.get(endpoint)).send().await?;
            let response = Self::check(endpoint, response).await?;
            Ok(response.json::<T>().await?)
        })
        .await
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(endpoint, "POST");
        let response = self
            .authed(self.client.post(endpoint))
            .json(body)
            .send()
            .await?;
        let response = Self::check(endpoint, response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_unit<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        debug!(endpoint, "POST");
        let response = self
            .authed(self.client.post(endpoint))
            .json(body)
            .send()
            .await?;
        Self::check(endpoint, response).await?;
        Ok(())
    }

    pub async fn list_namespaces(&self) -> Result<Vec<Namespace>, ApiError> {
        let endpoint = format!("{}/namespaces", self.base);
        let listed: NamespaceList = self.get_json(&endpoint).await?;
        Ok(listed.namespaces)
    }

    pub async fn list_extractors(&self) -> Result<Vec<ExtractorInfo>, ApiError> {
        let endpoint = format!("{}/extractors", self.base);
        let listed: ExtractorList = self.get_json(&endpoint).await?;
        Ok(listed.extractors)
    }

    pub async fn content_metadata(&self, content_id: &str) -> Result<ContentMetadata, ApiError> {
        let endpoint = self.namespace_url(&format!("content/{content_id}/metadata"));
        self.get_json(&endpoint).await
    }

    /// Per-policy task records for one piece of content; `extraction_progress`
    /// folds these into aggregate counts.
    pub async fn list_tasks(&self, graph: &str, content_id: &str) -> Result<Vec<Task>, ApiError> {
        let endpoint =
            self.namespace_url(&format!("extraction_graphs/{graph}/content/{content_id}/tasks"));
        let listed: TaskList = self.get_json(&endpoint).await?;
        Ok(listed.tasks)
    }
}

#[async_trait]
impl GraphRegistry for ServiceClient {
    async fn create_namespace(&self, name: &str) -> Result<(), ApiError> {
        let endpoint = format!("{}/namespaces", self.base);
        self.post_unit(&endpoint, &json!({ "name": name })).await
    }

    async fn create_extraction_graph(&self, graph: &ExtractionGraph) -> Result<(), ApiError> {
        graph.validate()?;
        let endpoint = self.namespace_url("extraction_graphs");
        self.post_unit(&endpoint, graph).await
    }

    async fn list_extraction_graphs(&self) -> Result<Vec<ExtractionGraph>, ApiError> {
        let endpoint = self.namespace_url("extraction_graphs");
        let listed: GraphList = self.get_json(&endpoint).await?;
        Ok(listed.graphs)
    }
}

#[async_trait]
impl ContentSink for ServiceClient {
    async fn upload(
        &self,
        graph: &str,
        request: &UploadRequest,
    ) -> Result<UploadReceipt, ApiError> {
        let endpoint = self.namespace_url(&format!("extraction_graphs/{graph}/content"));
        self.post_json(&endpoint, request).await
    }

    async fn list_content(&self, graph: &str) -> Result<Vec<ContentMetadata>, ApiError> {
        let endpoint = self.namespace_url(&format!("extraction_graphs/{graph}/content"));
        let listed: ContentList = self.get_json(&endpoint).await?;
        Ok(listed.content_list)
    }

    async fn extraction_progress(
        &self,
        graph: &str,
        content_id: &str,
    ) -> Result<ExtractionProgress, ApiError> {
        let tasks = self.list_tasks(graph, content_id).await?;
        Ok(ExtractionProgress::from_tasks(&tasks))
    }
}

#[async_trait]
impl IndexQuery for ServiceClient {
    async fn list_indexes(&self) -> Result<Vec<IndexInfo>, ApiError> {
        let endpoint = self.namespace_url("indexes");
        let listed: IndexList = self.get_json(&endpoint).await?;
        Ok(listed.indexes)
    }

    async fn search_index(
        &self,
        index: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let endpoint = self.namespace_url(&format!("indexes/{index}/search"));
        let results: SearchResults = self
            .post_json(&endpoint, &json!({ "query": query, "k": top_k }))
            .await?;
        Ok(results.results)
    }
}

#[derive(Deserialize)]
struct NamespaceList {
    namespaces: Vec<Namespace>,
}

#[derive(Deserialize)]
struct GraphList {
    graphs: Vec<ExtractionGraph>,
}

#[derive(Deserialize)]
struct ExtractorList {
    extractors: Vec<ExtractorInfo>,
}

#[derive(Deserialize)]
struct ContentList {
    content_list: Vec<ContentMetadata>,
}

#[derive(Deserialize)]
struct TaskList {
    tasks: Vec<Task>,
}

#[derive(Deserialize)]
struct IndexList {
    indexes: Vec<IndexInfo>,
}

#[derive(Deserialize)]
struct SearchResults {
    results: Vec<SearchHit>,
}
