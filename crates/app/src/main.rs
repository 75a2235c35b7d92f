use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use docflow_core::{
    ClientConfig, ContentSink, GraphRegistry, IndexQuery, PipelineCoordinator, ServiceClient,
    TaskOutcome, DEFAULT_ENDPOINT, DEFAULT_NAMESPACE,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// The stock multimodal PDF pipeline: text and page images are pulled from
/// the raw document, text is chunked and embedded, images are embedded with
/// a vision model. Registered as-is by `docflow bootstrap`.
const MULTIMODAL_PIPELINE: &str = r#"
name: "pdf_multimodal"
extraction_policies:
  - extractor: "hub/pdf-extractor"
    name: "pdf_to_text"
  - extractor: "hub/pdf-extractor"
    name: "pdf_to_image"
    input_params:
      output_types: ["image"]
  - extractor: "hub/chunk-extractor"
    name: "text_to_chunks"
    input_params:
      text_splitter: "recursive"
      chunk_size: 1000
      overlap: 200
    content_source: "pdf_to_text"
  - extractor: "hub/minilm-l6"
    name: "chunks_to_embeddings"
    content_source: "text_to_chunks"
  - extractor: "hub/clip-extractor"
    name: "image_to_embeddings"
    content_source: "pdf_to_image"
"#;

#[derive(Parser)]
#[command(name = "docflow", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the extraction service.
    #[arg(long, env = "DOCFLOW_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Namespace the commands operate in.
    #[arg(long, env = "DOCFLOW_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Bearer token, if the service requires one.
    #[arg(long, env = "DOCFLOW_API_KEY")]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Register the built-in multimodal PDF pipeline.
    Bootstrap,
    /// Parse an extraction graph from a YAML file and register it.
    SubmitGraph {
        /// Path to the graph definition.
        #[arg(long)]
        file: String,
    },
    /// List the extraction graphs in the namespace.
    Graphs,
    /// Upload every readable PDF in a folder into a graph.
    Upload {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: String,
        /// Target extraction graph.
        #[arg(long)]
        graph: String,
        /// Labels attached to each upload, as key=value. Repeatable.
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Block until extraction has settled for each upload.
        #[arg(long, default_value_t = false)]
        wait: bool,
        /// Polls per document before giving up when --wait is set.
        #[arg(long, default_value = "150")]
        max_polls: usize,
    },
    /// Show extraction progress for one piece of content.
    Status {
        #[arg(long)]
        graph: String,
        #[arg(long)]
        content_id: String,
    },
    /// Query an embedding index produced by a graph.
    Search {
        /// Index name.
        #[arg(long)]
        index: String,
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value = "10")]
        top_k: usize,
    },
    /// List the extractors registered on the service.
    Extractors,
    /// List the indexes available in the namespace.
    Indexes,
    /// List namespaces.
    Namespaces,
    /// Create a namespace.
    CreateNamespace {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::default()
        .with_endpoint(&cli.endpoint)
        .with_namespace(&cli.namespace)
        .with_api_key(cli.api_key.clone());
    let client = ServiceClient::new(config)?;

    info!(
        version = app_version,
        endpoint = %client.endpoint(),
        namespace = %client.namespace(),
        started_at = %Utc::now().to_rfc3339(),
        "docflow boot"
    );

    let coordinator =
        PipelineCoordinator::new(client.clone(), client.clone(), client.clone());

    match cli.command {
        Command::Bootstrap => {
            println!("{}", MULTIMODAL_PIPELINE.trim_start());
            let graph = coordinator.publish_graph(MULTIMODAL_PIPELINE).await?;
            println!(
                "graph {} registered with {} extraction policies",
                graph.name,
                graph.extraction_policies.len()
            );
        }
        Command::SubmitGraph { file } => {
            let spec = std::fs::read_to_string(&file)?;
            let graph = coordinator.publish_graph(&spec).await?;
            println!("graph {} registered", graph.name);
            for policy in &graph.extraction_policies {
                match &policy.content_source {
                    Some(source) => {
                        println!("  {} <- {} ({})", policy.name, source, policy.extractor)
                    }
                    None => println!("  {} <- <document> ({})", policy.name, policy.extractor),
                }
            }
        }
        Command::Graphs => {
            let graphs = client.list_extraction_graphs().await?;
            if graphs.is_empty() {
                println!("no extraction graphs in namespace {}", client.namespace());
            }
            for graph in graphs {
                println!(
                    "{} ({} policies)",
                    graph.name,
                    graph.extraction_policies.len()
                );
            }
        }
        Command::Upload {
            folder,
            graph,
            labels,
            wait,
            max_polls,
        } => {
            let labels = parse_labels(&labels)?;
            let report = coordinator
                .ingest_folder(Path::new(&folder), &graph, &labels)
                .await?;

            for skipped in &report.skipped {
                println!(
                    "skipped {}: {}",
                    skipped.path.display(),
                    skipped.reason
                );
            }
            for receipt in &report.receipts {
                println!("uploaded content_id={}", receipt.content_id);
            }
            println!(
                "{} uploaded, {} skipped at {}",
                report.receipts.len(),
                report.skipped.len(),
                Utc::now().to_rfc3339()
            );

            if wait {
                for receipt in &report.receipts {
                    let progress = coordinator
                        .await_extraction(&graph, &receipt.content_id, max_polls)
                        .await?;
                    println!(
                        "content {} settled: {} succeeded, {} failed",
                        receipt.content_id, progress.succeeded, progress.failed
                    );
                }
            }
        }
        Command::Status { graph, content_id } => {
            let progress = client.extraction_progress(&graph, &content_id).await?;
            println!(
                "content {}: {} pending, {} succeeded, {} failed",
                content_id, progress.pending, progress.succeeded, progress.failed
            );

            let tasks = client.list_tasks(&graph, &content_id).await?;
            for task in tasks
                .iter()
                .filter(|task| task.outcome == TaskOutcome::Failed)
            {
                println!("  failed: policy={} task={}", task.extraction_policy, task.id);
            }
        }
        Command::Search {
            index,
            query,
            top_k,
        } => {
            let hits = coordinator.search(&index, &query, top_k).await?;
            println!("query: {query}");
            for hit in hits {
                println!("[{:.4}] content_id={}", hit.confidence_score, hit.content_id);
                println!("  {}", hit.text);
                for (key, value) in &hit.labels {
                    println!("  label {key}={value}");
                }
            }
        }
        Command::Extractors => {
            let extractors = client.list_extractors().await?;
            for extractor in extractors {
                println!("{}", extractor.name);
                if !extractor.description.is_empty() {
                    println!("  {}", extractor.description);
                }
                if !extractor.input_mime_types.is_empty() {
                    println!("  accepts: {}", extractor.input_mime_types.join(", "));
                }
            }
        }
        Command::Indexes => {
            let indexes = client.list_indexes().await?;
            if indexes.is_empty() {
                println!("no indexes in namespace {}", client.namespace());
            }
            for index in indexes {
                println!("{}", index.name);
            }
        }
        Command::Namespaces => {
            let namespaces = client.list_namespaces().await?;
            for namespace in namespaces {
                println!(
                    "{} ({} graphs)",
                    namespace.name,
                    namespace.extraction_graphs.len()
                );
            }
        }
        Command::CreateNamespace { name } => {
            client.create_namespace(&name).await?;
            println!("namespace {name} created");
        }
    }

    Ok(())
}

fn parse_labels(raw: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut labels = HashMap::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            bail!("label must be key=value: {item}");
        };
        labels.insert(key.to_string(), value.to_string());
    }
    Ok(labels)
}
