mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use research_copilot_core::config::{API_KEY_VARIABLE, DEFAULT_COLLECTION, DEFAULT_OPENAI_BASE_URL};
use research_copilot_core::embeddings::{DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL};
use research_copilot_core::llm::DEFAULT_CHAT_MODEL;
use research_copilot_core::retriever::DEFAULT_TOP_K;
use research_copilot_core::tokenizer::DEFAULT_TOKENIZER_MODEL;
use research_copilot_core::{
    build_ingestor, build_pipeline, config::parse_url, AppConfig, Catalog, EmbeddingProvider,
    IndexBackend, IngestionOptions, IngestionReport, PipelineResponse, Strategy,
};
use server::{AppState, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "research-copilot", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Provider API key
    #[arg(long, env = API_KEY_VARIABLE, hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Folder holding the catalog's PDF files
    #[arg(long, env = "PAPERS_DIR", default_value = "papers", global = true)]
    papers_dir: PathBuf,

    /// Paper catalog JSON file
    #[arg(long, env = "PAPER_CATALOG", default_value = "papers/paper_catalog.json", global = true)]
    catalog: PathBuf,

    /// Folder holding one prompt template per strategy
    #[arg(long, env = "PROMPTS_DIR", default_value = "prompts", global = true)]
    prompts_dir: PathBuf,

    /// Vector index backend
    #[arg(long, value_enum, env = "INDEX_BACKEND", default_value_t = Backend::Local, global = true)]
    index_backend: Backend,

    /// Directory of the local vector index
    #[arg(long, env = "INDEX_PATH", default_value = "./vector_index", global = true)]
    index_path: PathBuf,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333", global = true)]
    qdrant_url: String,

    /// Collection name in the vector index
    #[arg(long, env = "COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    collection: String,

    /// Embedding provider
    #[arg(long, value_enum, env = "EMBEDDING_PROVIDER", default_value_t = Provider::Openai, global = true)]
    embedding_provider: Provider,

    /// Embedding model name
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    embedding_model: String,

    /// Embedding vector dimensions
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS, global = true)]
    embedding_dimensions: usize,

    /// Chat model name
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL, global = true)]
    chat_model: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL, global = true)]
    openai_base_url: String,

    /// Number of chunks retrieved per question
    #[arg(long, env = "TOP_K", default_value_t = DEFAULT_TOP_K, global = true)]
    top_k: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Local,
    Qdrant,
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    Openai,
    Hashing,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed and index every paper in the catalog.
    Ingest {
        /// Tokens per chunk.
        #[arg(long, default_value = "512")]
        chunk_size: usize,
        /// Tokens shared by consecutive chunks.
        #[arg(long, default_value = "50")]
        chunk_overlap: usize,
        /// Drop the collection before indexing.
        #[arg(long, default_value_t = false)]
        reset: bool,
    },
    /// Answer one question with citations.
    Ask {
        #[arg(long)]
        question: String,
        /// Prompt strategy id.
        #[arg(long, default_value = "v1_delimiters")]
        strategy: String,
        /// Print the full response as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List catalog titles and check the papers folder against it.
    Catalog,
    /// Serve the HTTP endpoint and the interactive UI.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value = "8000")]
        port: u16,
    },
}

impl Cli {
    fn app_config(&self) -> anyhow::Result<AppConfig> {
        let index = match self.index_backend {
            Backend::Local => IndexBackend::Local {
                path: self.index_path.clone(),
            },
            Backend::Qdrant => IndexBackend::Qdrant {
                url: parse_url(&self.qdrant_url).context("invalid --qdrant-url")?,
            },
        };
        let embedding_provider = match self.embedding_provider {
            Provider::Openai => EmbeddingProvider::OpenAi,
            Provider::Hashing => EmbeddingProvider::Hashing,
        };

        Ok(AppConfig {
            api_key: self.api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            papers_dir: self.papers_dir.clone(),
            catalog_path: self.catalog.clone(),
            prompts_dir: self.prompts_dir.clone(),
            index,
            collection: self.collection.clone(),
            embedding_provider,
            embedding_model: self.embedding_model.clone(),
            embedding_dimensions: self.embedding_dimensions,
            chat_model: self.chat_model.clone(),
            tokenizer_model: DEFAULT_TOKENIZER_MODEL.to_string(),
            top_k: self.top_k,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.app_config()?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "research-copilot boot"
    );

    match cli.command {
        Command::Ingest {
            chunk_size,
            chunk_overlap,
            reset,
        } => {
            let catalog = Catalog::load(&config.catalog_path)?;
            let options = IngestionOptions {
                chunk_size,
                chunk_overlap,
                reset,
                ..IngestionOptions::default()
            };
            let ingestor = build_ingestor(&config, options).await?;
            let report = ingestor.run(&catalog, &config.papers_dir).await?;
            print_report(&report);
        }
        Command::Ask {
            question,
            strategy,
            json,
        } => {
            let strategy: Strategy = strategy.parse()?;
            let pipeline = build_pipeline(&config).await?;
            let response = pipeline.query(&question, strategy).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                print_response(&response);
            }
        }
        Command::Catalog => {
            let catalog = Catalog::load(&config.catalog_path)?;
            println!("{}", catalog.titles_listing());

            let audit = catalog.audit(&config.papers_dir);
            for filename in &audit.missing_pdfs {
                warn!(filename = %filename, "catalog entry has no pdf");
                println!("missing: {filename}");
            }
            for path in &audit.unreferenced_pdfs {
                println!("unreferenced: {}", path.display());
            }
        }
        Command::Serve { host, port } => {
            let pipeline = build_pipeline(&config).await?;
            let state = AppState {
                pipeline: Arc::new(pipeline),
            };
            server::run_server(ServerConfig { host, port }, state).await?;
        }
    }

    Ok(())
}

fn print_report(report: &IngestionReport) {
    for skipped in &report.missing {
        println!("missing: {} ({})", skipped.paper_id, skipped.path.display());
    }
    for skipped in &report.failed {
        println!("failed: {} ({}): {}", skipped.paper_id, skipped.path.display(), skipped.reason);
    }
    println!(
        "{} of {} papers ingested, {} chunks indexed at {}",
        report.processed,
        report.papers_total,
        report.total_chunks,
        report.finished_at.to_rfc3339()
    );
}

fn print_response(response: &PipelineResponse) {
    println!("{}", response.answer);
    if !response.citations.is_empty() {
        println!();
        println!("Sources:");
        for citation in &response.citations {
            println!("{citation}");
        }
    }
    for (rank, chunk) in response.retrieved_chunks.iter().enumerate() {
        let title = chunk
            .metadata
            .get("title")
            .map(ToString::to_string)
            .unwrap_or_default();
        match chunk.distance {
            Some(distance) => println!("[{}] distance={distance:.4} {title}", rank + 1),
            None => println!("[{}] {title}", rank + 1),
        }
    }
}
