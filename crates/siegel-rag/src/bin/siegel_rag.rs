//! Siegel RAG command line
//!
//! Run with: cargo run -p siegel-rag -- ask "Welche Farbe haben die Zacken?"

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siegel_rag::interactions::{ExportFormat, JsonlInteractionLog};
use siegel_rag::server::{state::AppState, RagServer};
use siegel_rag::types::AskResponse;
use siegel_rag::{RagConfig, RagPipeline};

#[derive(Parser, Debug)]
#[command(
    name = "siegel-rag",
    version,
    about = "Answer questions about city seals from the Siegel creation guide"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, env = "SIEGEL_RAG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Corpus root, overrides corpus.root
    #[arg(long, env = "SIEGEL_RAG_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Index directory, overrides index.storage_dir
    #[arg(long, env = "SIEGEL_RAG_INDEX_DIR", global = true)]
    index_dir: Option<PathBuf>,

    /// Interaction log directory, overrides logging.log_dir
    #[arg(long, env = "SIEGEL_RAG_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer one question
    Ask {
        question: String,

        /// Identifier recorded in the interaction log
        #[arg(long)]
        user: Option<String>,

        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,

        /// Print the full response as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Rebuild the index from the corpus
    Rebuild,
    /// Show the persisted index manifest
    Info,
    /// Show interaction log statistics
    Stats,
    /// Export the interaction log
    Export {
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Output directory
        #[arg(long, default_value = "exports")]
        out: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => ExportFormat::Csv,
            Format::Json => ExportFormat::Json,
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<RagConfig> {
        let mut config = RagConfig::load(self.config.as_deref())
            .context("failed to load configuration")?;
        if let Some(dir) = &self.data_dir {
            config.corpus.root = dir.clone();
        }
        if let Some(dir) = &self.index_dir {
            config.index.storage_dir = dir.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.logging.log_dir = dir.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siegel_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = cli.load_config()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Corpus: {}", config.corpus.root.display());
    tracing::info!("  - Index: {}", config.index.storage_dir.display());
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - LLM model: {}", config.llm.model);

    match cli.command {
        Command::Ask {
            question,
            user,
            top_k,
            json,
        } => {
            let (pipeline, _log) = RagPipeline::from_config(config)?;
            let user = user.as_deref().unwrap_or(siegel_rag::types::query::ANONYMOUS_USER);
            match pipeline.ask_with(user, &question, top_k).await {
                Ok(answer) => {
                    if json {
                        let response = AskResponse::from(&answer);
                        println!("{}", serde_json::to_string_pretty(&response)?);
                    } else {
                        println!("{}\n", answer.answer);
                        for citation in answer.citations() {
                            println!("  {}", citation.format_inline());
                        }
                    }
                }
                Err(err) => {
                    let sources = err.sources();
                    if !sources.is_empty() {
                        eprintln!("Sources found before the failure:");
                        for source in &sources {
                            eprintln!("  - {}", source);
                        }
                    }
                    return Err(err.error.into());
                }
            }
        }
        Command::Rebuild => {
            let (pipeline, _log) = RagPipeline::from_config(config)?;
            let index = pipeline.rebuild_index().await?;
            println!(
                "Rebuilt index: {} chunks from {} documents",
                index.len(),
                index.manifest().document_count
            );
        }
        Command::Info => {
            let (pipeline, _log) = RagPipeline::from_config(config)?;
            let manifest = pipeline.index_info()?;
            println!("{}", serde_json::to_string_pretty(&manifest)?);
        }
        Command::Stats => {
            let log = JsonlInteractionLog::open(&config.logging.log_dir)?;
            println!("{}", serde_json::to_string_pretty(&log.stats()?)?);
        }
        Command::Export { format, out } => {
            let log = JsonlInteractionLog::open(&config.logging.log_dir)?;
            let written = log.export(format.into(), &out)?;
            if written.is_empty() {
                println!("Nothing to export");
            }
            for path in written {
                println!("{}", path.display());
            }
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let (pipeline, log) = RagPipeline::from_config(config)?;
            if log.is_none() {
                tracing::warn!("Interaction logging disabled; /api/stats will be empty");
            }
            let server = RagServer::with_state(AppState::new(pipeline, log));
            println!("Listening on http://{}", server.address());
            server.start().await?;
        }
    }

    Ok(())
}
