//! # `dpk`: design-pack retrieval CLI
//!
//! ## Usage
//!
//! ```bash
//! dpk [--config ./config/dpk.toml] [-v] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dpk ingest <url>` | Fetch a page, chunk, embed and upsert it |
//! | `dpk ingest-file <path>` | Same for a local file |
//! | `dpk search "<query>"` | Print ranked hits |
//! | `dpk context "<query>"` | Print the assembled prompt context |
//! | `dpk assume <req.yaml>` | Draft assumptions & gaps for a requirement |
//! | `dpk config` | Print the effective configuration, secrets redacted |
//!
//! Without `QDRANT_URL` (or `vector_db.url`) search runs over the local
//! `kb/` directory and ingestion is unavailable.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use designpack_rag::assume::{draft_assumptions, module_filter};
use designpack_rag::config::{load_config, Config};
use designpack_rag::generate::create_generator;
use designpack_rag::ingest::{IngestReport, Ingestor};
use designpack_rag::retriever::{Retriever, SearchHits};
use designpack_rag_core::store::PayloadFilter;

/// Retrieval and ingestion for WMS design packs.
#[derive(Parser)]
#[command(name = "dpk", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./config/dpk.toml`
    /// when it exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a web page into the vector collection.
    Ingest {
        url: String,

        /// Module the document belongs to.
        #[arg(long)]
        module: Option<String>,

        /// Tag to attach; repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Ingest a local file into the vector collection.
    IngestFile {
        path: PathBuf,

        #[arg(long)]
        module: Option<String>,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Print the top hits for a query.
    Search {
        query: String,

        /// Number of hits (default: 4 local, 6 remote).
        #[arg(short, long)]
        k: Option<usize>,

        /// Restrict remote hits to one module.
        #[arg(long)]
        module: Option<String>,
    },

    /// Print the prompt context assembled for a query.
    Context {
        query: String,

        #[arg(short, long)]
        k: Option<usize>,

        #[arg(long)]
        module: Option<String>,
    },

    /// Draft assumptions & gaps for a YAML requirement.
    Assume {
        requirement: PathBuf,

        #[arg(long, default_value = "Inbound")]
        module: String,

        /// Generation provider: none, openai, gemini or ollama.
        #[arg(long)]
        provider: Option<String>,

        #[arg(short, long)]
        k: Option<usize>,

        /// Also print the retrieval query and context.
        #[arg(long)]
        show_context: bool,
    },

    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest { url, module, tags } => {
            let ingestor = Ingestor::from_config(&config)?;
            let report = ingestor.ingest_url(&url, module.as_deref(), &tags).await?;
            print_report(&report);
        }
        Commands::IngestFile { path, module, tags } => {
            let ingestor = Ingestor::from_config(&config)?;
            let report = ingestor
                .ingest_file(&path, module.as_deref(), &tags)
                .await?;
            print_report(&report);
        }
        Commands::Search { query, k, module } => {
            let retriever = Retriever::from_config(&config)?;
            let k = k.unwrap_or_else(|| retriever.default_k());
            let hits = retriever.search(&query, k, &filter_for(module)).await;
            print_hits(&hits);
        }
        Commands::Context { query, k, module } => {
            let retriever = Retriever::from_config(&config)?;
            let k = k.unwrap_or_else(|| retriever.default_k());
            let context = retriever
                .build_context(&query, k, &filter_for(module))
                .await;
            println!("{}", context);
        }
        Commands::Assume {
            requirement,
            module,
            provider,
            k,
            show_context,
        } => {
            if let Some(p) = provider {
                config.generation.provider = p.to_lowercase();
                config.validate()?;
            }
            let yaml = std::fs::read_to_string(&requirement)
                .with_context(|| format!("Failed to read {}", requirement.display()))?;
            let retriever = Retriever::from_config(&config)?;
            let generator = create_generator(&config.generation)?;
            let draft = draft_assumptions(
                &retriever,
                generator.as_ref(),
                &module,
                &yaml,
                k,
                config.generation.max_tokens,
            )
            .await?;
            if show_context {
                println!("query: {}", draft.query);
                println!();
                println!("{}", draft.context);
                println!();
            }
            println!("{}", draft.assumptions);
        }
        Commands::Config => print_config(&config)?,
    }

    Ok(())
}

fn filter_for(module: Option<String>) -> PayloadFilter {
    module
        .map(|m| module_filter(&m))
        .unwrap_or_default()
}

fn print_report(report: &IngestReport) {
    println!("chunks: {}", report.chunks);
    println!("upserted: {}", report.upserted);
}

fn print_hits(hits: &SearchHits) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    match hits {
        SearchHits::Local(hits) => {
            for (i, hit) in hits.iter().enumerate() {
                println!("{}. [{:.3}] {}", i + 1, hit.score, hit.path.display());
                let excerpt: String = hit.text.chars().take(160).collect();
                println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
            }
        }
        SearchHits::Remote(hits) => {
            for (i, hit) in hits.iter().enumerate() {
                let field = |key: &str| match hit.payload.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => "?".to_string(),
                };
                println!(
                    "{}. [{:.3}] {}#{}",
                    i + 1,
                    hit.score,
                    field("uri"),
                    field("chunk_index")
                );
                println!("    module: {}", field("module"));
                println!("    id: {}", hit.id);
            }
        }
    }
}

fn print_config(config: &Config) -> Result<()> {
    let text = toml::to_string_pretty(&config.redacted())?;
    print!("{}", text);
    Ok(())
}
