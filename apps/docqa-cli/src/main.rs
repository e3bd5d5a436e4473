use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docqa_core::config::{AppConfig, Config};
use docqa_core::loader::{collect_documents, TextLoader};
use docqa_core::types::IngestPolicy;
use docqa_embed::default_embedder;
use docqa_retrieval::{AnswerGenerator, ExtractiveGenerator, Persistence, RetrievalService, Retriever};
use docqa_vector::FlatIndex;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const SNIPPET_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions against a local document corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index documents (default: every .txt/.md file under data.documents_dir)
    Ingest {
        paths: Vec<PathBuf>,
        /// Clear the existing index before inserting
        #[arg(long)]
        replace: bool,
    },
    /// Retrieve the fragments most relevant to a question
    Query {
        question: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Show what is currently indexed
    Status,
    /// Clear the index and its snapshot
    Reset {
        /// Delete the snapshot directory instead of saving an empty index
        #[arg(long)]
        purge: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let app = config.app()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&app.logging.level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ingest { paths, replace } => {
            let policy = if replace { IngestPolicy::Replace } else { app.retrieval.ingest_policy };
            let service = open_service(&config, &app, policy).await?;
            ingest(&service, &config, &app, paths).await
        }
        Commands::Query { question, k } => {
            let service = open_service(&config, &app, app.retrieval.ingest_policy).await?;
            query(&service, question, k.unwrap_or(app.retrieval.top_k)).await
        }
        Commands::Status => {
            let service = open_service(&config, &app, app.retrieval.ingest_policy).await?;
            status(&service).await
        }
        Commands::Reset { purge } => {
            let service = open_service(&config, &app, app.retrieval.ingest_policy).await?;
            reset(&service, purge).await
        }
    }
}

async fn open_service(config: &Config, app: &AppConfig, policy: IngestPolicy) -> Result<RetrievalService> {
    let model_dir = app.embedding.model_dir.as_ref().map(|d| config.resolve_path(d));
    let embedder = default_embedder(&app.embedding, model_dir.as_deref())?;
    let snapshot_dir = config.resolve_path(&app.data.snapshot_dir);

    let retriever = Retriever::new(FlatIndex::new(app.embedding.dimension)?, embedder, Box::new(TextLoader::new()))?
        .with_chunking(app.chunking)?
        .with_policy(policy)
        .with_snapshot_dir(&snapshot_dir);
    let service = RetrievalService::new(retriever);

    let restored = service
        .restore()
        .await
        .with_context(|| format!("restoring index from {}", snapshot_dir.display()))?;
    debug!(restored, dir = %snapshot_dir.display(), "startup restore");
    Ok(service)
}

async fn ingest(service: &RetrievalService, config: &Config, app: &AppConfig, paths: Vec<PathBuf>) -> Result<()> {
    let paths = if paths.is_empty() {
        let dir = config.resolve_path(&app.data.documents_dir);
        let found = collect_documents(&dir);
        if found.is_empty() {
            bail!("no .txt or .md documents found under {}", dir.display());
        }
        println!("Ingesting {} documents from {}", found.len(), dir.display());
        found
    } else {
        paths
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Chunking and embedding {} documents...", paths.len()));
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = service.ingest(paths).await;
    pb.finish_and_clear();
    let report = result?;

    println!("✅ Indexed {} fragments from {} documents ({} total)", report.fragments_added, report.documents, report.total_count);
    match &report.persistence {
        Persistence::Saved(dir) => println!("💾 Snapshot saved to {}", dir.display()),
        Persistence::Disabled => {}
        Persistence::Failed(reason) => println!("⚠️  Index is in memory only; snapshot failed: {}", reason),
    }
    Ok(())
}

async fn query(service: &RetrievalService, question: String, k: usize) -> Result<()> {
    let hits = service.query(question.clone(), k).await?;
    println!("🔍 {} results for: \"{}\"", hits.len(), question);
    for (i, hit) in hits.iter().enumerate() {
        println!("\n  {}. score={:.4}  source={}  page={}", i + 1, hit.score, hit.fragment.source, hit.fragment.page);
        println!("     {}", snippet(&hit.fragment.text));
    }

    let answer = ExtractiveGenerator.generate(&question, &hits)?;
    println!("\n💡 Best match ({}):\n{}", answer.model, answer.answer);
    Ok(())
}

async fn status(service: &RetrievalService) -> Result<()> {
    let status = service.status().await?;
    let retriever = service.retriever();
    println!("Model:     {}", retriever.embedder().model_id());
    println!("Snapshot:  {}", retriever.snapshot_dir().map_or_else(|| "(disabled)".into(), |d| d.display().to_string()));
    println!("Built:     {}", status.built);
    println!("Fragments: {}", status.total_count);
    println!("Files ({}):", status.sources.len());
    for source in &status.sources {
        println!("  - {}", source);
    }
    Ok(())
}

async fn reset(service: &RetrievalService, purge: bool) -> Result<()> {
    let cleared = service.status().await?.total_count;
    service.reset().await?;
    println!("🧹 Cleared {} fragments from the index", cleared);

    let Some(dir) = service.retriever().snapshot_dir() else {
        return Ok(());
    };
    if purge {
        purge_snapshot(dir)?;
        println!("🗑️  Removed snapshot at {}", dir.display());
        return Ok(());
    }
    // Each run starts from the snapshot.
    match service.save_snapshot().await? {
        Persistence::Saved(dir) => println!("💾 Snapshot at {} now holds an empty index", dir.display()),
        Persistence::Disabled => {}
        Persistence::Failed(reason) => bail!("could not write empty snapshot to {}: {}", dir.display(), reason),
    }
    Ok(())
}

fn purge_snapshot(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    Ok(())
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}
