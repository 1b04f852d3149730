//! docvault command line.
//!
//! The archive lives in memory; between invocations it is kept in the JSON
//! snapshot at `data.snapshot_path`. Commands that change the archive save the
//! snapshot again before exiting.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docvault_core::config::{resolve_with_base, Config};
use docvault_core::{Error, ErrorKind};
use docvault_engine::{Archive, BatchItem};

mod rpc;

const EXIT_NOT_FOUND: u8 = 2;
const EXIT_USAGE: u8 = 64;

#[derive(Parser)]
#[command(name = "docvault")]
#[command(about = "Semantic document archive with similarity search")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml / config.<env>.toml
    #[arg(short, long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Snapshot file (overrides data.snapshot_path)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every accepted file under a directory (default: data.docs_dir)
    Ingest {
        dir: Option<PathBuf>,
        /// Documents per processing batch
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
    },
    /// Semantic search
    Search {
        query: String,
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// List archived documents in ingestion order
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print a full document
    Show { id: String },
    /// Print a document summary
    Summarize { id: String },
    /// Remove a document
    Delete { id: String },
    /// Serve line-delimited JSON-RPC on stdin/stdout
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(EXIT_USAGE) } else { ExitCode::SUCCESS };
        }
    };
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `NotFound` → 2, caller misuse → 64, anything else → 1.
fn exit_code(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<Error>() {
        Some(err) if err.kind() == ErrorKind::NotFound => EXIT_NOT_FOUND,
        Some(err) if err.is_caller_error() => EXIT_USAGE,
        _ => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_in(&cli.config_dir)?;
    let settings = config.settings()?;
    info!(env = config.env_name(), "configuration loaded");

    let snapshot_path = cli
        .snapshot
        .clone()
        .unwrap_or_else(|| resolve_with_base(&cli.config_dir, &settings.data.snapshot_path));
    let archive = Archive::from_settings(&settings)?;
    if snapshot_path.exists() {
        archive
            .load_snapshot(&snapshot_path)
            .await
            .with_context(|| format!("loading {}", snapshot_path.display()))?;
    }

    match cli.command {
        Commands::Ingest { dir, batch_size } => {
            let dir = dir.unwrap_or_else(|| resolve_with_base(&cli.config_dir, &settings.data.docs_dir));
            ingest(&archive, &dir, batch_size.max(1)).await?;
            save(&archive, &snapshot_path).await?;
        }
        Commands::Search { query, top_k, json } => {
            let top_k = top_k.unwrap_or(settings.search.default_top_k);
            let results = archive.search(&query, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("🔍 Found {} results for: \"{}\"", results.len(), query);
                for r in &results {
                    println!("\n  {}. score={:.4}  id={}  file={}", r.rank + 1, r.score, r.id, r.filename);
                    println!("     📝 {}", r.summary);
                }
            }
        }
        Commands::List { json } => {
            let docs = archive.list_documents().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&docs)?);
            } else {
                for d in &docs {
                    println!("{}\t{} words\t{}", d.id, d.word_count, d.ingested_at.to_rfc3339());
                }
                println!("📊 {} documents", docs.len());
            }
        }
        Commands::Show { id } => {
            let doc = archive.get_document(&id).await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Summarize { id } => {
            let digest = archive.summarize_document(&id).await?;
            println!("{} ({} words)\n{}", digest.filename, digest.word_count, digest.summary);
        }
        Commands::Delete { id } => {
            archive.delete_document(&id).await?;
            save(&archive, &snapshot_path).await?;
            println!("🗑️  Deleted {id}");
        }
        Commands::Serve => rpc::serve(&archive).await?,
    }
    Ok(())
}

async fn ingest(archive: &Archive, dir: &Path, batch_size: usize) -> Result<()> {
    let sources = archive.loader().load_dir(dir)?;
    if sources.is_empty() {
        println!("No matching files found under {}.", dir.display());
        return Ok(());
    }
    println!("Ingesting {} files from {}", sources.len(), dir.display());

    let pb = ProgressBar::new(sources.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let mut indexed = 0usize;
    let mut failed = Vec::new();
    for batch in sources.chunks(batch_size) {
        let items = archive.process_batch(batch.to_vec()).await;
        pb.inc(items.len() as u64);
        for item in items {
            match item {
                BatchItem::Indexed(_) => indexed += 1,
                BatchItem::Failed(f) => failed.push(f),
            }
        }
        pb.set_message(format!("{} failed", failed.len()));
    }
    pb.finish_with_message("✅ ingest completed");

    for f in &failed {
        warn!(document.id = %f.id, kind = ?f.kind, stage = ?f.stage, "{}", f.message);
    }
    println!("📊 Indexed {} documents, {} failed", indexed, failed.len());
    Ok(())
}

async fn save(archive: &Archive, path: &Path) -> Result<()> {
    let count = archive.save_snapshot(path).await?;
    info!(path = %path.display(), documents = count, "archive saved");
    Ok(())
}
