//! # Paper chat CLI (`papers`)
//!
//! Builds the paper corpus, indexes it, and answers questions over it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `papers build-corpus` | Build `papers.json` from the content lists |
//! | `papers index` | Embed the corpus into the vector index |
//! | `papers ask "<question>"` | Answer one question |
//! | `papers chat` | Interactive question loop with turn history |
//! | `papers stats` | Corpus and index statistics |
//!
//! ## Examples
//!
//! ```bash
//! papers build-corpus --papers-dir ./papers
//! papers index --skip-existing
//! papers ask "What optimizer does the transformer paper use?" --top-k 8
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use paper_rag::config::{self, Config};
use paper_rag::corpus::{self, BuildOptions};
use paper_rag::index_cmd::{self, IndexOptions};
use paper_rag::rag::PaperChat;
use paper_rag::stats;

/// Paper chat: retrieval-augmented question answering over a collection
/// of academic papers.
///
/// Every option has a default. Settings are read from the `--config` TOML
/// file when it exists, then from environment variables (and `.env`).
#[derive(Parser)]
#[command(name = "papers", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Optional.
    #[arg(long, global = true, default_value = "./config/papers.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the combined corpus JSON from per-paper content lists.
    BuildCorpus {
        /// Root directory containing one folder per paper.
        #[arg(long)]
        papers_dir: Option<PathBuf>,

        /// Output corpus path.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Minimum chunk length in characters.
        #[arg(long)]
        min_chars: Option<usize>,

        /// Process at most this many content lists (after sorting).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Embed the corpus and upsert it into the vector index.
    Index {
        /// Corpus path to read.
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Index collection name.
        #[arg(long)]
        collection: Option<String>,

        /// Texts per embedding request.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Pause between batches, in milliseconds.
        #[arg(long)]
        sleep_ms: Option<u64>,

        /// Delete the collection before indexing.
        #[arg(long)]
        reset: bool,

        /// Skip chunks already indexed with identical text.
        #[arg(long)]
        skip_existing: bool,

        /// Index at most this many chunks.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Answer a single question.
    Ask {
        question: String,

        /// Number of chunks to retrieve.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Ask questions interactively; earlier turns are sent as history.
    Chat {
        /// Number of chunks to retrieve per question.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show corpus and index statistics.
    Stats {
        /// Corpus path to read.
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::BuildCorpus {
            papers_dir,
            output,
            min_chars,
            limit,
        } => {
            let mut opts = BuildOptions::from_config(&cfg);
            if let Some(dir) = papers_dir {
                opts.papers_dir = dir;
            }
            if let Some(min) = min_chars {
                opts.min_chars = min;
            }
            opts.limit = limit;
            let output = output.unwrap_or_else(|| cfg.paths.corpus_path());
            corpus::run_build_corpus(&opts, &output)?;
        }
        Commands::Index {
            corpus,
            collection,
            batch_size,
            sleep_ms,
            reset,
            skip_existing,
            limit,
        } => {
            if let Some(name) = collection {
                cfg.index.collection = name;
            }
            let mut opts = IndexOptions::from_config(&cfg);
            if let Some(size) = batch_size {
                opts.batch_size = size;
            }
            opts.reset = reset;
            opts.skip_existing = skip_existing;
            opts.limit = limit;
            opts.pause = sleep_ms.filter(|ms| *ms > 0).map(Duration::from_millis);
            let corpus_path = corpus.unwrap_or_else(|| cfg.paths.corpus_path());
            index_cmd::run_index(&cfg, &corpus_path, &opts).await?;
        }
        Commands::Ask { question, top_k } => {
            let rag = PaperChat::from_config(&cfg).await?;
            let answer = rag.answer(&question, &[], top_k).await?;
            println!("{}", answer.answer);
            println!();
            println!("Sources:");
            println!("{}", answer.sources);
        }
        Commands::Chat { top_k } => {
            run_chat(&cfg, top_k).await?;
        }
        Commands::Stats { corpus } => {
            let corpus_path = corpus.unwrap_or_else(|| cfg.paths.corpus_path());
            stats::run_stats(&cfg, &corpus_path).await?;
        }
    }

    Ok(())
}

/// Line-oriented chat loop. An empty line or EOF ends the session; a
/// failed turn is reported and not added to the history.
async fn run_chat(cfg: &Config, top_k: Option<usize>) -> Result<()> {
    let rag = PaperChat::from_config(cfg).await?;
    let mut history: Vec<(String, String)> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let question = match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => line.trim().to_string(),
            _ => break,
        };

        match rag.answer(&question, &history, top_k).await {
            Ok(answer) => {
                println!("{}", answer.answer);
                println!();
                println!("Sources:");
                println!("{}", answer.sources);
                println!();
                history.push((question, answer.answer));
            }
            Err(e) => {
                eprintln!("Error: {:#}", e);
            }
        }
    }

    Ok(())
}
