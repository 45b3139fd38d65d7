use clap::{Parser, Subcommand};
use std::path::PathBuf;
use support_kb::Result;
use support_kb::commands::{ask, ingest_path, show_status, upload};
use support_kb::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "support-kb")]
#[command(about = "A local knowledge base that answers questions from your documents with citations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index a file or every supported file under a directory
    Ingest {
        /// File or directory to ingest
        path: PathBuf,
    },
    /// Copy files into the uploads directory and index them
    Upload {
        /// Files to upload (.txt, .md or .pdf)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a question and stream a cited answer
    Ask {
        /// The question
        query: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        k: Option<usize>,
        /// Print one JSON event per line
        #[arg(long)]
        json: bool,
        /// Print the whole answer as a single JSON object
        #[arg(long, conflicts_with = "json")]
        collect: bool,
    },
    /// Show configuration paths, provider health and index size
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { path } => {
            ingest_path(&path).await?;
        }
        Commands::Upload { files } => {
            upload(&files).await?;
        }
        Commands::Ask {
            query,
            k,
            json,
            collect,
        } => {
            ask(&query, k, json, collect).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
