use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use kba_core::{Embedder, QueryResult};
use kba_ollama::{OllamaClient, OllamaConfig, OllamaEmbedder};
use kba_rag::{
    DirectoryDocumentSource, EmbedderKind, HashEmbedder, HealthStatus, LocalVectorStore,
    PipelineConfig, RagPipeline,
};

type Pipeline = RagPipeline<LocalVectorStore, OllamaClient, DirectoryDocumentSource>;

#[derive(Parser)]
#[command(name = "kba")]
#[command(about = "Answer questions from your own documents with a local LLM", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index documents from a directory (defaults to KBA_KNOWLEDGE_BASE_DIR)
    Ingest { dir: Option<PathBuf> },
    /// Ask a question
    Query {
        question: String,
        /// Passages to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove everything from the knowledge base
    Clear,
    /// Show pipeline statistics
    Stats,
    /// Check the LLM backend and the vector store
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = build_pipeline().await?;
    tracing::debug!(command = ?cli.command, "Running command");

    match cli.command {
        Commands::Ingest { dir } => {
            let shown = dir.as_deref().unwrap_or(pipeline.config().knowledge_base_dir.as_path());
            println!("{} Ingesting documents from {}", "📚".blue(), shown.display());

            let ingested = match &dir {
                Some(dir) => pipeline.ingest(dir).await,
                None => pipeline.ingest_default().await,
            };

            if ingested {
                let stats = pipeline.stats().await;
                println!(
                    "{} Ingestion complete, {} chunks indexed",
                    "✅".green(),
                    format_count(stats.vector_db_count)
                );
            } else {
                println!("{} No documents were ingested (see log for details)", "⚠️".yellow());
                std::process::exit(1);
            }
        }
        Commands::Query { question, top_k, json } => {
            let result = match top_k {
                Some(top_k) => pipeline.query(&question, top_k).await,
                None => pipeline.query_with_defaults(&question).await,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Commands::Clear => {
            pipeline.clear_knowledge().await?;
            println!("{} Knowledge base cleared", "🗑️".green());
        }
        Commands::Stats => {
            let stats = pipeline.stats().await;
            println!("{}", "Pipeline statistics:".bold());
            println!("  {} {}", "Indexed chunks:".cyan(), format_count(stats.vector_db_count));
            println!("  {} {}", "Knowledge base:".cyan(), stats.knowledge_base_path.display());
            println!("  {} {}", "Mode:".cyan(), stats.mode);
            println!("  {} {}", "Model:".cyan(), stats.model);
        }
        Commands::Health => {
            let report = pipeline.health_check().await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            match report.status {
                HealthStatus::Healthy => println!("{} System healthy", "✅".green()),
                HealthStatus::Degraded => println!("{} System degraded", "⚠️".yellow()),
                HealthStatus::Unhealthy => {
                    println!("{} System unhealthy", "❌".red());
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn build_pipeline() -> Result<Pipeline> {
    let ollama_config = OllamaConfig::from_env().context("Invalid Ollama configuration")?;
    let config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;

    let embedder: Arc<dyn Embedder> = match config.embedder {
        EmbedderKind::Ollama => Arc::new(OllamaEmbedder::new(ollama_config.clone())?),
        EmbedderKind::Hash => Arc::new(HashEmbedder::default()),
    };

    let store = LocalVectorStore::open(embedder, &config.vector_db_path)
        .await
        .with_context(|| format!("Failed to open vector store at {}", config.vector_db_path.display()))?;
    let backend = OllamaClient::new(ollama_config)?;
    let source = DirectoryDocumentSource::new(config.max_file_size);

    Ok(RagPipeline::new(config, Arc::new(store), Arc::new(backend), source)?)
}

fn format_count(count: Option<usize>) -> String {
    count.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

fn print_result(result: &QueryResult) {
    println!("{} {}", "🤖".blue(), result.answer);
    println!();

    if result.sources.is_empty() {
        println!("{} {}", "📚 Sources:".cyan(), "none (general knowledge)".dimmed());
    } else {
        let sources: Vec<&str> = result.sources.iter().map(String::as_str).collect();
        println!("{} {}", "📚 Sources:".cyan(), sources.join(", "));
    }

    println!("{} {}", "🎯 Context used:".cyan(), result.context_used);
    println!("{} {:.2}", "💪 Confidence:".cyan(), result.confidence);
    println!("{} {:.2}s", "⏱️  Response time:".cyan(), result.response_time);

    if let Some(error) = &result.error {
        println!("{} {}", "❌ Error:".red(), error);
    }
}
