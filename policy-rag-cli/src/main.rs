//! `policyqa`: ask questions of an indexed policy corpus and evaluate retrieval quality.

mod corpus;
mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use policy_rag::{
    InMemoryVectorStore, OpenAICompatibleChat, OpenAIEmbeddingProvider, QueryOptions, RagConfig,
    RagPipeline, VectorIndexGateway,
};
use policy_rag_eval::{
    Evaluator, parse_probes, parse_test_set, render_probe_summary, render_report,
    sample_test_cases,
};
use serde::Serialize;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "policyqa", version, about = "Grounded Q&A over credit underwriting policies")]
struct Cli {
    /// Pre-chunked corpus: a JSON array of {id, text, metadata}
    #[arg(long, global = true, default_value = "corpus.json")]
    corpus: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer one question and print the response as JSON
    Ask {
        question: String,

        /// Number of chunks to keep after retrieval
        #[arg(long)]
        top_k: Option<usize>,

        /// Skip heuristic reranking
        #[arg(long)]
        no_rerank: bool,

        /// Score the answer with an LLM validation pass
        #[arg(long)]
        validate: bool,
    },
    /// Run a labeled test set and print the report
    Eval {
        /// Test set JSON; the built-in sample set is used when omitted
        #[arg(long)]
        test_set: Option<PathBuf>,

        /// Cases evaluated concurrently
        #[arg(long, default_value_t = 1)]
        concurrency: usize,

        /// Skip the LLM relevancy judge
        #[arg(long)]
        no_relevancy: bool,

        /// Write the full run as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run unlabeled probe questions and print the summary
    Probe {
        #[arg(long)]
        probes: PathBuf,

        /// Write per-probe results as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs);

    let pipeline = Arc::new(build_pipeline(&cli.corpus).await?);

    match cli.command {
        Command::Ask { question, top_k, no_rerank, validate } => {
            let mut options = QueryOptions::default()
                .with_reranking(!no_rerank)
                .with_validation(validate);
            if let Some(k) = top_k {
                options = options.with_top_k(k);
            }
            let response = pipeline.query(&question, &options).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Eval { test_set, concurrency, no_relevancy, output } => {
            let (name, cases) = match &test_set {
                Some(path) => (set_name(path), parse_test_set(&read(path)?)?),
                None => ("sample".to_string(), sample_test_cases()),
            };

            let mut evaluator = Evaluator::new(pipeline).with_concurrency(concurrency);
            if no_relevancy {
                evaluator = evaluator.without_relevancy();
            }
            let run = evaluator.run(&name, &cases).await;
            println!("{}", render_report(&run));
            if let Some(path) = output {
                write_json(&path, &run)?;
            }
        }
        Command::Probe { probes, output } => {
            let probes = parse_probes(&read(&probes)?)?;
            let evaluation = Evaluator::new(pipeline).evaluate_unlabeled_probes(&probes).await;
            println!("{}", render_probe_summary(&evaluation));
            if let Some(path) = output {
                write_json(&path, &evaluation)?;
            }
        }
    }
    Ok(())
}

async fn build_pipeline(corpus_path: &Path) -> Result<RagPipeline> {
    let config = RagConfig::from_env()?;
    let chunks = corpus::load_corpus(corpus_path)?;

    let mut embedder = OpenAIEmbeddingProvider::from_env()?;
    if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
        embedder = embedder.with_model(model);
    }
    let gateway = VectorIndexGateway::new(Arc::new(embedder), Arc::new(InMemoryVectorStore::new()));
    let indexed = gateway.index(&chunks).await?;
    info!(corpus = %corpus_path.display(), chunks = indexed, "corpus indexed");

    let chat = OpenAICompatibleChat::from_env()?.with_model(config.model.clone());
    let pipeline = RagPipeline::builder()
        .config(config)
        .search_gateway(Arc::new(gateway))
        .completion_service(Arc::new(chat))
        .build()?;
    Ok(pipeline)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn set_name(path: &Path) -> String {
    path.file_stem().map_or_else(|| "test_set".to_string(), |s| s.to_string_lossy().into_owned())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "results written");
    Ok(())
}
