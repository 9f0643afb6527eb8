use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use analysis::{ReportEmitter, TextReport};
use index::{EmbeddingClient, QdrantRetriever};
use ingest::TextExtractor;
use llm::{LlmClassifier, LlmEvaluator, OllamaClient};
use model::Checkpoint;
use pipeline::{Collaborators, FsStageStore, Pipeline, PipelineConfig};

mod error;
mod output;

use error::CliError;

/// Measure how much of an analyst report is new relative to a company's
/// own documents.
#[derive(Parser, Debug)]
#[command(name = "infodelta", version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "infodelta.toml")]
    config: PathBuf,

    /// Resume from cached stage output instead of recomputing it
    #[arg(long)]
    checkpoint: Option<Checkpoint>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// `RUST_LOG` takes precedence over `--log-level`. Logs go to stderr.
fn init_tracing(level: LogLevel, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn build_collaborators(config: &PipelineConfig) -> anyhow::Result<Collaborators> {
    let timeout = Duration::from_secs(config.concurrency.request_timeout_secs);
    let llm = &config.llm;
    let kb = &config.knowledge_base;

    let classifier = LlmClassifier::new(
        OllamaClient::new(&llm.base_url, &llm.classification_model, timeout)?,
        llm.max_json_repairs,
    );
    let evaluator = LlmEvaluator::new(
        OllamaClient::new(&llm.base_url, &llm.evaluation_model, timeout)?,
        llm.max_json_repairs,
        llm.delta_analysis,
    );
    let retriever = QdrantRetriever::new(
        &kb.qdrant_url,
        &kb.collection,
        EmbeddingClient::new(&llm.base_url, &kb.embedding_model, timeout)?,
        kb.top_k,
        kb.score_threshold,
    );

    Ok(Collaborators {
        extractor: Arc::new(TextExtractor::new(config.extraction.filter_boilerplate)),
        classifier: Arc::new(classifier),
        retriever: Arc::new(retriever),
        evaluator: Arc::new(evaluator),
    })
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let config = PipelineConfig::load(&cli.config)?;
    config.validate()?;

    let collaborators = build_collaborators(&config)?;
    let store = Arc::new(FsStageStore::new(&config.cache.dir));
    let source = config.document.path.clone();
    let output_root = config.output.dir.clone();

    let pipeline = Pipeline::new(config, collaborators, store);
    let output = pipeline.run(&source, cli.checkpoint).await?;

    let report = TextReport;
    let dir = output::write_outputs(&output_root, &output, &report)?;
    info!(path = %dir.display(), "Outputs written");

    if output.summary.is_degraded() {
        warn!(
            classification = output.statistics.failures.classification,
            retrieval = output.statistics.failures.retrieval,
            evaluation = output.statistics.failures.evaluation,
            "Run completed with per-item failures"
        );
    }

    print!("{}", report.render(&output.statistics));
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level, cli.log_json);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(class = e.class(), exit_code = e.exit_code(), "Run aborted");
            eprintln!("infodelta: {}: {}", e.class(), e.report());
            ExitCode::from(e.exit_code())
        }
    }
}
