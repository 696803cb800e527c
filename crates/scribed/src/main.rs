//! Scribe - instructional gap analysis for student writing.
//!
//! Runs the full pipeline against configured retrieval and model backends
//! and prints the ranked gaps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scribe_common::types::Stage;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scribed::config::CoachConfig;
use scribed::llm::HttpTextGenerator;
use scribed::pipeline::GapPipeline;
use scribed::retrieval::HttpStandardsRetriever;
use scribed::web_search::HttpWebSearcher;

#[derive(Parser)]
#[command(name = "scribed")]
#[command(about = "Instructional gap analysis for student writing", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a piece of student writing for skill gaps
    Analyze {
        /// File with the student's writing (stdin if omitted)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Student grade level (K, 1, 2, ...)
        #[arg(long)]
        grade: String,

        /// Writing stage: prewriting, drafting, revising, editing, publishing
        #[arg(long)]
        stage: String,

        /// Session identifier for per-learner serialization
        #[arg(long, default_value = "local")]
        session: String,
    },

    /// Print the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = CoachConfig::load();

    match cli.command {
        Commands::Analyze {
            file,
            grade,
            stage,
            session,
        } => analyze(config, file, &grade, &stage, &session).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config)?;
            println!("# {}", CoachConfig::config_path().display());
            print!("{rendered}");
            Ok(())
        }
    }
}

async fn analyze(
    config: CoachConfig,
    file: Option<PathBuf>,
    grade: &str,
    stage: &str,
    session: &str,
) -> Result<()> {
    let stage = Stage::parse(stage)
        .with_context(|| format!("unknown writing stage '{stage}'"))?;

    let student_text = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let generator = HttpTextGenerator::new(config.llm.to_llm_config())
        .context("failed to build LLM client")?;
    let retriever = HttpStandardsRetriever::new(config.retrieval)?;
    let web = HttpWebSearcher::new(config.web_search)?;

    let pipeline = GapPipeline::new(
        Arc::new(generator),
        Arc::new(retriever),
        Arc::new(web),
        config.pipeline,
    );

    let result = pipeline
        .compute_for_session(session, &student_text, grade, stage, None)
        .await;
    pipeline.end_session(session);
    let (gaps, standards) = result?;

    if let Some(sentinel) = gaps.iter().find(|g| g.is_sentinel()) {
        println!(
            "Insufficient context: {}",
            sentinel.evidence.as_deref().unwrap_or("no usable standards found")
        );
        return Ok(());
    }

    info!(gap_count = gaps.len(), "analysis finished");

    if gaps.is_empty() {
        println!("No instructional gaps found.");
        return Ok(());
    }

    println!("Instructional gaps ({} standards referenced):", standards.len());
    for (i, gap) in gaps.iter().enumerate() {
        println!(
            "{}. [{:?}] {} - {}",
            i + 1,
            gap.severity,
            gap.skill_domain,
            gap.description
        );
        if let Some(evidence) = &gap.evidence {
            println!("   Evidence: {evidence}");
        }
        if let Some(reference) = &gap.sol_reference {
            println!("   Standard: {reference}");
        }
    }

    Ok(())
}
