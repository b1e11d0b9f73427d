mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vizgen::{
    config::{Config, DatasetHandle, RunConfig},
    handlers::goals::load_goals,
    llm::LlmClient,
    pipeline::{Collaborators, Pipeline},
    printer::{MarkdownPrinter, TextPrinter},
    stats::{ver_summaries, RunStatistics},
};

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "vizgen=warn",
        1 => "vizgen=info",
        _ => "vizgen=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.verbose);

    // Load config
    let cfg = Config::load();

    let dataset = DatasetHandle {
        path: args.dataset.clone(),
        delimiter: args.delimiter,
        encoding: args.encoding.clone(),
    };
    let mut run = RunConfig::from_config(&cfg, dataset);
    run.programming_language = args.programming_language;
    run.refactor = args.refactor;
    if let Some(language) = args.language {
        run.language = language;
    }
    if let Some(dir) = args.output.clone() {
        run.output_dir = dir;
    }
    if let Some(dir) = args.statistics_dir.clone() {
        run.statistics_dir = dir;
    }
    if let Some(max) = args.max_attempts {
        run.max_regeneration_attempts = max;
    }
    if let Some(secs) = args.execution_timeout {
        run.execution_timeout = std::time::Duration::from_secs(secs);
    }
    let run = Arc::new(run);

    let goals = match &args.goals {
        Some(path) => Some(load_goals(path)?),
        None => None,
    };

    let client = Arc::new(LlmClient::from_config(&cfg).context("failed to build LLM client")?);
    let parts = Collaborators::from_llm(client.clone(), &cfg, run.clone());
    let pipeline = Pipeline::new(run.clone(), parts).with_goal_count(args.goal_count);

    let report = pipeline.run(goals).await?;

    let stats = RunStatistics {
        dataset: run.dataset.path.clone(),
        programming_language: run.programming_language,
        finished: chrono::Local::now(),
        total_duration: report.total_duration,
        stages: report.stages,
        llm_calls: client.usage(),
        ver: ver_summaries(&report.units),
        evaluations: report.evaluations,
        decisions: report.decisions,
        outcome: report.outcome,
        units: report.units.len(),
    };
    let path = stats
        .write(&run.statistics_dir)
        .with_context(|| format!("failed to write statistics to {}", run.statistics_dir.display()))?;

    if args.md {
        MarkdownPrinter::default().print(&stats.render_markdown());
    }
    TextPrinter::default().success(&format!("Statistics written to {}", path.display()));
    Ok(())
}
