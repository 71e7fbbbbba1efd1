use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use insight_engine::config::EngineConfig;
use insight_engine::engine::Engine;
use insight_engine::sched::Scheduler;
use insight_engine::source::SyntheticSource;
use insight_engine::types::{AnalysisRequest, TimeRange};

#[derive(Parser, Debug)]
#[command(name = "insightd", about = "Statistical insight analysis engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/insight-engine/config.toml")]
    config: String,

    /// Validate config and exit
    #[arg(long)]
    check: bool,

    /// Print version and exit
    #[arg(short, long)]
    version: bool,

    /// Analyze one data source over the last day, print a summary, exit
    #[arg(long, value_name = "DATA_SOURCE")]
    once: Option<String>,
}

#[tokio::main(worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("insightd {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration; a missing file means defaults
    let config = if std::path::Path::new(&cli.config).exists() {
        EngineConfig::load(&cli.config)?
    } else {
        EngineConfig::default()
    };

    if cli.check {
        println!("Configuration is valid.");
        return Ok(());
    }

    // Initialize logging
    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.engine.data_dir,
        "Starting insight engine"
    );

    if let Err(e) = run(config, cli.once).await {
        error!(error = %e, "Engine terminated with error");
        return Err(e);
    }

    Ok(())
}

fn init_logging(config: &EngineConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(&config.engine.log_level)
        });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

async fn run(config: EngineConfig, once: Option<String>) -> Result<()> {
    let engine = Arc::new(Engine::new(&config, Box::new(SyntheticSource::new())));

    if let Some(data_source) = once {
        let end = Utc::now();
        let request = AnalysisRequest {
            data_source,
            time_range: TimeRange {
                start: end - chrono::Duration::hours(24),
                end,
            },
            analysis_kinds: Vec::new(),
            correlate_with: None,
        };

        let result = engine.analyze_data(&request).await?;
        println!(
            "Analyzed {} samples in {}ms, {} insight(s)",
            result.samples_analyzed,
            result.duration_ms,
            result.insights.len()
        );
        for insight in &result.insights {
            println!(
                "  [{}] {} ({}, confidence {}%)",
                insight.severity, insight.title, insight.kind, insight.confidence
            );
        }
        return Ok(());
    }

    // Scheduled mode: run until interrupted
    let (scheduler, shutdown) = Scheduler::new(
        engine.clone(),
        config.engine.data_sources.clone(),
    );
    let handle = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, exiting");
    shutdown.send(true).ok();
    handle.await?;

    Ok(())
}
