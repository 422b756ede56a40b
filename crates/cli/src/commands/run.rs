//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineStats};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }
    if !args.input.exists() {
        return Err(CliError::input_not_found(args.input.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        sink = %blueprint.sink.name,
        sink_type = ?blueprint.sink.sink_type,
        core_workers = blueprint.pool.core_workers,
        max_workers = blueprint.pool.max_workers,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        input: args.input.clone(),
        detach: args.detach,
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    });

    info!(input = %args.input.display(), detach = args.detach, "Starting pipeline...");

    let run = pipeline
        .run_until(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    report(&run.stats);

    if !run.stats.terminated {
        info!(
            in_flight = run.stats.in_flight(),
            "Waiting for in-flight pages before exiting"
        );
        let drained = run.drain().await;
        info!(
            written = drained.written,
            failed = drained.failed,
            "All submitted pages completed"
        );
    }

    info!("Page Persist finished");
    Ok(())
}

fn report(stats: &PipelineStats) {
    info!(
        submitted = stats.metrics.submitted,
        written = stats.metrics.written,
        failed = stats.metrics.failed,
        rejected = stats.metrics.rejected,
        duration_secs = stats.duration.as_secs_f64(),
        pages_per_sec = format!("{:.2}", stats.pages_per_sec()),
        "Pipeline completed"
    );
    stats.print_summary();
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed the signal is never delivered and the
/// run continues until the input is exhausted.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::PersistenceBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Pool:");
    println!("  Core workers: {}", blueprint.pool.core_workers);
    println!("  Max workers: {}", blueprint.pool.max_workers);
    println!("  Keep alive: {} ms", blueprint.pool.keep_alive_ms);
    println!("\nSink:");
    println!(
        "  - {} ({:?})",
        blueprint.sink.name, blueprint.sink.sink_type
    );
    println!();
}
