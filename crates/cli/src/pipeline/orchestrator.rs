//! Pipeline orchestrator - feeds pages from a JSON-lines file into the
//! dispatcher and shuts it down once the input is exhausted.

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{PageRecord, PersistenceBlueprint};
use dispatcher::{create_dispatcher, Dispatcher, MetricsSnapshot};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The persistence configuration
    pub blueprint: PersistenceBlueprint,

    /// JSON-lines input, one page per line
    pub input: PathBuf,

    /// Use `exit_async` instead of waiting for workers
    pub detach: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the input is exhausted
    #[cfg(test)]
    pub async fn run(self) -> Result<PipelineRun> {
        self.run_until(std::future::pending()).await
    }

    /// Run the pipeline, stopping early when `shutdown` resolves
    ///
    /// An early stop only ends reading; pages already submitted still go
    /// through the regular shutdown. A detached run returns while pages may
    /// still be in flight; call [`PipelineRun::drain`] before the runtime
    /// goes away.
    pub async fn run_until<F>(self, shutdown: F) -> Result<PipelineRun>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let dispatcher = create_dispatcher(&self.config.blueprint)
            .await
            .context("Failed to create dispatcher")?;

        info!(
            sink = dispatcher.sink_name(),
            core_workers = self.config.blueprint.pool.core_workers,
            max_workers = self.config.blueprint.pool.max_workers,
            "Dispatcher ready"
        );

        let mut stats = PipelineStats {
            detached: self.config.detach,
            ..PipelineStats::default()
        };

        let stopped_early = tokio::select! {
            result = self.feed(&dispatcher, &mut stats) => {
                result?;
                false
            }
            _ = shutdown => true,
        };
        if stopped_early {
            warn!(
                lines_read = stats.lines_read,
                "Shutdown requested, no more pages will be read"
            );
        }

        if self.config.detach {
            dispatcher.exit_async();
        } else {
            dispatcher.exit().await;
        }

        stats.metrics = dispatcher.metrics();
        stats.terminated = dispatcher.is_terminated();
        stats.duration = start_time.elapsed();
        Ok(PipelineRun { stats, dispatcher })
    }

    async fn feed(&self, dispatcher: &Dispatcher, stats: &mut PipelineStats) -> Result<()> {
        let path = &self.config.input;
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open input {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        while let Some(line) = lines.next_line().await.map_err(CliError::from)? {
            stats.lines_read += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let page = match parse_page(line) {
                Ok(page) => page,
                Err(e) => {
                    let err = CliError::invalid_page(
                        path.display().to_string(),
                        stats.lines_read,
                        e.to_string(),
                    );
                    warn!(error = %err, "Skipping line");
                    stats.skipped_lines += 1;
                    continue;
                }
            };

            let submit_start = Instant::now();
            if let Err(e) = dispatcher.submit(page) {
                warn!(error = %e, "Page not accepted");
            }
            stats
                .submit_latency_us
                .push(submit_start.elapsed().as_secs_f64() * 1_000_000.0);
        }

        Ok(())
    }
}

/// Outcome of a pipeline run
pub struct PipelineRun {
    /// Statistics taken when the run returned
    pub stats: PipelineStats,
    dispatcher: Dispatcher,
}

impl PipelineRun {
    /// Wait until every submitted page has completed
    ///
    /// Returns at once for a run that already waited for its workers.
    pub async fn drain(&self) -> MetricsSnapshot {
        self.dispatcher.exit().await;
        self.dispatcher.metrics()
    }
}

/// Parse one input line into a page
pub fn parse_page(line: &str) -> serde_json::Result<PageRecord> {
    serde_json::from_str(line)
}
