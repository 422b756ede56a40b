//! Pipeline statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::RunningStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Input lines read, blank lines included
    pub lines_read: usize,

    /// Lines that could not be parsed as a page
    pub skipped_lines: usize,

    /// Time spent inside each `submit` call (microseconds)
    pub submit_latency_us: RunningStats,

    /// Dispatcher counters at the end of the run
    pub metrics: MetricsSnapshot,

    /// Whether every worker had finished when the run returned
    pub terminated: bool,

    /// Whether shutdown was started without waiting
    pub detached: bool,

    /// Total duration of the run
    pub duration: Duration,
}

impl PipelineStats {
    /// Persisted pages per second
    pub fn pages_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.written as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Failed pages as a percentage of completed pages
    pub fn failure_rate(&self) -> f64 {
        let completed = self.metrics.completed();
        if completed > 0 {
            (self.metrics.failed as f64 / completed as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Pages submitted but not yet completed
    pub fn in_flight(&self) -> u64 {
        self.metrics
            .submitted
            .saturating_sub(self.metrics.rejected + self.metrics.completed())
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Persistence Statistics                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lines read: {}", self.lines_read);
        println!("   ├─ Lines skipped: {}", self.skipped_lines);
        println!("   └─ Pages/s: {:.2}", self.pages_per_sec());

        println!("\n📤 Dispatcher");
        println!("   ├─ Submitted: {}", self.metrics.submitted);
        println!("   ├─ Rejected: {}", self.metrics.rejected);
        println!("   ├─ Written: {}", self.metrics.written);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            self.metrics.failed,
            self.failure_rate()
        );
        println!("   ├─ Peak workers: {}", self.metrics.peak_active);
        println!("   └─ Submit latency (µs): {}", self.submit_latency_us);

        if self.detached && !self.terminated {
            println!(
                "\n⏳ Detached before workers finished: {} page(s) in flight, waiting for them",
                self.in_flight()
            );
        }

        println!();
    }
}
