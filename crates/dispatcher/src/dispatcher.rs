//! Dispatcher - accepts pages and hands them to the worker pool

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{PageRecord, PersistenceBlueprint, PoolConfig, RemoteSink, SinkConfig, SinkType};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::pool::{Job, PageFuture, WorkerPool};
use crate::sinks::{HttpSink, LogSink};
use crate::submitter::Submitter;

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    pool: PoolConfig,
    runtime: Option<Handle>,
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new(pool: PoolConfig) -> Self {
        Self {
            pool,
            runtime: None,
        }
    }

    /// Run workers on the given runtime instead of the current one
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the dispatcher around `sink`
    ///
    /// No worker is started until the first submission.
    #[instrument(name = "dispatcher_builder_build", skip(self, sink), fields(sink = %sink.name()))]
    pub fn build<S>(self, sink: S) -> Result<Dispatcher, DispatcherError>
    where
        S: RemoteSink + Sync + 'static,
    {
        Self::check_pool(&self.pool)?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| DispatcherError::NoRuntime)?,
        };

        let sink_name = sink.name().to_string();
        let metrics = Arc::new(DispatcherMetrics::new());
        let job = Self::job_for(Submitter::new(Arc::new(sink)), Arc::clone(&metrics));

        let (tx, rx) = mpsc::unbounded_channel();
        let pool = WorkerPool::new(self.pool, rx, job, runtime, Arc::clone(&metrics));

        info!(
            sink = %sink_name,
            core_workers = pool.config().core_workers,
            max_workers = pool.config().max_workers,
            keep_alive_ms = pool.config().keep_alive_ms,
            "Dispatcher created"
        );

        Ok(Dispatcher {
            inner: Arc::new(Inner {
                sink_name,
                backlog: Mutex::new(Some(tx)),
                shutting_down: AtomicBool::new(false),
                metrics,
                pool,
            }),
        })
    }

    fn check_pool(pool: &PoolConfig) -> Result<(), DispatcherError> {
        if pool.core_workers == 0 {
            return Err(DispatcherError::invalid_pool("core_workers must be >= 1"));
        }
        if pool.max_workers < pool.core_workers {
            return Err(DispatcherError::invalid_pool(format!(
                "max_workers ({}) must be >= core_workers ({})",
                pool.max_workers, pool.core_workers
            )));
        }
        Ok(())
    }

    fn job_for<S>(submitter: Submitter<S>, metrics: Arc<DispatcherMetrics>) -> Job
    where
        S: RemoteSink + Sync + 'static,
    {
        Arc::new(move |page: PageRecord| -> PageFuture {
            let submitter = submitter.clone();
            let metrics = Arc::clone(&metrics);
            Box::pin(async move { submitter.run(page, &metrics).await })
        })
    }
}

struct Inner {
    sink_name: String,
    /// `None` once shutdown began
    backlog: Mutex<Option<mpsc::UnboundedSender<PageRecord>>>,
    shutting_down: AtomicBool,
    metrics: Arc<DispatcherMetrics>,
    pool: Arc<WorkerPool>,
}

/// Handle to the page persistence pipeline
///
/// Cheap to clone; every clone drives the same pool. `submit`, `count` and
/// `exit_async` never block.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sink", &self.inner.sink_name)
            .field("submitted", &self.count())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

impl Dispatcher {
    /// Build a dispatcher with the given pool settings on the current runtime
    pub fn spawn<S>(sink: S, pool: PoolConfig) -> Result<Self, DispatcherError>
    where
        S: RemoteSink + Sync + 'static,
    {
        DispatcherBuilder::new(pool).build(sink)
    }

    /// Name of the sink pages are persisted to
    pub fn sink_name(&self) -> &str {
        &self.inner.sink_name
    }

    /// Number of `submit` calls so far
    ///
    /// Monotonic; counts rejected late submissions as well.
    pub fn count(&self) -> u64 {
        self.inner.metrics.submitted()
    }

    /// Queue a page for persistence
    ///
    /// Returns as soon as the page is queued. The outcome of the remote
    /// write is only ever logged.
    ///
    /// # Errors
    /// [`DispatcherError::ShuttingDown`] once [`exit_async`](Self::exit_async)
    /// has been called; the page is dropped.
    pub fn submit(&self, page: PageRecord) -> Result<(), DispatcherError> {
        self.inner.metrics.inc_submitted();
        observability::record_page_submitted();

        let backlog = self
            .inner
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(tx) = backlog.as_ref() else {
            return Err(self.reject(page));
        };

        self.inner.pool.page_enqueued();
        if let Err(mpsc::error::SendError(page)) = tx.send(page) {
            self.inner.pool.page_not_enqueued();
            return Err(self.reject(page));
        }
        self.inner.pool.ensure_worker();

        Ok(())
    }

    fn reject(&self, page: PageRecord) -> DispatcherError {
        self.inner.metrics.inc_rejected();
        observability::record_page_rejected();
        warn!(
            sink = %self.inner.sink_name,
            url = %page.url,
            "Dispatcher shutting down, page rejected"
        );
        DispatcherError::ShuttingDown { url: page.url }
    }

    /// Stop accepting pages; queued and running pages still complete
    ///
    /// Returns immediately. Calling it again has no effect.
    pub fn exit_async(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let sender = self
            .inner
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);
        self.inner.pool.close();

        info!(
            sink = %self.inner.sink_name,
            submitted = self.count(),
            backlog = self.inner.pool.backlog_len(),
            "Dispatcher shutting down"
        );
    }

    /// Stop accepting pages and wait until every worker has finished
    #[instrument(name = "dispatcher_exit", skip(self), fields(sink = %self.inner.sink_name))]
    pub async fn exit(&self) {
        self.exit_async();

        let mut terminated = self.inner.pool.subscribe_terminated();
        if terminated.wait_for(|done| *done).await.is_err() {
            warn!(
                sink = %self.inner.sink_name,
                "Termination signal lost, assuming pool drained"
            );
        }

        let snapshot = self.metrics();
        info!(
            sink = %self.inner.sink_name,
            submitted = snapshot.submitted,
            written = snapshot.written,
            failed = snapshot.failed,
            rejected = snapshot.rejected,
            "Dispatcher shutdown complete"
        );
    }

    /// Whether [`exit_async`](Self::exit_async) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// Whether shutdown completed and no worker is left
    pub fn is_terminated(&self) -> bool {
        self.inner.pool.is_terminated()
    }

    /// Workers currently alive
    pub fn live_workers(&self) -> usize {
        self.inner.pool.live_workers()
    }

    /// Pages waiting for a free worker
    pub fn backlog_len(&self) -> usize {
        self.inner.pool.backlog_len()
    }

    /// Get metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

/// Create a dispatcher from a loaded configuration
///
/// Builds the configured sink, then the dispatcher on the current runtime.
#[instrument(name = "dispatcher_create", skip(blueprint), fields(sink = %blueprint.sink.name))]
pub async fn create_dispatcher(
    blueprint: &PersistenceBlueprint,
) -> Result<Dispatcher, DispatcherError> {
    let builder = DispatcherBuilder::new(blueprint.pool.clone());
    build_with_sink(builder, &blueprint.sink)
}

fn build_with_sink(
    builder: DispatcherBuilder,
    config: &SinkConfig,
) -> Result<Dispatcher, DispatcherError> {
    match config.sink_type {
        SinkType::Log => builder.build(LogSink::new(&config.name)),
        SinkType::Http => {
            let sink = HttpSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            builder.build(sink)
        }
    }
}
