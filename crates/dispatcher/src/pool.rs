//! WorkerPool - bounded set of worker tasks draining an unbounded backlog
//!
//! Sizing follows the configured [`PoolConfig`]:
//! - below `core_workers`, every submission spawns a worker
//! - when the backlog outgrows the idle workers, extra workers are spawned
//!   up to `max_workers`
//! - workers above the core size retire after `keep_alive` without work
//!
//! Workers exit once the backlog is closed and drained; the last one to
//! leave raises the termination signal.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{PageRecord, PoolConfig};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, instrument};

use crate::metrics::DispatcherMetrics;

/// Future persisting one page
pub(crate) type PageFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Type-erased per-page task body
pub(crate) type Job = Arc<dyn Fn(PageRecord) -> PageFuture + Send + Sync>;

/// What a worker got when it asked for work
enum Next {
    Page(PageRecord),
    /// Keep-alive elapsed without work
    Idle,
    /// Backlog closed and empty
    Closed,
}

/// State shared by the dispatcher handle and every worker
pub(crate) struct WorkerPool {
    config: PoolConfig,
    backlog: Mutex<mpsc::UnboundedReceiver<PageRecord>>,
    job: Job,
    runtime: Handle,
    metrics: Arc<DispatcherMetrics>,
    /// Workers alive (busy or idle)
    live: AtomicUsize,
    /// Workers waiting for a page
    idle: AtomicUsize,
    /// Pages sent but not yet picked up
    queued: AtomicUsize,
    closing: AtomicBool,
    next_worker_id: AtomicUsize,
    terminated: watch::Sender<bool>,
}

impl WorkerPool {
    pub(crate) fn new(
        config: PoolConfig,
        backlog: mpsc::UnboundedReceiver<PageRecord>,
        job: Job,
        runtime: Handle,
        metrics: Arc<DispatcherMetrics>,
    ) -> Arc<Self> {
        let (terminated, _) = watch::channel(false);
        Arc::new(Self {
            config,
            backlog: Mutex::new(backlog),
            job,
            runtime,
            metrics,
            live: AtomicUsize::new(0),
            idle: AtomicUsize::new(0),
            queued: AtomicUsize::new(0),
            closing: AtomicBool::new(false),
            next_worker_id: AtomicUsize::new(0),
            terminated,
        })
    }

    pub(crate) fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Workers currently alive
    pub(crate) fn live_workers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Pages waiting for a free worker
    pub(crate) fn backlog_len(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_terminated(&self) -> watch::Receiver<bool> {
        self.terminated.subscribe()
    }

    pub(crate) fn is_terminated(&self) -> bool {
        *self.terminated.borrow()
    }

    /// Account for a page about to be sent into the backlog
    ///
    /// Must be called before the send so a fast worker never observes an
    /// empty counter for a page it already received.
    pub(crate) fn page_enqueued(&self) {
        let depth = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        observability::record_backlog_depth(depth);
    }

    /// Undo [`page_enqueued`](Self::page_enqueued) after a failed send
    pub(crate) fn page_not_enqueued(&self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }

    /// Spawn a worker if the sizing policy asks for one
    pub(crate) fn ensure_worker(self: &Arc<Self>) {
        if self.try_spawn(self.config.core_workers) {
            return;
        }
        let queued = self.queued.load(Ordering::SeqCst);
        let idle = self.idle.load(Ordering::SeqCst);
        if queued > idle {
            self.try_spawn(self.config.max_workers);
        }
    }

    /// Close the pool: workers drain what is queued, then exit
    ///
    /// The backlog sender must already be dropped.
    pub(crate) fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        if self.live.load(Ordering::SeqCst) == 0 {
            self.mark_terminated();
        }
    }

    fn try_spawn(self: &Arc<Self>, limit: usize) -> bool {
        let mut live = self.live.load(Ordering::SeqCst);
        loop {
            if live >= limit {
                return false;
            }
            match self
                .live
                .compare_exchange(live, live + 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break,
                Err(current) => live = current,
            }
        }

        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        observability::record_live_workers(live + 1);
        self.runtime.spawn(worker_loop(Arc::clone(self), worker_id));
        true
    }

    /// Retire an idle worker above the core size
    fn try_retire(&self) -> bool {
        let mut live = self.live.load(Ordering::SeqCst);
        loop {
            if live <= self.config.core_workers {
                return false;
            }
            match self
                .live
                .compare_exchange(live, live - 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => {
                    observability::record_live_workers(live - 1);
                    return true;
                }
                Err(current) => live = current,
            }
        }
    }

    fn worker_exited(&self) {
        let remaining = self.live.fetch_sub(1, Ordering::SeqCst) - 1;
        observability::record_live_workers(remaining);
        if remaining == 0 && self.closing.load(Ordering::SeqCst) {
            self.mark_terminated();
        }
    }

    fn mark_terminated(&self) {
        if !self.terminated.send_replace(true) {
            debug!("Worker pool terminated");
        }
    }

    async fn next_page(&self) -> Next {
        self.idle.fetch_add(1, Ordering::SeqCst);

        let recv = async { self.backlog.lock().await.recv().await };
        let next = if self.live.load(Ordering::SeqCst) > self.config.core_workers {
            match tokio::time::timeout(self.config.keep_alive(), recv).await {
                Ok(Some(page)) => Next::Page(page),
                Ok(None) => Next::Closed,
                Err(_) => Next::Idle,
            }
        } else {
            match recv.await {
                Some(page) => Next::Page(page),
                None => Next::Closed,
            }
        };

        self.idle.fetch_sub(1, Ordering::SeqCst);
        if let Next::Page(_) = next {
            self.queued.fetch_sub(1, Ordering::SeqCst);
        }
        next
    }

    /// Run one page in its own task so a panic stays inside it
    async fn run_page(&self, page: PageRecord, worker_id: usize) {
        let url = page.url.clone();
        self.metrics.worker_busy();

        let task = self.runtime.spawn((self.job)(page));
        if let Err(e) = task.await {
            self.metrics.inc_failed();
            observability::record_page_persisted("pool", false);
            error!(worker = worker_id, url = %url, error = %e, "Submission task panicked");
        }

        self.metrics.worker_done();
    }
}

/// Worker task: take pages until the backlog closes or the worker retires
#[instrument(name = "pool_worker_loop", skip(pool))]
async fn worker_loop(pool: Arc<WorkerPool>, worker_id: usize) {
    debug!(worker = worker_id, "Worker started");

    loop {
        match pool.next_page().await {
            Next::Page(page) => pool.run_page(page, worker_id).await,
            Next::Idle => {
                if pool.try_retire() {
                    debug!(worker = worker_id, "Idle worker retired");
                    return;
                }
            }
            Next::Closed => break,
        }
    }

    pool.worker_exited();
    debug!(worker = worker_id, "Worker stopped");
}
