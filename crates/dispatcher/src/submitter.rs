//! Submitter - per-page task body run by pool workers
//!
//! Normalizes a page, writes it, then attaches its attachments to the
//! created resource. The attach call is only issued after a successful
//! write. Failures end the chain and are logged here; nothing is returned
//! to the producer.

use std::sync::Arc;
use std::time::Instant;

use contracts::{PageRecord, RemoteSink, ResourceId};
use tracing::{debug, error, instrument};

use crate::error::SubmitError;
use crate::metrics::DispatcherMetrics;

/// Runs the write-then-attach chain against a shared sink
pub struct Submitter<S> {
    sink: Arc<S>,
}

impl<S> Clone for Submitter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: RemoteSink + Sync> Submitter<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Persist one page, returning the id of the stored resource
    ///
    /// # Errors
    /// [`SubmitError::RemoteWrite`] stops the chain before any attach call.
    #[instrument(
        name = "submitter_persist",
        skip(self, page),
        fields(sink = %self.sink.name(), url = %page.url)
    )]
    pub async fn persist(&self, page: PageRecord) -> Result<ResourceId, SubmitError> {
        let page = page.normalize();

        let written = self.sink.write(&page).await?;
        if !written.is_success() {
            return Err(SubmitError::RemoteWrite {
                code: written.code,
                detail: written.detail_message,
            });
        }
        let resource_id = written.data.ok_or(SubmitError::MissingResourceId)?;

        let attached = self.sink.attach(&resource_id, &page.attachments).await?;
        if !attached.is_success() {
            return Err(SubmitError::RemoteAttach {
                resource_id,
                code: attached.code,
                detail: attached.detail_message,
            });
        }

        Ok(resource_id)
    }

    /// Persist one page and record the outcome
    ///
    /// Terminal: a failure produces exactly one error log naming the page URL.
    pub async fn run(&self, page: PageRecord, metrics: &DispatcherMetrics) {
        let url = page.url.clone();
        let started = Instant::now();

        let result = self.persist(page).await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::record_persist_latency_ms(elapsed_ms);

        match result {
            Ok(resource_id) => {
                metrics.inc_written();
                observability::record_page_persisted(self.sink.name(), true);
                debug!(
                    sink = %self.sink.name(),
                    url = %url,
                    resource_id = %resource_id,
                    elapsed_ms,
                    "Page persisted"
                );
            }
            Err(e) => {
                metrics.inc_failed();
                observability::record_page_persisted(self.sink.name(), false);
                error!(
                    sink = %self.sink.name(),
                    url = %url,
                    error = %e,
                    "Saving page {url} failed"
                );
            }
        }
    }
}
