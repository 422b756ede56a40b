//! LogSink - logs page summaries via tracing

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{Attachment, ContractError, NormalizedPage, RemoteSink, ResourceId, SinkResponse};
use tracing::{info, instrument};

/// Sink that logs pages instead of storing them
///
/// Always answers with success and a locally generated resource id.
pub struct LogSink {
    name: String,
    next_id: AtomicU64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_resource_id(&self) -> ResourceId {
        format!("{}-{}", self.name, self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl RemoteSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, page),
        fields(sink = %self.name, url = %page.url)
    )]
    async fn write(&self, page: &NormalizedPage) -> Result<SinkResponse<ResourceId>, ContractError> {
        let resource_id = self.next_resource_id();
        info!(
            sink = %self.name,
            resource_id = %resource_id,
            page_type = %page.page_type,
            url = %page.url,
            title = %page.title,
            created_at = %page.created_at,
            content_len = page.content.len(),
            "Page received"
        );
        Ok(SinkResponse::ok(resource_id))
    }

    #[instrument(name = "log_sink_attach", skip(self, attachments))]
    async fn attach(
        &self,
        resource_id: &ResourceId,
        attachments: &[Attachment],
    ) -> Result<SinkResponse<String>, ContractError> {
        info!(
            sink = %self.name,
            resource_id = %resource_id,
            attachments = attachments.len(),
            "Attachments received"
        );
        Ok(SinkResponse::ok(resource_id.clone()))
    }
}
