//! RemoteSink trait - Dispatcher output interface
//!
//! Defines the abstract interface of the remote store that pages are
//! persisted to.

use serde::{Deserialize, Serialize};

use crate::{Attachment, ContractError, NormalizedPage, ResourceId};

/// Status code that marks a successful remote operation
pub const SUCCESS_CODE: i32 = 200;

/// Application-level answer of the remote store
///
/// `code == 200` means success; any other code is a failure described by
/// `detail_message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinkResponse<T> {
    pub code: i32,
    pub data: Option<T>,
    #[serde(default)]
    pub detail_message: String,
}

impl<T> SinkResponse<T> {
    /// Successful response carrying `data`
    pub fn ok(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            data: Some(data),
            detail_message: String::new(),
        }
    }

    /// Failed response
    pub fn failed(code: i32, detail_message: impl Into<String>) -> Self {
        Self {
            code,
            data: None,
            detail_message: detail_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Remote store trait
///
/// Implementations are shared by every pool worker, so methods take `&self`
/// and may be called concurrently.
#[trait_variant::make(RemoteSink: Send)]
pub trait LocalRemoteSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Store a page, returning the id of the created resource in `data`
    ///
    /// # Errors
    /// Transport-level failures only; application failures are reported
    /// through [`SinkResponse::code`].
    async fn write(&self, page: &NormalizedPage) -> Result<SinkResponse<ResourceId>, ContractError>;

    /// Link attachments to a stored page
    async fn attach(
        &self,
        resource_id: &ResourceId,
        attachments: &[Attachment],
    ) -> Result<SinkResponse<String>, ContractError>;
}
