//! Dispatcher error types

use contracts::ResourceId;
use thiserror::Error;

/// Dispatcher-specific errors
///
/// Only raised by construction and by the accessor layer; the outcome of an
/// individual page never surfaces here.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Pool parameters cannot be honoured
    #[error("invalid pool configuration: {message}")]
    InvalidPool { message: String },

    /// Dispatcher built outside of a tokio runtime
    #[error("no tokio runtime available to run workers")]
    NoRuntime,

    /// Page submitted after shutdown began
    #[error("dispatcher is shutting down, page '{url}' rejected")]
    ShuttingDown { url: String },

    /// Process-wide dispatcher used before being installed
    #[error("process-wide dispatcher not installed")]
    NotInstalled,

    /// Process-wide dispatcher installed twice
    #[error("process-wide dispatcher already installed")]
    AlreadyInstalled,
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid pool error
    pub fn invalid_pool(message: impl Into<String>) -> Self {
        Self::InvalidPool {
            message: message.into(),
        }
    }
}

/// Why a single page was not persisted
///
/// Terminal for the page: logged by the worker and dropped, never retried.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Primary write answered with a non-200 code
    #[error("remote write failed with code {code}: {detail}")]
    RemoteWrite { code: i32, detail: String },

    /// Primary write succeeded but carried no resource id
    #[error("remote write succeeded without a resource id")]
    MissingResourceId,

    /// Attachment upload answered with a non-200 code
    #[error("attaching to '{resource_id}' failed with code {code}: {detail}")]
    RemoteAttach {
        resource_id: ResourceId,
        code: i32,
        detail: String,
    },

    /// Transport fault in either call
    #[error("transport error: {0}")]
    Transport(#[from] contracts::ContractError),
}
