//! # Dispatcher
//!
//! Page persistence dispatcher.
//!
//! 负责：
//! - 接收 `PageRecord`，立即返回，不阻塞生产者
//! - 在有界 worker 池中并发写入远端存储 (先写入，成功后再上传附件)
//! - 隔离单个页面的失败：记录日志后丢弃，不重试
//! - 两种关闭方式：`exit_async` 立即返回，`exit` 等待全部 worker 结束

pub mod dispatcher;
pub mod error;
pub mod global;
pub mod metrics;
mod pool;
pub mod sinks;
pub mod submitter;

pub use contracts::{PageRecord, RemoteSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder};
pub use error::{DispatcherError, SubmitError};
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use sinks::{HttpSink, HttpSinkConfig, LogSink};
pub use submitter::Submitter;
