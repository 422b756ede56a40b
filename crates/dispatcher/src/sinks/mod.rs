//! Sink implementations
//!
//! Contains LogSink and HttpSink.

mod http;
mod log;

pub use self::http::{HttpSink, HttpSinkConfig};
pub use self::log::LogSink;
