//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `PageRecord` is produced outside the pipeline and is read-only once submitted
//! - `NormalizedPage` is the only shape a `RemoteSink` ever receives

mod blueprint;
mod error;
mod page;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use page::*;
pub use sink::*;
