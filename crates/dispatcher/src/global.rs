//! Process-wide dispatcher
//!
//! Convenience layer for producers that cannot be handed a [`Dispatcher`]
//! explicitly. The instance is created at most once per process: either
//! eagerly with [`install`] or lazily with [`init_with`], whose closure runs
//! exactly once even when several threads race on first use.

use std::sync::OnceLock;

use contracts::PageRecord;

use crate::dispatcher::Dispatcher;
use crate::error::DispatcherError;

static INSTANCE: OnceLock<Dispatcher> = OnceLock::new();

/// Install `dispatcher` as the process-wide instance
///
/// # Errors
/// [`DispatcherError::AlreadyInstalled`] if an instance already exists.
pub fn install(dispatcher: Dispatcher) -> Result<(), DispatcherError> {
    INSTANCE
        .set(dispatcher)
        .map_err(|_| DispatcherError::AlreadyInstalled)
}

/// Get the process-wide instance, building it with `init` on first use
pub fn init_with<F>(init: F) -> &'static Dispatcher
where
    F: FnOnce() -> Dispatcher,
{
    INSTANCE.get_or_init(init)
}

/// The process-wide instance, if any
pub fn instance() -> Option<&'static Dispatcher> {
    INSTANCE.get()
}

fn installed() -> Result<&'static Dispatcher, DispatcherError> {
    instance().ok_or(DispatcherError::NotInstalled)
}

/// Number of pages submitted so far (0 before installation)
pub fn count() -> u64 {
    instance().map_or(0, Dispatcher::count)
}

/// Queue a page on the process-wide instance
pub fn submit(page: PageRecord) -> Result<(), DispatcherError> {
    installed()?.submit(page)
}

/// Begin shutdown without waiting
pub fn exit_async() -> Result<(), DispatcherError> {
    installed()?.exit_async();
    Ok(())
}

/// Begin shutdown and wait for every worker to finish
pub async fn exit() -> Result<(), DispatcherError> {
    installed()?.exit().await;
    Ok(())
}
