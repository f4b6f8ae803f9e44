//! Startup helpers: logger setup and shared resource construction.

mod logger;

use std::sync::Arc;

use tokio::sync::Semaphore;

pub use logger::init_logger_with;

/// Creates the shared semaphore bounding a fan-out's concurrency.
pub fn init_semaphore(max_concurrency: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(max_concurrency.max(1)))
}
