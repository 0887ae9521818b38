//! Worker pool orchestration.
//!
//! The [`ScanManager`] fans a batch of targets out to a bounded set of
//! workers sharing one [`TargetQueue`], and fans the outcomes back in to a
//! single [`BatchReport`](crate::core::BatchReport).

mod queue;
mod scan_manager;

pub use queue::TargetQueue;
pub use scan_manager::{ScanManager, WorkerPoolConfig, DEFAULT_CONCURRENCY};
