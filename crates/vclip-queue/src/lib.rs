//! In-process priority job queue.
//!
//! This crate provides:
//! - A bounded priority heap with a single dispatcher and a fixed-size
//!   worker pool (no external broker)
//! - A typed, per-job progress stream
//! - Bounded retention of completed job results

pub mod error;
pub mod job;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::JobKind;
pub use progress::{ProgressEvent, ProgressHub, ProgressSender};
pub use queue::{JobQueue, JobResultView, JobRunner, QueueConfig, QueueStatus};
