#![deny(unreachable_patterns)]
//! Video analysis worker.
//!
//! This crate provides:
//! - The end-to-end analysis pipeline (`pipeline`), dispatched as a
//!   `vclip-queue` `JobRunner`
//! - Worker configuration (`config`)
//! - Structured per-job logging (`logging`)
//! - The worker's error taxonomy (`error`)

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::PipelineRunner;
