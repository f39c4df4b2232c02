//! Embedded relational store and two-tier cache for analyzed videos.
//!
//! This crate provides:
//! - A pooled SQLite store of `VideoRecord`s (upsert/search/statistics)
//! - An in-process LRU cache optionally backed by Redis, keyed by the
//!   domain-specific helpers in `cache`

pub mod cache;
pub mod db;
pub mod error;

pub use cache::{CacheConfig, TwoTierCache};
pub use db::{GenreCount, PlatformCount, SearchFilter, Statistics, VideoStore};
pub use error::{StorageError, StorageResult};
