//! Local artifact store.
//!
//! This crate provides:
//! - An artifact store keyed by `{kind}_{id}.{ext}` in one working directory
//! - No-clobber, cross-device safe commits of finished files
//! - Lookup by id in a fixed kind priority, without any index
//! - Retention sweeps and a cancellable periodic sweeper task

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod store;
pub mod sweeper;

pub use config::RetentionConfig;
pub use error::{StorageError, StorageResult};
pub use store::{ArtifactStore, Lookup, SweepReport};
pub use sweeper::{Sweeper, SweeperHandle};
