//! Shared building blocks for Shardline: the value model, error taxonomy,
//! configuration, and identifier helpers.

pub mod config;
pub mod datum;
pub mod error;
pub mod names;

pub use config::ShardlineConfig;
pub use datum::{Datum, OwnedRow};
pub use error::{ErrorKind, ShardlineError, ShardlineResult};
