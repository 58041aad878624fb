//! Core types, configuration, and error handling for forkdiff.
//!
//! This crate provides the shared foundation used by the other forkdiff crates:
//! - [`ForkdiffError`]: unified error type using `thiserror`
//! - [`ForkdiffConfig`]: configuration loaded from `.forkdiff.toml`
//! - Shared types: [`ChangeKind`], [`EffectivePath`]

mod config;
mod error;
mod types;

pub use config::{ExtractConfig, ForkdiffConfig, LlmConfig, DEFAULT_BINARY_EXTENSIONS};
pub use error::ForkdiffError;
pub use types::{ChangeKind, EffectivePath};

/// A convenience `Result` type for forkdiff operations.
pub type Result<T> = std::result::Result<T, ForkdiffError>;
