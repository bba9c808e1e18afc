//! Core library for nextver.
//!
//! Turns a commit history into the next semantic version. The engine is
//! a pure function over plain values; configuration and git access live
//! alongside it as thin collaborators.
//!
//! # Modules
//!
//! - [`commit`] - Raw commits, nested-block expansion, conventional parsing, classification
//! - [`config`] - Configuration loading and management
//! - [`engine`] - Next-version resolution
//! - [`error`] - Configuration error types
//! - [`git`] - Commit history from the local repository
//! - [`strategy`] - Bump rules and extension identifier specs
//! - [`version`] - Version values and bump arithmetic
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use nextver_core::commit::RawCommit;
//! use nextver_core::engine::{EngineInput, resolve};
//! use nextver_core::{ConfigLoader, SemVer};
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let input = EngineInput {
//!     raw_commits: vec![RawCommit::from_message("a1b2c3", "feat: add export")],
//!     trigger_hash: "a1b2c3".to_string(),
//!     previous: Some(SemVer::new(1, 2, 3)),
//!     start_time: Utc::now(),
//! };
//! let resolution = resolve(&config.release_settings(), &input).expect("resolution failed");
//! println!("next: {}", resolution.version);
//! ```
#![deny(unsafe_code)]

pub mod commit;

pub mod config;

pub mod engine;

pub mod error;

pub mod git;

pub mod strategy;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use engine::{EngineError, EngineInput, EngineResult, ReleaseSettings, Resolution, ResolutionPath};

pub use error::{ConfigError, ConfigResult};

pub use version::SemVer;

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
