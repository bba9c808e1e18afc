//! Next-version resolution.
//!
//! [`resolve`] runs the whole chain on plain values: expand nested blocks,
//! classify, honor a permitted `Release-As` directive on the trigger, fall
//! back to the initial version when there is no previous one, and otherwise
//! compute the core bump and both extension lists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::commit::classify::classify;
use crate::commit::expand::expand_commits;
use crate::commit::{RawCommit, ResolvedCommit};
use crate::strategy::{BumpStrategy, CommitTypeDefinition, default_commit_types};
use crate::version::calculate::{BumpCounts, calculate_core};
use crate::version::extension::{ExtensionContext, parse_time_zone, resolve_extension};
use crate::version::release_as::resolve_release_as;
use crate::version::SemVer;

/// Fatal errors from version resolution.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No raw commits were supplied.
    #[error("no commits to resolve")]
    EmptyHistory,

    /// No non-virtual entry has the trigger hash.
    #[error("trigger commit {hash} not found in history")]
    TriggerNotFound {
        /// The hash that was looked up.
        hash: String,
    },

    /// The configured initial version is not valid semver.
    #[error("invalid initial version {value:?}: {source}")]
    InvalidInitialVersion {
        /// The configured string.
        value: String,
        /// The parse failure.
        source: crate::version::VersionError,
    },

    /// An unknown IANA time zone id.
    #[error("unknown time zone {0:?}")]
    InvalidTimeZone(String),
}

/// Result alias for version resolution.
pub type EngineResult<T> = Result<T, EngineError>;

/// Release settings the engine reads; built from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseSettings {
    /// Commit-type allow-list.
    pub commit_types: Vec<CommitTypeDefinition>,
    /// Who may use `Release-As`: `all`, `base`, or exact types.
    pub allow_release_as: Vec<String>,
    /// Bump and extension rules.
    pub strategy: BumpStrategy,
    /// Version used when there is no previous one.
    pub initial_version: String,
    /// Default zone for date identifiers.
    pub time_zone: String,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            commit_types: default_commit_types(),
            allow_release_as: vec!["base".to_string()],
            strategy: BumpStrategy::default(),
            initial_version: "0.1.0".to_string(),
            time_zone: "UTC".to_string(),
        }
    }
}

/// Per-run inputs.
#[derive(Debug, Clone)]
pub struct EngineInput {
    /// Commits newest first, from the trigger back to the last release.
    pub raw_commits: Vec<RawCommit>,
    /// Hash of the commit that started the run.
    pub trigger_hash: String,
    /// The last released version, if any.
    pub previous: Option<SemVer>,
    /// Fixed start time for date and timestamp identifiers.
    pub start_time: DateTime<Utc>,
}

/// Which branch produced the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPath {
    /// A `Release-As` directive on the trigger commit.
    Override,
    /// No previous version; the configured initial version.
    Initial,
    /// Bumped from the previous version.
    Computed,
}

impl std::fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::Initial => write!(f, "initial"),
            Self::Computed => write!(f, "computed"),
        }
    }
}

/// Result of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The next version.
    pub version: SemVer,
    /// Which branch produced it.
    pub path: ResolutionPath,
    /// Core bumps after pre-stable redirection; zero unless computed.
    pub bumps: BumpCounts,
    /// Commits retained for bump accounting.
    pub commits: Vec<ResolvedCommit>,
}

/// Resolve the next version.
///
/// # Errors
///
/// Fails on empty history, a missing trigger commit, an invalid initial
/// version (only when it is needed), or an unknown time zone.
#[instrument(skip_all, fields(trigger = %input.trigger_hash, commits = input.raw_commits.len()))]
pub fn resolve(settings: &ReleaseSettings, input: &EngineInput) -> EngineResult<Resolution> {
    if input.raw_commits.is_empty() {
        return Err(EngineError::EmptyHistory);
    }

    let entries = expand_commits(&input.raw_commits);
    let classification = classify(&entries, &input.trigger_hash, &settings.commit_types)?;
    let commits = classification.retained;

    if let Some(version) = resolve_release_as(
        &classification.trigger,
        &settings.allow_release_as,
        &settings.commit_types,
    ) {
        info!(%version, "using release-as version");
        return Ok(Resolution {
            version,
            path: ResolutionPath::Override,
            bumps: BumpCounts::default(),
            commits,
        });
    }

    let Some(previous) = input.previous.as_ref() else {
        let version = SemVer::parse(&settings.initial_version).map_err(|source| {
            EngineError::InvalidInitialVersion {
                value: settings.initial_version.clone(),
                source,
            }
        })?;
        info!(%version, "no previous version, using initial version");
        return Ok(Resolution {
            version,
            path: ResolutionPath::Initial,
            bumps: BumpCounts::default(),
            commits,
        });
    };

    let core = calculate_core(previous, &commits, &settings.strategy);
    let ctx = ExtensionContext {
        start_time: input.start_time,
        time_zone: parse_time_zone(&settings.time_zone)?,
        core_changed: core.changed(previous),
    };
    let prerelease = resolve_extension(&settings.strategy.prerelease, &previous.prerelease, &ctx)?;
    let build = resolve_extension(&settings.strategy.build, &previous.build, &ctx)?;
    let version = core.next.with_extensions(prerelease, build);

    debug!(%previous, %version, "computed next version");
    Ok(Resolution {
        version,
        path: ResolutionPath::Computed,
        bumps: core.counts,
        commits,
    })
}
