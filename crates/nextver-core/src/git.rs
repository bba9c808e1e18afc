//! Git history collection.
//!
//! Shells out to `git` for all operations so the user's configuration
//! (safe directories, replace refs, etc.) applies. Commands run in the
//! current working directory.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::commit::RawCommit;
use crate::version::SemVer;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "log").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,

    /// HEAD already carries a release tag.
    #[error("no new commits: HEAD is already tagged {tag}")]
    NoNewCommits {
        /// The tag on HEAD.
        tag: String,
    },
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// Commits since the last release, ready for the engine.
#[derive(Debug, Clone)]
pub struct History {
    /// The nearest release tag reachable from HEAD.
    pub previous_tag: Option<String>,
    /// The version parsed from `previous_tag`.
    pub previous_version: Option<SemVer>,
    /// HEAD's full hash.
    pub trigger_hash: String,
    /// Commits in `previous_tag..HEAD`, newest first.
    pub commits: Vec<RawCommit>,
}

/// Check if we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    let result = git(&["rev-parse", "--is-inside-work-tree"]);
    match result {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. } | GitError::NotARepo) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Full hash of HEAD.
#[instrument]
pub fn head_hash() -> GitResult<String> {
    let hash = git(&["rev-parse", "HEAD"])?.trim().to_string();
    debug!(%hash, "HEAD");
    Ok(hash)
}

/// Parse a tag name as a release version under `prefix`.
pub fn version_from_tag(tag: &str, prefix: &str) -> Option<SemVer> {
    SemVer::parse(tag.strip_prefix(prefix)?).ok()
}

/// The highest release tag merged into HEAD, if any.
///
/// Tags matching `prefix*` that do not parse as versions are skipped.
#[instrument]
pub fn latest_version_tag(prefix: &str) -> GitResult<Option<String>> {
    let pattern = format!("{prefix}*");
    let output = git(&[
        "tag",
        "--merged",
        "HEAD",
        "--list",
        &pattern,
        "--sort=-version:refname",
    ])?;

    let tag = output
        .lines()
        .map(str::trim)
        .find(|t| version_from_tag(t, prefix).is_some())
        .map(str::to_string);
    debug!(?tag, "latest version tag");
    Ok(tag)
}

/// Tags that point directly at `rev`.
#[instrument]
pub fn tags_pointing_at(rev: &str) -> GitResult<Vec<String>> {
    let output = git(&["tag", "--points-at", rev])?;
    Ok(output
        .lines()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_log(output: &str) -> Vec<RawCommit> {
    output
        .split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            let (hash, message) = record.split_once(FIELD_SEP)?;
            let hash = hash.trim();
            (!hash.is_empty()).then(|| RawCommit::from_message(hash, message.trim_end()))
        })
        .collect()
}

/// Commits in `since..HEAD` (or all of HEAD's history), newest first.
#[instrument]
pub fn raw_commits_since(since: Option<&str>) -> GitResult<Vec<RawCommit>> {
    let range = since.map_or_else(|| "HEAD".to_string(), |tag| format!("{tag}..HEAD"));
    let output = git(&["log", &range, "--format=%H%x1f%B%x1e"])?;
    let commits = parse_log(&output);
    debug!(count = commits.len(), "raw commits");
    Ok(commits)
}

/// Gather everything the engine needs from the repository.
///
/// # Errors
///
/// Returns [`GitError::NoNewCommits`] when HEAD itself carries a release tag.
#[instrument]
pub fn collect_history(prefix: &str) -> GitResult<History> {
    let trigger_hash = head_hash()?;

    if let Some(tag) = tags_pointing_at(&trigger_hash)?
        .into_iter()
        .find(|t| version_from_tag(t, prefix).is_some())
    {
        return Err(GitError::NoNewCommits { tag });
    }

    let previous_tag = latest_version_tag(prefix)?;
    let previous_version = previous_tag
        .as_deref()
        .and_then(|t| version_from_tag(t, prefix));
    let commits = raw_commits_since(previous_tag.as_deref())?;

    debug!(?previous_tag, %trigger_hash, commits = commits.len(), "collected history");
    Ok(History {
        previous_tag,
        previous_version,
        trigger_hash,
        commits,
    })
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}
