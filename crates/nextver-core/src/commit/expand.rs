//! Nested commit blocks.
//!
//! A squash or merge commit can carry the messages it stands for:
//!
//! ```text
//! chore: release train
//!
//! START_APPEND_CHANGES
//! feat: add export
//! fix(cli): handle empty input
//! END_APPEND_CHANGES
//! ```
//!
//! An append block adds one virtual entry per line after the original.
//! An override block does the same but the original is ignored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::commit::{RawCommit, WorkingCommitEntry};

static OVERRIDE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)START_OVERRIDE_CHANGES(.*?)END_OVERRIDE_CHANGES")
        .expect("override block pattern compiles")
});

static APPEND_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)START_APPEND_CHANGES(.*?)END_APPEND_CHANGES")
        .expect("append block pattern compiles")
});

fn block_lines(pattern: &Regex, message: &str) -> Option<Vec<String>> {
    let mut found = false;
    let mut lines = Vec::new();
    for captures in pattern.captures_iter(message) {
        found = true;
        if let Some(inner) = captures.get(1) {
            lines.extend(
                inner
                    .as_str()
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        }
    }
    found.then_some(lines)
}

fn strip_blocks(message: &str) -> String {
    let without_override = OVERRIDE_BLOCK.replace_all(message, "");
    APPEND_BLOCK.replace_all(&without_override, "").trim().to_string()
}

/// Expand one raw commit into its working entries.
pub fn expand_commit(raw: &RawCommit) -> Vec<WorkingCommitEntry> {
    let message = raw.full_message();
    let override_lines = block_lines(&OVERRIDE_BLOCK, &message);
    let append_lines = block_lines(&APPEND_BLOCK, &message);

    let (is_ignored, children) = match (override_lines, append_lines) {
        (Some(lines), _) => (true, lines),
        (None, Some(lines)) => (false, lines),
        (None, None) => (false, Vec::new()),
    };

    if !children.is_empty() || is_ignored {
        debug!(
            hash = %raw.hash,
            is_ignored,
            virtual_entries = children.len(),
            "expanded nested changes"
        );
    }

    let mut entries = Vec::with_capacity(children.len() + 1);
    entries.push(WorkingCommitEntry {
        hash: raw.hash.clone(),
        message: strip_blocks(&message),
        is_virtual: false,
        is_ignored,
    });
    entries.extend(children.into_iter().map(|message| WorkingCommitEntry {
        hash: raw.hash.clone(),
        message,
        is_virtual: true,
        is_ignored: false,
    }));
    entries
}

/// Expand raw commits in order, each original followed by its virtual entries.
pub fn expand_commits(raw: &[RawCommit]) -> Vec<WorkingCommitEntry> {
    raw.iter().flat_map(expand_commit).collect()
}
