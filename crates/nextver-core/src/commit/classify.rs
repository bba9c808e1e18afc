//! Classification of working entries.
//!
//! Every non-ignored entry is parsed. Revert entries cancel themselves and
//! the entry they revert (newest first, one target each), then the
//! allow-list decides what is retained for bump accounting. The trigger
//! entry is parsed regardless of retention so its footer can be inspected.

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::commit::parse::parse_entry;
use crate::commit::{ResolvedCommit, WorkingCommitEntry};
use crate::engine::{EngineError, EngineResult};
use crate::strategy::CommitTypeDefinition;

/// Output of classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The trigger commit, parsed.
    pub trigger: ResolvedCommit,
    /// Commits that count toward bumps, newest first.
    pub retained: Vec<ResolvedCommit>,
}

fn hashes_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (a, b) = (a.to_ascii_lowercase(), b.to_ascii_lowercase());
    a.starts_with(&b) || b.starts_with(&a)
}

/// Find the entry reverted by `parsed[idx]` among older, uncancelled entries.
///
/// Hash prefix matches win; among several (virtual entries share their
/// parent's hash) the one whose header equals the reverted header is taken,
/// else the newest. Without a hash match the newest entry with that exact
/// header is taken.
fn revert_target(parsed: &[ResolvedCommit], idx: usize, cancelled: &BTreeSet<usize>) -> Option<usize> {
    let revert = parsed[idx].revert.as_ref()?;
    let older = move || {
        parsed
            .iter()
            .enumerate()
            .skip(idx + 1)
            .filter(move |(i, _)| !cancelled.contains(i))
    };

    if let Some(hash) = revert.hash.as_deref() {
        let by_hash: Vec<usize> = older()
            .filter(|(_, c)| hashes_match(&c.hash, hash))
            .map(|(i, _)| i)
            .collect();
        if let Some(&i) = by_hash.iter().find(|&&i| parsed[i].header == revert.header) {
            return Some(i);
        }
        if let Some(&i) = by_hash.first() {
            return Some(i);
        }
    }

    if revert.header.is_empty() {
        return None;
    }
    older()
        .find(|(_, c)| c.header == revert.header)
        .map(|(i, _)| i)
}

fn cancel_reverts(parsed: &[ResolvedCommit]) -> BTreeSet<usize> {
    let mut cancelled = BTreeSet::new();
    for (idx, commit) in parsed.iter().enumerate() {
        if commit.revert.is_none() || cancelled.contains(&idx) {
            continue;
        }
        cancelled.insert(idx);
        match revert_target(parsed, idx, &cancelled) {
            Some(target) => {
                debug!(
                    revert = %commit.header,
                    target = %parsed[target].header,
                    "revert cancels commit"
                );
                cancelled.insert(target);
            }
            None => debug!(revert = %commit.header, "reverted commit not in range"),
        }
    }
    cancelled
}

fn is_allowed(commit: &ResolvedCommit, commit_types: &[CommitTypeDefinition]) -> bool {
    !commit.commit_type.is_empty()
        && !commit.subject.is_empty()
        && commit_types
            .iter()
            .any(|t| t.commit_type.eq_ignore_ascii_case(&commit.commit_type))
}

/// Classify working entries against the commit-type allow-list.
///
/// # Errors
///
/// Returns [`EngineError::TriggerNotFound`] when no non-virtual entry has
/// the trigger hash.
#[instrument(skip(entries, commit_types), fields(entries = entries.len()))]
pub fn classify(
    entries: &[WorkingCommitEntry],
    trigger_hash: &str,
    commit_types: &[CommitTypeDefinition],
) -> EngineResult<Classification> {
    let trigger = entries
        .iter()
        .find(|e| !e.is_virtual && e.hash == trigger_hash)
        .map(parse_entry)
        .ok_or_else(|| EngineError::TriggerNotFound {
            hash: trigger_hash.to_string(),
        })?;

    let parsed: Vec<ResolvedCommit> = entries
        .iter()
        .filter(|e| !e.is_ignored)
        .map(parse_entry)
        .collect();
    let cancelled = cancel_reverts(&parsed);

    let mut retained = Vec::new();
    for (idx, commit) in parsed.into_iter().enumerate() {
        if cancelled.contains(&idx) {
            continue;
        }
        if is_allowed(&commit, commit_types) {
            retained.push(commit);
        } else {
            info!(hash = %commit.hash, header = %commit.header, "skipping commit outside allowed types");
        }
    }

    debug!(
        retained = retained.len(),
        cancelled = cancelled.len(),
        "classification complete"
    );
    Ok(Classification { trigger, retained })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::RawCommit;
    use crate::commit::expand::expand_commits;
    use crate::strategy::default_commit_types;

    fn entries(commits: &[(&str, &str)]) -> Vec<WorkingCommitEntry> {
        let raw: Vec<RawCommit> = commits
            .iter()
            .map(|(h, m)| RawCommit::from_message(*h, *m))
            .collect();
        expand_commits(&raw)
    }

    fn subjects(c: &Classification) -> Vec<&str> {
        c.retained.iter().map(|r| r.subject.as_str()).collect()
    }

    #[test]
    fn keeps_allowed_types_only() {
        let e = entries(&[
            ("c3", "feat: one"),
            ("c2", "wip: nope"),
            ("c1", "Merge branch 'x'"),
            ("c0", "fix: "),
        ]);
        let c = classify(&e, "c3", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["one"]);
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        let mut types = default_commit_types();
        types.push(CommitTypeDefinition::visible("Deps", "Dependencies"));
        let e = entries(&[("c1", "deps: bump serde")]);
        let c = classify(&e, "c1", &types).unwrap();
        assert_eq!(subjects(&c), vec!["bump serde"]);
    }

    #[test]
    fn missing_trigger_is_fatal() {
        let e = entries(&[("c1", "feat: one")]);
        let err = classify(&e, "nope", &default_commit_types()).unwrap_err();
        assert!(matches!(err, EngineError::TriggerNotFound { hash } if hash == "nope"));
    }

    #[test]
    fn trigger_is_parsed_even_when_not_retained() {
        let e = entries(&[("c1", "Release 2.0\n\nRelease-As: 2.0.0")]);
        let c = classify(&e, "c1", &default_commit_types()).unwrap();
        assert!(c.retained.is_empty());
        assert_eq!(c.trigger.notes[0].text, "2.0.0");
    }

    #[test]
    fn trigger_must_be_non_virtual() {
        let e = entries(&[(
            "c1",
            "chore: wrap\nSTART_OVERRIDE_CHANGES\nfeat: inner\nEND_OVERRIDE_CHANGES",
        )]);
        let c = classify(&e, "c1", &default_commit_types()).unwrap();
        assert_eq!(c.trigger.header, "chore: wrap");
        assert!(!c.trigger.is_virtual);
    }

    #[test]
    fn nested_override_yields_single_commit() {
        let e = entries(&[(
            "c1",
            "fix: placeholder\nSTART_OVERRIDE_CHANGES\nfix: real change\nEND_OVERRIDE_CHANGES",
        )]);
        let c = classify(&e, "c1", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["real change"]);
        assert!(c.retained[0].is_virtual);
    }

    #[test]
    fn revert_cancels_target_by_hash() {
        let e = entries(&[
            ("c3", "revert: \"feat: add export\"\n\nThis reverts commit c1."),
            ("c2", "fix: keep me"),
            ("c1", "feat: add export"),
        ]);
        let c = classify(&e, "c3", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["keep me"]);
    }

    #[test]
    fn revert_falls_back_to_header_text() {
        let e = entries(&[
            ("c3", "revert: feat: add export"),
            ("c2", "feat: add export"),
            ("c1", "feat: add export"),
        ]);
        let c = classify(&e, "c3", &default_commit_types()).unwrap();
        // Only the newest matching commit is cancelled.
        assert_eq!(c.retained.len(), 1);
        assert_eq!(c.retained[0].hash, "c1");
    }

    #[test]
    fn unmatched_revert_hash_falls_back_to_header_text() {
        let e = entries(&[
            ("c3", "revert: \"feat: add export\"\n\nThis reverts commit 0bad."),
            ("c2", "fix: keep me"),
            ("c1", "feat: add export"),
        ]);
        let c = classify(&e, "c3", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["keep me"]);
    }

    #[test]
    fn revert_hash_match_prefers_equal_header_among_virtual_entries() {
        let e = entries(&[
            ("r1", "revert: \"fix: second\"\n\nThis reverts commit m1."),
            (
                "m1",
                "chore: merge\nSTART_APPEND_CHANGES\nfeat: first\nfix: second\nEND_APPEND_CHANGES",
            ),
        ]);
        let c = classify(&e, "r1", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["merge", "first"]);
    }

    #[test]
    fn revert_without_target_is_still_dropped() {
        let e = entries(&[
            ("c2", "revert: \"feat: gone\"\n\nThis reverts commit ffff."),
            ("c1", "fix: stays"),
        ]);
        let c = classify(&e, "c2", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["stays"]);
    }

    #[test]
    fn revert_of_revert_restores_original() {
        let e = entries(&[
            ("c3", "revert: \"revert: \"feat: back\"\"\n\nThis reverts commit c2."),
            ("c2", "revert: \"feat: back\"\n\nThis reverts commit c1."),
            ("c1", "feat: back"),
        ]);
        let c = classify(&e, "c3", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["back"]);
    }

    #[test]
    fn revert_never_targets_newer_commits() {
        let e = entries(&[
            ("c2", "feat: later"),
            ("c1", "revert: feat: later"),
        ]);
        let c = classify(&e, "c2", &default_commit_types()).unwrap();
        assert_eq!(subjects(&c), vec!["later"]);
    }
}
