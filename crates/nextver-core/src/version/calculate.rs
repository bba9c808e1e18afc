//! Core field bump accounting.
//!
//! Each classified commit is scored against the three [`BumpRule`]s, the
//! counts are turned into bumps, pre-stable redirection moves bumps down
//! a field while `major == 0`, and the highest non-zero field wins.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::commit::ResolvedCommit;
use crate::strategy::{BreakingPolicy, BumpRule, BumpStrategy, CommitsPerBump};
use crate::version::{CoreField, SemVer};

/// Number of bumps derived from `n` counted commits with `k` commits per bump.
pub const fn bumps_from_commits(n: u64, k: CommitsPerBump) -> u64 {
    if n == 0 {
        return 0;
    }
    match k {
        CommitsPerBump::Infinite => 1,
        CommitsPerBump::Every(k) if k <= 0 => 1,
        CommitsPerBump::Every(k) => 1 + (n - 1) / k.unsigned_abs(),
    }
}

/// Raw tallies for one field before they become bumps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldTally {
    /// Bumps forced by breaking commits under [`BreakingPolicy::Bump`].
    pub direct: u64,
    /// Commits counted toward [`bumps_from_commits`].
    pub counted: u64,
}

impl FieldTally {
    /// Total bumps for this field under `rule`.
    pub const fn bumps(self, rule: &BumpRule) -> u64 {
        self.direct
            .saturating_add(bumps_from_commits(self.counted, rule.commits_per_bump))
    }
}

/// Per-field bump counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BumpCounts {
    /// Major bumps.
    pub major: u64,
    /// Minor bumps.
    pub minor: u64,
    /// Patch bumps.
    pub patch: u64,
}

impl BumpCounts {
    /// The field that wins the highest-wins cascade, if any bump exists.
    pub const fn winning_field(&self) -> Option<CoreField> {
        if self.major > 0 {
            Some(CoreField::Major)
        } else if self.minor > 0 {
            Some(CoreField::Minor)
        } else if self.patch > 0 {
            Some(CoreField::Patch)
        } else {
            None
        }
    }

    /// Apply pre-stable redirection for a version whose major is zero.
    #[must_use]
    pub const fn redirect_pre_stable(mut self, minor_for_major: bool, patch_for_minor: bool) -> Self {
        if minor_for_major && self.major > 0 {
            self.minor = self.minor.saturating_add(self.major);
            self.major = 0;
        }
        if patch_for_minor && self.minor > 0 {
            self.patch = self.patch.saturating_add(self.minor);
            self.minor = 0;
        }
        self
    }

    /// Apply the counts to `previous` with the highest-wins cascade.
    ///
    /// Identifier lists are not carried over. Fields saturate at `u64::MAX`.
    pub const fn apply(&self, previous: &SemVer) -> SemVer {
        let (major, minor, patch) = previous.core();
        match self.winning_field() {
            Some(CoreField::Major) => SemVer::new(major.saturating_add(self.major), 0, 0),
            Some(CoreField::Minor) => SemVer::new(major, minor.saturating_add(self.minor), 0),
            Some(CoreField::Patch) => SemVer::new(major, minor, patch.saturating_add(self.patch)),
            None => SemVer::new(major, minor, patch),
        }
    }
}

/// Outcome of core version calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreBump {
    /// Bumps after pre-stable redirection.
    pub counts: BumpCounts,
    /// The next core version (identifier lists empty).
    pub next: SemVer,
}

impl CoreBump {
    /// Whether the core triple changed relative to `previous`.
    pub const fn changed(&self, previous: &SemVer) -> bool {
        self.next.core_differs(previous)
    }
}

fn tally(commits: &[ResolvedCommit], rule: &BumpRule) -> FieldTally {
    let mut tally = FieldTally::default();
    for commit in commits {
        if commit.is_breaking {
            match rule.count_breaking_as {
                BreakingPolicy::Bump => {
                    tally.direct += 1;
                    continue;
                }
                BreakingPolicy::Commit => {
                    tally.counted += 1;
                    continue;
                }
                BreakingPolicy::None => {}
            }
        }
        if rule.types.iter().any(|t| t.eq_ignore_ascii_case(&commit.commit_type)) {
            tally.counted += 1;
        }
    }
    tally
}

/// Compute per-field bumps before redirection.
pub fn count_bumps(commits: &[ResolvedCommit], strategy: &BumpStrategy) -> BumpCounts {
    let bumps = |field| {
        let rule = strategy.rule(field);
        let tally = tally(commits, rule);
        debug!(%field, direct = tally.direct, counted = tally.counted, "field tally");
        tally.bumps(rule)
    };

    BumpCounts {
        major: bumps(CoreField::Major),
        minor: bumps(CoreField::Minor),
        patch: bumps(CoreField::Patch),
    }
}

/// Compute the next core version from `previous` and the retained commits.
#[instrument(skip_all, fields(%previous, commits = commits.len()))]
pub fn calculate_core(previous: &SemVer, commits: &[ResolvedCommit], strategy: &BumpStrategy) -> CoreBump {
    let mut counts = count_bumps(commits, strategy);

    if previous.major == 0 {
        counts = counts.redirect_pre_stable(
            strategy.bump_minor_for_major_pre_stable,
            strategy.bump_patch_for_minor_pre_stable,
        );
    }

    let next = counts.apply(previous);
    debug!(
        major = counts.major,
        minor = counts.minor,
        patch = counts.patch,
        %next,
        "core version calculated"
    );
    CoreBump { counts, next }
}
