//! Explicit version directives in the trigger commit's footer.

use tracing::{debug, info, instrument};

use crate::commit::ResolvedCommit;
use crate::strategy::CommitTypeDefinition;
use crate::version::SemVer;

/// Policy entry allowing any trigger type.
pub const ALLOW_ALL: &str = "all";
/// Policy entry allowing any type from the configured commit types.
pub const ALLOW_BASE: &str = "base";

fn is_release_as(title: &str) -> bool {
    title.eq_ignore_ascii_case("release as") || title.eq_ignore_ascii_case("release-as")
}

/// Whether `policy` lets a commit of `commit_type` set the version.
pub fn is_permitted(policy: &[String], commit_type: &str, commit_types: &[CommitTypeDefinition]) -> bool {
    policy.iter().any(|entry| {
        entry == ALLOW_ALL
            || entry.eq_ignore_ascii_case(commit_type)
            || (entry == ALLOW_BASE
                && commit_types
                    .iter()
                    .any(|t| t.commit_type.eq_ignore_ascii_case(commit_type)))
    })
}

/// Resolve a `Release-As` directive on the trigger commit.
///
/// Returns `None` when there is no directive, the policy does not allow
/// it, or its text is not a valid version.
#[instrument(skip_all, fields(trigger = %trigger.hash))]
pub fn resolve_release_as(
    trigger: &ResolvedCommit,
    policy: &[String],
    commit_types: &[CommitTypeDefinition],
) -> Option<SemVer> {
    let note = trigger.notes.iter().find(|n| is_release_as(&n.title))?;

    if !is_permitted(policy, &trigger.commit_type, commit_types) {
        info!(
            commit_type = %trigger.commit_type,
            ?policy,
            "release-as directive not permitted for this commit type"
        );
        return None;
    }

    match SemVer::parse(&note.text) {
        Ok(version) => {
            debug!(%version, "release-as directive accepted");
            Some(version)
        }
        Err(e) => {
            info!(text = %note.text, error = %e, "ignoring malformed release-as directive");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::parse::parse_message;
    use crate::strategy::default_commit_types;

    fn policy(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| (*e).to_string()).collect()
    }

    fn resolve(message: &str, allow: &[&str]) -> Option<SemVer> {
        let trigger = parse_message("t1", message, false);
        resolve_release_as(&trigger, &policy(allow), &default_commit_types())
    }

    #[test]
    fn all_allows_any_type() {
        assert_eq!(
            resolve("wip: whatever\n\nRelease-as: 2.0.0", &["all"]),
            Some(SemVer::new(2, 0, 0))
        );
    }

    #[test]
    fn base_requires_configured_type() {
        assert_eq!(
            resolve("chore: release\n\nRelease-As: 1.5.0", &["base"]),
            Some(SemVer::new(1, 5, 0))
        );
        assert_eq!(resolve("wip: release\n\nRelease-As: 1.5.0", &["base"]), None);
    }

    #[test]
    fn exact_type_entry() {
        assert_eq!(
            resolve("feat: x\n\nRelease As: 3.0.0", &["feat"]),
            Some(SemVer::new(3, 0, 0))
        );
        assert_eq!(resolve("fix: x\n\nRelease As: 3.0.0", &["feat"]), None);
    }

    #[test]
    fn type_matching_ignores_case() {
        let mut types = default_commit_types();
        types.push(CommitTypeDefinition::visible("Deps", "Dependencies"));
        let trigger = parse_message("t1", "deps: bump\n\nRelease-As: 5.0.0", false);
        assert_eq!(
            resolve_release_as(&trigger, &policy(&["base"]), &types),
            Some(SemVer::new(5, 0, 0))
        );
        assert_eq!(
            resolve_release_as(&trigger, &policy(&["Deps"]), &default_commit_types()),
            Some(SemVer::new(5, 0, 0))
        );
    }

    #[test]
    fn empty_policy_denies() {
        assert_eq!(resolve("feat: x\n\nRelease-As: 3.0.0", &[]), None);
    }

    #[test]
    fn malformed_text_is_no_override() {
        assert_eq!(resolve("feat: x\n\nRelease-As: soon", &["all"]), None);
    }

    #[test]
    fn accepts_prefixed_and_prerelease_versions() {
        let v = resolve("feat: x\n\nRelease-As: v2.0.0-rc.1", &["all"]).unwrap();
        assert_eq!(v.to_string(), "2.0.0-rc.1");
    }

    #[test]
    fn no_directive() {
        assert_eq!(resolve("feat: x", &["all"]), None);
    }
}
