//! Conventional-commit message parsing.
//!
//! The header is `type(scope)!: subject`. The footer starts at the first
//! note keyword line (`BREAKING CHANGE:`, `BREAKING-CHANGE:`, `Release-As:`,
//! `Release As:`) or, failing that, at a trailing paragraph made only of
//! `Token: value` trailers. Lines under a note that are not trailers
//! continue the note's text.

use std::sync::LazyLock;

use regex::Regex;

use crate::commit::{Note, ResolvedCommit, RevertRef, WorkingCommitEntry};

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w*)(?:\(([^()]*)\))?(!)?: (.*)$").expect("header pattern compiles")
});

static NOTE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(BREAKING CHANGE|BREAKING-CHANGE|RELEASE AS|RELEASE-AS):\s*(.*)$")
        .expect("note keyword pattern compiles")
});

static TRAILER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][\w-]*(?:: | #)\S").expect("trailer pattern compiles")
});

static REVERT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^revert:?\s+"?(.*?)"?\s*$"#).expect("revert header pattern compiles")
});

static REVERT_HASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)this reverts commit\s+([0-9a-f]+)").expect("revert hash pattern compiles")
});

struct Header<'a> {
    commit_type: &'a str,
    scope: Option<&'a str>,
    bang: bool,
    subject: &'a str,
}

fn parse_header(line: &str) -> Option<Header<'_>> {
    let captures = HEADER.captures(line)?;
    Some(Header {
        commit_type: captures.get(1).map_or("", |m| m.as_str()),
        scope: captures
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty()),
        bang: captures.get(3).is_some(),
        subject: captures.get(4).map_or("", |m| m.as_str().trim()),
    })
}

fn note_title(keyword: &str) -> String {
    if keyword.eq_ignore_ascii_case("BREAKING CHANGE") || keyword.eq_ignore_ascii_case("BREAKING-CHANGE") {
        Note::BREAKING.to_string()
    } else {
        keyword.to_string()
    }
}

/// Index of the first footer line in `lines`, if any.
fn footer_start(lines: &[&str]) -> Option<usize> {
    if let Some(idx) = lines.iter().position(|l| NOTE_KEYWORD.is_match(l.trim_end())) {
        return Some(idx);
    }

    // Trailing paragraph where every line is a trailer.
    let end = lines.iter().rposition(|l| !l.trim().is_empty())?;
    let start = lines[..=end]
        .iter()
        .rposition(|l| l.trim().is_empty())
        .map_or(0, |blank| blank + 1);
    lines[start..=end]
        .iter()
        .all(|l| TRAILER.is_match(l))
        .then_some(start)
}

fn parse_notes(footer: &[&str]) -> Vec<Note> {
    let mut notes: Vec<Note> = Vec::new();
    let mut in_note = false;
    for line in footer {
        let line = line.trim_end();
        if let Some(captures) = NOTE_KEYWORD.captures(line) {
            notes.push(Note {
                title: note_title(&captures[1]),
                text: captures[2].trim().to_string(),
            });
            in_note = true;
        } else if TRAILER.is_match(line) {
            in_note = false;
        } else if in_note && let Some(note) = notes.last_mut() {
            if !note.text.is_empty() && !line.is_empty() {
                note.text.push('\n');
            }
            note.text.push_str(line.trim());
        }
    }
    for note in &mut notes {
        note.text = note.text.trim().to_string();
    }
    notes
}

fn join_trimmed(lines: &[&str]) -> Option<String> {
    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn parse_revert(header: &str, message: &str) -> Option<RevertRef> {
    let captures = REVERT_HEADER.captures(header)?;
    let reverted = captures.get(1)?.as_str().trim();
    let hash = REVERT_HASH
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase());
    if reverted.is_empty() && hash.is_none() {
        return None;
    }
    Some(RevertRef {
        header: reverted.to_string(),
        hash,
    })
}

/// Parse a message into a commit fact.
///
/// Never fails: a non-conventional header yields an empty type and subject,
/// which the classifier then drops.
pub fn parse_message(hash: &str, message: &str, is_virtual: bool) -> ResolvedCommit {
    let trimmed = message.trim_start();
    let mut lines: Vec<&str> = trimmed.lines().collect();
    let first_line = if lines.is_empty() { "" } else { lines.remove(0) };
    let header_line = first_line.trim();

    let header = parse_header(first_line);
    let (commit_type, scope, bang, subject) = header.as_ref().map_or(("", None, false, ""), |h| {
        (h.commit_type, h.scope, h.bang, h.subject)
    });

    let (body_lines, footer_lines) = match footer_start(&lines) {
        Some(idx) => lines.split_at(idx),
        None => (lines.as_slice(), &[][..]),
    };

    let mut notes = parse_notes(footer_lines);
    let has_breaking_note = notes.iter().any(Note::is_breaking);
    let is_breaking = bang || has_breaking_note;
    if bang && !has_breaking_note {
        notes.push(Note {
            title: Note::BREAKING.to_string(),
            text: subject.to_string(),
        });
    }

    ResolvedCommit {
        hash: hash.to_string(),
        commit_type: commit_type.to_lowercase(),
        scope: scope.map(str::to_string),
        subject: subject.to_string(),
        header: header_line.to_string(),
        body: join_trimmed(body_lines),
        footer: join_trimmed(footer_lines),
        notes,
        is_breaking,
        is_virtual,
        revert: parse_revert(header_line, trimmed),
    }
}

/// Parse a working entry.
pub fn parse_entry(entry: &WorkingCommitEntry) -> ResolvedCommit {
    parse_message(&entry.hash, &entry.message, entry.is_virtual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(message: &str) -> ResolvedCommit {
        parse_message("abc123", message, false)
    }

    #[test]
    fn simple_header() {
        let c = parse("feat: add export");
        assert_eq!(c.commit_type, "feat");
        assert_eq!(c.scope, None);
        assert_eq!(c.subject, "add export");
        assert!(!c.is_breaking);
        assert!(c.notes.is_empty());
        assert_eq!(c.body, None);
    }

    #[test]
    fn scope_and_uppercase_type() {
        let c = parse("FIX(parser): handle tabs");
        assert_eq!(c.commit_type, "fix");
        assert_eq!(c.scope.as_deref(), Some("parser"));
        assert_eq!(c.subject, "handle tabs");
    }

    #[test]
    fn bang_adds_synthetic_breaking_note() {
        let c = parse("feat(api)!: drop v1 endpoints");
        assert!(c.is_breaking);
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.notes[0].title, "BREAKING CHANGE");
        assert_eq!(c.notes[0].text, "drop v1 endpoints");
    }

    #[test]
    fn breaking_footer_without_bang() {
        let c = parse("refactor: rename config\n\nMoves files.\n\nBREAKING-CHANGE: config moved\nto a new place");
        assert!(c.is_breaking);
        assert_eq!(c.body.as_deref(), Some("Moves files."));
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.notes[0].title, "BREAKING CHANGE");
        assert_eq!(c.notes[0].text, "config moved\nto a new place");
    }

    #[test]
    fn bang_with_footer_keeps_single_note() {
        let c = parse("feat!: x\n\nBREAKING CHANGE: details");
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.notes[0].text, "details");
    }

    #[test]
    fn breaking_keyword_is_case_insensitive() {
        let c = parse("fix: y\n\nbreaking change: lowercase");
        assert!(c.is_breaking);
    }

    #[test]
    fn breaking_derivation_is_idempotent() {
        let first = parse("feat!: once");
        let again = parse(&format!("{}\n\nBREAKING CHANGE: {}", first.header, first.notes[0].text));
        assert_eq!(first.is_breaking, again.is_breaking);
        assert_eq!(first.notes, again.notes);
    }

    #[test]
    fn release_as_note() {
        let c = parse("chore: cut release\n\nRelease-As: 2.0.0");
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.notes[0].title, "Release-As");
        assert_eq!(c.notes[0].text, "2.0.0");
        assert!(!c.is_breaking);
    }

    #[test]
    fn release_as_with_space() {
        let c = parse("chore: cut\n\nRelease as: 3.1.0\nSigned-off-by: A <a@b.c>");
        assert_eq!(c.notes[0].title, "Release as");
        assert_eq!(c.notes[0].text, "3.1.0");
        assert!(c.footer.unwrap().contains("Signed-off-by"));
    }

    #[test]
    fn trailer_paragraph_is_footer() {
        let c = parse("fix: z\n\nSome body text.\n\nReviewed-by: Sam\nRefs #123");
        assert_eq!(c.body.as_deref(), Some("Some body text."));
        assert_eq!(c.footer.as_deref(), Some("Reviewed-by: Sam\nRefs #123"));
        assert!(c.notes.is_empty());
    }

    #[test]
    fn non_conventional_header() {
        let c = parse("Merge branch 'main'");
        assert_eq!(c.commit_type, "");
        assert_eq!(c.subject, "");
        assert_eq!(c.header, "Merge branch 'main'");
    }

    #[test]
    fn empty_subject() {
        let c = parse("feat: ");
        assert_eq!(c.commit_type, "feat");
        assert_eq!(c.subject, "");
    }

    #[test]
    fn revert_with_hash() {
        let c = parse("revert: \"feat: add export\"\n\nThis reverts commit 1a2b3c4d.");
        let revert = c.revert.unwrap();
        assert_eq!(revert.header, "feat: add export");
        assert_eq!(revert.hash.as_deref(), Some("1a2b3c4d"));
    }

    #[test]
    fn git_style_revert() {
        let c = parse("Revert \"fix: broken\"\n\nThis reverts commit DEADBEEF.");
        let revert = c.revert.unwrap();
        assert_eq!(revert.header, "fix: broken");
        assert_eq!(revert.hash.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn revert_without_hash() {
        let c = parse("revert: feat: add export");
        let revert = c.revert.unwrap();
        assert_eq!(revert.header, "feat: add export");
        assert_eq!(revert.hash, None);
    }

    #[test]
    fn reverting_words_in_subject_are_not_a_revert() {
        assert!(parse("fix: reverted the cache change").revert.is_none());
        assert!(parse("docs: revert-friendly steps").revert.is_none());
    }
}
