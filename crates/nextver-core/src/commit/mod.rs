//! Commit records from raw history to classified facts.
//!
//! - [`expand`] - nested override/append blocks become virtual entries
//! - [`parse`] - conventional-commit header, body and footer parsing
//! - [`classify`] - allow-list filtering, trigger lookup, revert cancellation

pub mod classify;
pub mod expand;
pub mod parse;

use serde::{Deserialize, Serialize};

/// A commit as supplied by the history provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawCommit {
    /// Full commit hash.
    pub hash: String,
    /// First line of the message.
    #[serde(default)]
    pub header: String,
    /// Everything after the header.
    #[serde(default)]
    pub body: String,
    /// The complete message.
    #[serde(default)]
    pub message: String,
}

impl RawCommit {
    /// Build a raw commit from a full message, splitting header and body.
    pub fn from_message(hash: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let (header, body) = message
            .split_once('\n')
            .map_or((message.as_str(), ""), |(h, b)| (h, b));
        let (header, body) = (header.trim().to_string(), body.trim().to_string());
        Self {
            hash: hash.into(),
            header,
            body,
            message,
        }
    }

    /// The full message, rebuilt from header and body when absent.
    pub fn full_message(&self) -> String {
        if !self.message.trim().is_empty() {
            return self.message.clone();
        }
        if self.body.trim().is_empty() {
            self.header.clone()
        } else {
            format!("{}\n\n{}", self.header, self.body)
        }
    }
}

/// One message unit fed to the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkingCommitEntry {
    /// Hash of the originating raw commit.
    pub hash: String,
    /// Message text with nested blocks removed.
    pub message: String,
    /// Produced from an override/append block rather than a real commit.
    pub is_virtual: bool,
    /// Replaced by an override block; never classified into the retained set.
    pub is_ignored: bool,
}

/// A footer note such as `BREAKING CHANGE: ...` or `Release-As: 2.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Note keyword; breaking keywords are normalized to `BREAKING CHANGE`.
    pub title: String,
    /// Note text, including continuation lines.
    pub text: String,
}

impl Note {
    /// Title used for breaking-change notes.
    pub const BREAKING: &'static str = "BREAKING CHANGE";

    /// Whether this note marks a breaking change.
    pub fn is_breaking(&self) -> bool {
        self.title == Self::BREAKING
    }
}

/// What a revert commit undoes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevertRef {
    /// Header of the reverted commit.
    pub header: String,
    /// Hash (or hash prefix) of the reverted commit, when stated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// A parsed conventional commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommit {
    /// Hash of the originating raw commit.
    pub hash: String,
    /// Lowercased commit type; empty when the header is not conventional.
    #[serde(rename = "type")]
    pub commit_type: String,
    /// Scope inside the parentheses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Text after `: `.
    pub subject: String,
    /// The header line.
    pub header: String,
    /// Paragraphs between header and footer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Footer block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    /// Recognized footer notes.
    pub notes: Vec<Note>,
    /// Header `!` marker or a breaking note.
    pub is_breaking: bool,
    /// Produced from an override/append block.
    pub is_virtual: bool,
    /// Set when the message follows the revert grammar.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revert: Option<RevertRef>,
}

impl ResolvedCommit {
    /// A minimal commit with a type and subject.
    #[cfg(test)]
    pub(crate) fn synthetic(commit_type: &str, subject: &str, is_breaking: bool) -> Self {
        let bang = if is_breaking { "!" } else { "" };
        let header = format!("{commit_type}{bang}: {subject}");
        let notes = if is_breaking {
            vec![Note {
                title: Note::BREAKING.to_string(),
                text: subject.to_string(),
            }]
        } else {
            Vec::new()
        };
        Self {
            hash: String::new(),
            commit_type: commit_type.to_string(),
            scope: None,
            subject: subject.to_string(),
            header,
            body: None,
            footer: None,
            notes,
            is_breaking,
            is_virtual: false,
            revert: None,
        }
    }
}
