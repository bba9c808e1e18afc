//! Bump and extension strategy types.
//!
//! These are pure data: the configuration layer deserializes them and the
//! engine reads them. Closed enums stand in for every string-valued policy
//! so that dispatch is an exhaustive `match`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::CoreField;

/// One entry of the commit-type allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitTypeDefinition {
    /// The commit type token (`feat`, `fix`, ...).
    #[serde(rename = "type")]
    pub commit_type: String,
    /// Changelog section heading, if the type is rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Whether the type is hidden from rendered changelogs.
    #[serde(default)]
    pub hidden: bool,
}

impl CommitTypeDefinition {
    /// A visible type with a changelog section.
    pub fn visible(commit_type: &str, section: &str) -> Self {
        Self {
            commit_type: commit_type.to_string(),
            section: Some(section.to_string()),
            hidden: false,
        }
    }

    /// A hidden type.
    pub fn hidden(commit_type: &str) -> Self {
        Self {
            commit_type: commit_type.to_string(),
            section: None,
            hidden: true,
        }
    }
}

/// The conventional-changelog default type list.
pub fn default_commit_types() -> Vec<CommitTypeDefinition> {
    vec![
        CommitTypeDefinition::visible("feat", "Features"),
        CommitTypeDefinition::visible("fix", "Bug Fixes"),
        CommitTypeDefinition::visible("perf", "Performance Improvements"),
        CommitTypeDefinition::visible("revert", "Reverts"),
        CommitTypeDefinition::hidden("docs"),
        CommitTypeDefinition::hidden("style"),
        CommitTypeDefinition::hidden("chore"),
        CommitTypeDefinition::hidden("refactor"),
        CommitTypeDefinition::hidden("test"),
        CommitTypeDefinition::hidden("build"),
        CommitTypeDefinition::hidden("ci"),
    ]
}

/// How a breaking commit is accounted for by a [`BumpRule`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakingPolicy {
    /// Breaking status is ignored; the commit is matched by type only.
    #[default]
    None,
    /// A breaking commit counts as one qualifying commit.
    Commit,
    /// A breaking commit forces one bump on its own.
    Bump,
}

impl fmt::Display for BreakingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Commit => write!(f, "commit"),
            Self::Bump => write!(f, "bump"),
        }
    }
}

/// Number of qualifying commits per additional bump.
///
/// Serialized as an integer or the string `"infinite"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "CommitsPerBumpRepr", into = "CommitsPerBumpRepr")]
pub enum CommitsPerBump {
    /// Every `n` commits past the first add one bump.
    Every(i64),
    /// Any number of qualifying commits yields exactly one bump.
    Infinite,
}

impl Default for CommitsPerBump {
    fn default() -> Self {
        Self::Every(1)
    }
}

impl fmt::Display for CommitsPerBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Every(n) => write!(f, "{n}"),
            Self::Infinite => write!(f, "infinite"),
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum CommitsPerBumpRepr {
    Count(i64),
    Keyword(String),
}

impl TryFrom<CommitsPerBumpRepr> for CommitsPerBump {
    type Error = String;

    fn try_from(repr: CommitsPerBumpRepr) -> Result<Self, Self::Error> {
        match repr {
            CommitsPerBumpRepr::Count(n) => Ok(Self::Every(n)),
            CommitsPerBumpRepr::Keyword(s) if s.eq_ignore_ascii_case("infinite") => {
                Ok(Self::Infinite)
            }
            CommitsPerBumpRepr::Keyword(s) => s
                .trim()
                .parse::<i64>()
                .map(Self::Every)
                .map_err(|_| format!("commits_per_bump must be an integer or \"infinite\", got {s:?}")),
        }
    }
}

impl From<CommitsPerBump> for CommitsPerBumpRepr {
    fn from(value: CommitsPerBump) -> Self {
        match value {
            CommitsPerBump::Every(n) => Self::Count(n),
            CommitsPerBump::Infinite => Self::Keyword("infinite".to_string()),
        }
    }
}

/// Bump accounting rule for a single core field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BumpRule {
    /// Commit types that count toward this field.
    pub types: Vec<String>,
    /// How breaking commits are counted.
    pub count_breaking_as: BreakingPolicy,
    /// Qualifying commits per additional bump.
    pub commits_per_bump: CommitsPerBump,
}

impl BumpRule {
    fn new(types: &[&str], count_breaking_as: BreakingPolicy, commits_per_bump: CommitsPerBump) -> Self {
        Self {
            types: types.iter().map(|t| (*t).to_string()).collect(),
            count_breaking_as,
            commits_per_bump,
        }
    }
}

/// Full bump strategy: one rule per core field, pre-stable redirection
/// switches, and the two extension fields.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BumpStrategy {
    /// Rule for the major field.
    pub major: BumpRule,
    /// Rule for the minor field.
    pub minor: BumpRule,
    /// Rule for the patch field.
    pub patch: BumpRule,
    /// While `major == 0`, turn major bumps into minor bumps.
    pub bump_minor_for_major_pre_stable: bool,
    /// While `major == 0`, turn minor bumps into patch bumps.
    pub bump_patch_for_minor_pre_stable: bool,
    /// Prerelease identifier strategy.
    pub prerelease: ExtensionStrategy,
    /// Build metadata identifier strategy.
    pub build: ExtensionStrategy,
}

impl Default for BumpStrategy {
    fn default() -> Self {
        Self {
            major: BumpRule::new(&[], BreakingPolicy::Commit, CommitsPerBump::Infinite),
            minor: BumpRule::new(&["feat"], BreakingPolicy::None, CommitsPerBump::Every(1)),
            patch: BumpRule::new(&["fix", "perf"], BreakingPolicy::None, CommitsPerBump::Every(1)),
            bump_minor_for_major_pre_stable: false,
            bump_patch_for_minor_pre_stable: false,
            prerelease: ExtensionStrategy::default(),
            build: ExtensionStrategy::default(),
        }
    }
}

impl BumpStrategy {
    /// The rule for a given core field.
    pub const fn rule(&self, field: CoreField) -> &BumpRule {
        match field {
            CoreField::Major => &self.major,
            CoreField::Minor => &self.minor,
            CoreField::Patch => &self.patch,
        }
    }
}

/// Strategy for one extension field (prerelease or build).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionStrategy {
    /// When `false`, the field is always empty.
    pub enabled: bool,
    /// Verbatim identifiers that bypass item resolution when non-empty.
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_values: Option<Vec<Literal>>,
    /// Ordered item specs; position matches the previous version's identifiers.
    pub items: Vec<ExtensionItemSpec>,
}

/// A literal identifier value from configuration (string or integer).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Literal {
    /// Integer literal.
    Number(i64),
    /// String literal.
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Unit for timestamp identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    /// Milliseconds since the Unix epoch.
    #[default]
    Ms,
    /// Seconds since the Unix epoch.
    S,
}

/// Supported date identifier patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DateFormat {
    /// `20240131`
    #[default]
    #[serde(rename = "yyyyMMdd")]
    Compact,
    /// `2024-01-31`
    #[serde(rename = "yyyy-MM-dd")]
    Dashed,
}

impl DateFormat {
    /// The `chrono` format string for this pattern.
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::Compact => "%Y%m%d",
            Self::Dashed => "%Y-%m-%d",
        }
    }
}

/// Field changes that reset an incremental identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetOn {
    /// Never reset on core changes.
    None,
    /// Reset when the major field is part of the reset set.
    Major,
    /// Reset when the minor field is part of the reset set.
    Minor,
    /// Reset when the patch field is part of the reset set.
    Patch,
}

impl ResetOn {
    /// The core field this entry names, if any.
    pub const fn field(self) -> Option<CoreField> {
        match self {
            Self::None => None,
            Self::Major => Some(CoreField::Major),
            Self::Minor => Some(CoreField::Minor),
            Self::Patch => Some(CoreField::Patch),
        }
    }
}

fn default_expression() -> String {
    "v+1".to_string()
}

/// One positional item of an extension identifier list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtensionItemSpec {
    /// A fixed identifier.
    Static {
        /// The identifier.
        value: Literal,
    },
    /// A caller-supplied identifier with an optional fallback.
    Dynamic {
        /// The supplied value.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        /// Used when `value` is absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
    /// A counter derived from the previous identifier at this position.
    Incremental {
        /// Value used on reset or when the previous value is unusable.
        #[serde(default)]
        initial_value: i64,
        /// Next-value expression over `v` and `vars`.
        #[serde(default = "default_expression")]
        expression: String,
        /// Extra variables available to the expression.
        #[serde(default)]
        vars: BTreeMap<String, f64>,
        /// Core fields whose change resets the counter.
        #[serde(default)]
        reset_on: Vec<ResetOn>,
    },
    /// The run start time as an epoch number.
    Timestamp {
        /// Epoch unit.
        #[serde(default)]
        unit: TimestampUnit,
    },
    /// The run start date in a time zone.
    Date {
        /// Output pattern.
        #[serde(default)]
        format: DateFormat,
        /// IANA zone id; the release-wide zone when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_zone: Option<String>,
    },
}

impl ExtensionItemSpec {
    /// An incremental item with the default `v+1` expression.
    pub fn incremental(initial_value: i64, reset_on: Vec<ResetOn>) -> Self {
        Self::Incremental {
            initial_value,
            expression: default_expression(),
            vars: BTreeMap::new(),
            reset_on,
        }
    }

    /// Short name of the variant, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::Dynamic { .. } => "dynamic",
            Self::Incremental { .. } => "incremental",
            Self::Timestamp { .. } => "timestamp",
            Self::Date { .. } => "date",
        }
    }
}
