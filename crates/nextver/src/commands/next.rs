//! Next command: thin CLI layer over `nextver_core::engine`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nextver_core::commit::{RawCommit, ResolvedCommit};
use nextver_core::config::Config;
use nextver_core::engine::{self, EngineInput, Resolution, ResolutionPath};
use nextver_core::version::calculate::BumpCounts;
use nextver_core::{SemVer, git};

/// Arguments for the `next` subcommand.
#[derive(Args, Debug, Default)]
pub struct NextArgs {
    /// Read commits from a JSON file instead of git (array of {hash, header, body, message})
    #[arg(long, value_name = "FILE")]
    pub commits: Option<PathBuf>,

    /// Hash of the commit that triggered the release (default: HEAD, or the first commit in --commits)
    #[arg(long, value_name = "HASH")]
    pub trigger: Option<String>,

    /// Previous version (default: derived from the latest release tag)
    #[arg(long, value_name = "VERSION")]
    pub previous: Option<String>,

    /// Fixed start time for date/timestamp identifiers (RFC 3339; default: now)
    #[arg(long, value_name = "TIME", value_parser = parse_start_time)]
    pub at: Option<DateTime<Utc>>,
}

fn parse_start_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

#[derive(Serialize)]
struct NextReport {
    version: String,
    tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_tag: Option<String>,
    path: ResolutionPath,
    bumps: BumpCounts,
    commits: Vec<ResolvedCommit>,
}

impl NextReport {
    fn new(
        resolution: Resolution,
        previous: Option<&SemVer>,
        previous_tag: Option<String>,
        tag_prefix: &str,
    ) -> Self {
        Self {
            tag: format!("{tag_prefix}{}", resolution.version),
            version: resolution.version.to_string(),
            previous: previous.map(ToString::to_string),
            previous_tag,
            path: resolution.path,
            bumps: resolution.bumps,
            commits: resolution.commits,
        }
    }
}

fn read_commits(path: &Path) -> anyhow::Result<Vec<RawCommit>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of commits", path.display()))
}

struct Source {
    commits: Vec<RawCommit>,
    trigger_hash: String,
    previous: Option<SemVer>,
    previous_tag: Option<String>,
}

fn gather(args: &NextArgs, config: &Config) -> anyhow::Result<Source> {
    let explicit_previous = args
        .previous
        .as_deref()
        .map(SemVer::parse)
        .transpose()
        .context("invalid --previous version")?;

    if let Some(ref path) = args.commits {
        let commits = read_commits(path)?;
        let trigger_hash = commits.first().map(|c| c.hash.clone()).unwrap_or_default();
        debug!(count = commits.len(), file = %path.display(), "commits from file");
        return Ok(Source {
            commits,
            trigger_hash,
            previous: explicit_previous,
            previous_tag: None,
        });
    }

    let history = git::collect_history(&config.tag_prefix).context("failed to read git history")?;
    Ok(Source {
        commits: history.commits,
        trigger_hash: history.trigger_hash,
        previous: explicit_previous.or(history.previous_version),
        previous_tag: history.previous_tag,
    })
}

/// Execute the next command.
#[instrument(name = "cmd_next", skip_all, fields(json_output))]
pub fn cmd_next(args: NextArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing next command");

    let source = gather(&args, config)?;
    let input = EngineInput {
        raw_commits: source.commits,
        trigger_hash: args.trigger.unwrap_or(source.trigger_hash),
        previous: source.previous,
        start_time: args.at.unwrap_or_else(Utc::now),
    };

    let resolution =
        engine::resolve(&config.release_settings(), &input).context("version resolution failed")?;
    let report = NextReport::new(
        resolution,
        input.previous.as_ref(),
        source.previous_tag,
        &config.tag_prefix,
    );

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let previous = report.previous.as_deref().unwrap_or("none");
    println!(
        "{}: {} → {}",
        "Version".bold(),
        previous.dimmed(),
        report.version.green().bold()
    );
    println!("{}: {}", "Tag".dimmed(), report.tag.cyan());
    println!("{}: {}", "Resolved by".dimmed(), report.path);
    if report.path == ResolutionPath::Computed {
        println!(
            "{}: major {}, minor {}, patch {}",
            "Bumps".dimmed(),
            report.bumps.major,
            report.bumps.minor,
            report.bumps.patch
        );
    }

    if !report.commits.is_empty() {
        println!();
        println!("{}", "Counted commits".bold().underline());
        for commit in &report.commits {
            let short = commit.hash.get(..7).unwrap_or(&commit.hash);
            let marker = if commit.is_breaking { "!" } else { " " };
            println!(
                "  {} {}{} {}",
                short.dimmed(),
                marker.red(),
                commit.commit_type.cyan(),
                commit.subject
            );
        }
    }

    Ok(())
}
