//! Info command: show package information and the effective release configuration.

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nextver_core::config::{self, Config};
use nextver_core::strategy::{BumpRule, ExtensionStrategy};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    homepage: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            homepage: env!("CARGO_PKG_HOMEPAGE"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    tag_prefix: String,
    initial_version: String,
    time_zone: String,
    allow_release_as: Vec<String>,
    /// Types that count toward bumps; hidden ones included.
    commit_types: Vec<String>,
}

impl ConfigInfo {
    fn from_config(config: &Config, cwd: &camino::Utf8Path) -> Self {
        Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            tag_prefix: config.tag_prefix.clone(),
            initial_version: config.initial_version.clone(),
            time_zone: config.time_zone.clone(),
            allow_release_as: config.allow_release_as.clone(),
            commit_types: config
                .commit_types
                .iter()
                .map(|t| t.commit_type.clone())
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct RuleSummary {
    types: Vec<String>,
    count_breaking_as: String,
    commits_per_bump: String,
}

impl From<&BumpRule> for RuleSummary {
    fn from(rule: &BumpRule) -> Self {
        Self {
            types: rule.types.clone(),
            count_breaking_as: rule.count_breaking_as.to_string(),
            commits_per_bump: rule.commits_per_bump.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ExtensionSummary {
    enabled: bool,
    overridden: bool,
    items: Vec<&'static str>,
}

impl From<&ExtensionStrategy> for ExtensionSummary {
    fn from(ext: &ExtensionStrategy) -> Self {
        Self {
            enabled: ext.enabled,
            overridden: ext.override_values.is_some(),
            items: ext.items.iter().map(|item| item.kind()).collect(),
        }
    }
}

#[derive(Serialize)]
struct StrategyInfo {
    major: RuleSummary,
    minor: RuleSummary,
    patch: RuleSummary,
    bump_minor_for_major_pre_stable: bool,
    bump_patch_for_minor_pre_stable: bool,
    prerelease: ExtensionSummary,
    build: ExtensionSummary,
}

impl StrategyInfo {
    fn from_config(config: &Config) -> Self {
        let bump = &config.bump;
        Self {
            major: (&bump.major).into(),
            minor: (&bump.minor).into(),
            patch: (&bump.patch).into(),
            bump_minor_for_major_pre_stable: bump.bump_minor_for_major_pre_stable,
            bump_patch_for_minor_pre_stable: bump.bump_patch_for_minor_pre_stable,
            prerelease: (&bump.prerelease).into(),
            build: (&bump.build).into(),
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
    strategy: StrategyInfo,
}

fn print_rule(label: &str, rule: &RuleSummary) {
    let types = if rule.types.is_empty() {
        "(none)".to_string()
    } else {
        rule.types.join(", ")
    };
    println!(
        "  {}: {} {}",
        label.dimmed(),
        types.cyan(),
        format!(
            "(breaking: {}, per bump: {})",
            rule.count_breaking_as, rule.commits_per_bump
        )
        .dimmed()
    );
}

fn print_extension(label: &str, ext: &ExtensionSummary) {
    if !ext.enabled {
        println!("  {}: {}", label.dimmed(), "disabled".yellow());
    } else if ext.overridden {
        println!("  {}: {}", label.dimmed(), "override".cyan());
    } else {
        println!("  {}: [{}]", label.dimmed(), ext.items.join(", ").cyan());
    }
}

/// Print package information and the effective configuration.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory for config discovery
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, cwd),
        strategy: StrategyInfo::from_config(config),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    println!(
        "{} {}",
        full_info.package.name.bold(),
        full_info.package.version.green()
    );
    if !full_info.package.description.is_empty() {
        println!("{}", full_info.package.description);
    }
    if !full_info.package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), full_info.package.license);
    }
    if !full_info.package.repository.is_empty() {
        println!(
            "{}: {}",
            "Repository".dimmed(),
            full_info.package.repository.cyan()
        );
    }

    let cfg = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    if let Some(ref path) = cfg.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none loaded".yellow());
    }
    println!("{}: {}", "Log level".dimmed(), cfg.log_level);
    if let Some(ref dir) = cfg.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    println!("{}: {}", "Tag prefix".dimmed(), cfg.tag_prefix.cyan());
    println!("{}: {}", "Initial version".dimmed(), cfg.initial_version.cyan());
    println!("{}: {}", "Time zone".dimmed(), cfg.time_zone.cyan());
    println!(
        "{}: {}",
        "Release-As allowed for".dimmed(),
        cfg.allow_release_as.join(", ").cyan()
    );
    println!(
        "{}: {}",
        "Commit types".dimmed(),
        cfg.commit_types.join(", ")
    );

    let strategy = &full_info.strategy;
    println!();
    println!("{}", "Bump Strategy".bold().underline());
    print_rule("Major", &strategy.major);
    print_rule("Minor", &strategy.minor);
    print_rule("Patch", &strategy.patch);
    if strategy.bump_minor_for_major_pre_stable {
        println!("  {} major → minor before 1.0.0", "•".dimmed());
    }
    if strategy.bump_patch_for_minor_pre_stable {
        println!("  {} minor → patch before 1.0.0", "•".dimmed());
    }
    print_extension("Prerelease", &strategy.prerelease);
    print_extension("Build", &strategy.build);

    Ok(())
}
