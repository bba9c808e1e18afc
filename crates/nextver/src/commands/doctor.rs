//! Doctor command: diagnose configuration and environment.

use clap::Args;
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use nextver_core::config::{self, Config};
use nextver_core::git;

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    repository: RepositoryStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to loaded config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
}

#[derive(Serialize)]
struct RepositoryStatus {
    /// Whether the working directory is inside a git work tree
    inside: bool,
    /// Latest release tag reachable from HEAD
    latest_tag: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: Option<String>,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    value: Option<String>,
    description: &'static str,
}

impl EnvVar {
    fn read(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            value: std::env::var(name).ok(),
            description,
        }
    }
}

impl DoctorReport {
    fn gather(cwd: &camino::Utf8Path, tag_prefix: &str) -> Self {
        let config_file = config::find_project_config(cwd);
        let inside = git::is_inside_repo().unwrap_or(false);
        let latest_tag = if inside {
            git::latest_version_tag(tag_prefix).ok().flatten()
        } else {
            None
        };

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            repository: RepositoryStatus { inside, latest_tag },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: vec![
                    EnvVar::read("XDG_CONFIG_HOME", "Override config directory"),
                    EnvVar::read("XDG_CACHE_HOME", "Override cache directory"),
                    EnvVar::read("XDG_DATA_HOME", "Override data directory"),
                    EnvVar::read("RUST_LOG", "Log filter directive"),
                    EnvVar::read("NEXTVER_LOG_PATH", "Explicit log file path"),
                    EnvVar::read("NEXTVER_LOG_DIR", "Log directory"),
                ],
            },
        }
    }
}

/// Run diagnostics and report configuration status.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let report = DoctorReport::gather(cwd, &config.tag_prefix);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    println!();

    println!("{}", "Repository".bold().underline());
    if report.repository.inside {
        println!("  {} Inside a git work tree", "✓".green());
        match report.repository.latest_tag {
            Some(ref tag) => println!("  {} Latest release tag: {}", "✓".green(), tag.cyan()),
            None => println!(
                "  {} No release tag matching {}*; the initial version will be used",
                "○".yellow(),
                config.tag_prefix
            ),
        }
    } else {
        println!("  {} Not a git repository", "✗".red());
    }
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Cache", report.directories.cache.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());

    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();

    if set_vars.is_empty() {
        println!("  {} No XDG/logging overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan()
            );
        }
    }

    Ok(())
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");

    // Don't prompt if running non-interactively
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    if let Ok(true) = create {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;

        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cwd() -> camino::Utf8PathBuf {
        camino::Utf8PathBuf::from("/tmp")
    }

    #[test]
    fn test_cmd_doctor_text_succeeds() {
        assert!(cmd_doctor(DoctorArgs::default(), false, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_cmd_doctor_json_succeeds() {
        assert!(cmd_doctor(DoctorArgs::default(), true, &Config::default(), &test_cwd()).is_ok());
    }

    #[test]
    fn test_doctor_report_gathers() {
        let report = DoctorReport::gather(&test_cwd(), "v");
        // On most systems, at least config dir should resolve
        assert!(report.directories.config.is_some() || report.directories.cache.is_some());
        assert!(
            report
                .environment
                .env_vars
                .iter()
                .any(|v| v.name == "NEXTVER_LOG_DIR")
        );
    }
}
