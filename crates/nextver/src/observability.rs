//! Logging for the CLI: JSON lines through a daily-rolled file.
//!
//! stdout carries the computed version, so nothing in here writes to it. When
//! no log file can be opened, lines go to stderr instead.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use camino::Utf8Path;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

const SERVICE: &str = env!("CARGO_PKG_NAME");
const LOG_PATH_VAR: &str = "NEXTVER_LOG_PATH";
const LOG_DIR_VAR: &str = "NEXTVER_LOG_DIR";

/// Keeps the background log writer alive; drop it last to flush.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Filter for the log layer.
///
/// `--quiet` wins over `-v`/`-vv`, which win over `RUST_LOG`, which wins over
/// the configured `log_level`.
pub fn env_filter(quiet: bool, verbose: u8, configured: &str) -> EnvFilter {
    match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
        }
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init(filter: EnvFilter, config_log_dir: Option<&Utf8Path>) -> anyhow::Result<LogGuard> {
    let sources = LogSources::from_env(config_log_dir.map(|dir| dir.as_std_path().to_path_buf()));
    let (writer, worker) = match sources.resolve() {
        Ok(file) => tracing_appender::non_blocking(tracing_appender::rolling::daily(
            &file.dir,
            &file.name,
        )),
        Err(err) => {
            eprintln!("warning: {err:#}; logging to stderr");
            tracing_appender::non_blocking(std::io::stderr())
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(JsonLines::new(writer))
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(LogGuard { _worker: worker })
}

/// Where log lines may go, highest priority first.
#[derive(Debug, Default)]
struct LogSources {
    path: Option<PathBuf>,
    dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    fallback_dirs: Vec<PathBuf>,
}

/// A log file, as the directory plus the base name the roller dates.
#[derive(Debug, PartialEq, Eq)]
struct LogFile {
    dir: PathBuf,
    name: String,
}

impl LogSources {
    fn from_env(config_dir: Option<PathBuf>) -> Self {
        let mut fallback_dirs = Vec::new();
        if let Some(data) = nextver_core::config::user_data_local_dir() {
            fallback_dirs.push(data.into_std_path_buf().join("logs"));
        }
        if let Ok(cwd) = std::env::current_dir() {
            fallback_dirs.push(cwd);
        }
        Self {
            path: std::env::var_os(LOG_PATH_VAR).map(PathBuf::from),
            dir: std::env::var_os(LOG_DIR_VAR).map(PathBuf::from),
            config_dir,
            fallback_dirs,
        }
    }

    /// An explicit path, env dir or config dir must be usable; platform
    /// candidates are tried in turn.
    fn resolve(self) -> anyhow::Result<LogFile> {
        if let Some(path) = self.path {
            return LogFile::at_path(&path);
        }
        if let Some(dir) = self.dir.or(self.config_dir) {
            return LogFile::in_dir(dir);
        }
        self.fallback_dirs
            .into_iter()
            .find_map(|dir| LogFile::in_dir(dir).ok())
            .context("no writable log directory")
    }
}

impl LogFile {
    fn in_dir(dir: PathBuf) -> anyhow::Result<Self> {
        let file = Self {
            dir,
            name: format!("{SERVICE}.jsonl"),
        };
        file.touch()?;
        Ok(file)
    }

    fn at_path(path: &Path) -> anyhow::Result<Self> {
        let Some(name) = path.file_name() else {
            bail!("{LOG_PATH_VAR} has no file name: {}", path.display());
        };
        let Some(name) = name.to_str() else {
            bail!("{LOG_PATH_VAR} file name is not UTF-8: {}", path.display());
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file = Self {
            dir,
            name: name.to_string(),
        };
        file.touch()?;
        Ok(file)
    }

    fn touch(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create log directory {}", self.dir.display()))?;
        let path = self.dir.join(&self.name);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        Ok(())
    }
}

/// One JSON object per event: time, level, service, target, the enclosing
/// span names and every span and event field.
struct JsonLines<W> {
    writer: W,
}

impl<W> JsonLines<W> {
    const fn new(writer: W) -> Self {
        Self { writer }
    }
}

/// Fields recorded when a span opens.
struct SpanFields(Map<String, Value>);

impl<S, W> Layer<S> for JsonLines<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut fields = FieldMap::default();
            attrs.record(&mut fields);
            span.extensions_mut().insert(SpanFields(fields.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut line = Map::new();
        line.insert(
            "timestamp".into(),
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
                .into(),
        );
        line.insert("level".into(), meta.level().as_str().to_lowercase().into());
        line.insert("service".into(), SERVICE.into());
        line.insert("target".into(), meta.target().into());

        let mut spans = Vec::new();
        for span in ctx.event_scope(event).into_iter().flat_map(|s| s.from_root()) {
            spans.push(Value::from(span.name()));
            if let Some(SpanFields(fields)) = span.extensions().get::<SpanFields>() {
                line.extend(fields.clone());
            }
        }
        if !spans.is_empty() {
            line.insert("spans".into(), Value::Array(spans));
        }

        let mut fields = FieldMap::default();
        event.record(&mut fields);
        line.extend(fields.0);

        let mut out = self.writer.make_writer();
        if serde_json::to_writer(&mut out, &Value::Object(line)).is_ok() {
            let _ = out.write_all(b"\n");
        }
    }
}

#[derive(Default)]
struct FieldMap(Map<String, Value>);

impl FieldMap {
    fn put(&mut self, field: &Field, value: impl Into<Value>) {
        self.0.insert(field.name().to_string(), value.into());
    }
}

impl Visit for FieldMap {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn sources(tmp: &TempDir) -> LogSources {
        LogSources {
            fallback_dirs: vec![tmp.path().join("fallback")],
            ..LogSources::default()
        }
    }

    #[test]
    fn quiet_beats_verbose() {
        assert_eq!(env_filter(true, 2, "info").to_string(), "error");
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(env_filter(false, 1, "warn").to_string(), "debug");
        assert_eq!(env_filter(false, 3, "warn").to_string(), "trace");
    }

    #[test]
    fn explicit_path_wins_over_dirs() {
        let tmp = TempDir::new().unwrap();
        let resolved = LogSources {
            path: Some(tmp.path().join("explicit/run.log")),
            dir: Some(tmp.path().join("env")),
            config_dir: Some(tmp.path().join("config")),
            ..sources(&tmp)
        }
        .resolve()
        .unwrap();
        assert_eq!(
            resolved,
            LogFile {
                dir: tmp.path().join("explicit"),
                name: "run.log".into(),
            }
        );
        assert!(tmp.path().join("explicit/run.log").exists());
    }

    #[test]
    fn env_dir_wins_over_config_dir() {
        let tmp = TempDir::new().unwrap();
        let resolved = LogSources {
            dir: Some(tmp.path().join("env")),
            config_dir: Some(tmp.path().join("config")),
            ..sources(&tmp)
        }
        .resolve()
        .unwrap();
        assert_eq!(resolved.dir, tmp.path().join("env"));
        assert_eq!(resolved.name, "nextver.jsonl");
    }

    #[test]
    fn config_dir_wins_over_fallbacks() {
        let tmp = TempDir::new().unwrap();
        let resolved = LogSources {
            config_dir: Some(tmp.path().join("config")),
            ..sources(&tmp)
        }
        .resolve()
        .unwrap();
        assert_eq!(resolved.dir, tmp.path().join("config"));
    }

    #[test]
    fn unusable_fallback_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let resolved = LogSources {
            fallback_dirs: vec![blocker, tmp.path().join("second")],
            ..LogSources::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(resolved.dir, tmp.path().join("second"));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = LogSources {
            path: Some(PathBuf::from("/")),
            ..sources(&tmp)
        }
        .resolve()
        .unwrap_err();
        assert!(err.to_string().contains(LOG_PATH_VAR));
    }

    #[test]
    fn no_usable_target_is_an_error() {
        assert!(LogSources::default().resolve().is_err());
    }

    #[test]
    fn events_are_json_lines_with_span_context() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry()
            .with(JsonLines::new(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("cmd_next", previous = "1.0.0");
            let _entered = span.enter();
            tracing::info!(count = 3_u64, breaking = true, "commits classified");
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["level"], "info");
        assert_eq!(line["service"], "nextver");
        assert_eq!(line["message"], "commits classified");
        assert_eq!(line["count"], 3);
        assert_eq!(line["breaking"], true);
        assert_eq!(line["previous"], "1.0.0");
        assert_eq!(line["spans"], serde_json::json!(["cmd_next"]));
        let ts = line["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(ts.ends_with('Z'));
    }
}
