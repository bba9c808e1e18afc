//! Prerelease and build identifier resolution.
//!
//! Items are resolved by position against the previous version's
//! identifiers. The first position where the previous identifier is
//! missing or does not fit its spec flags a structural change, and every
//! incremental item from there on restarts at its initial value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument};

use crate::engine::{EngineError, EngineResult};
use crate::strategy::{ExtensionItemSpec, ExtensionStrategy, ResetOn, TimestampUnit};
use crate::version::expr::evaluate;

/// Run-wide inputs shared by both extension fields.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext {
    /// Fixed start time of the run.
    pub start_time: DateTime<Utc>,
    /// Zone for date items without their own.
    pub time_zone: Tz,
    /// Whether the core triple changed in this run.
    pub core_changed: bool,
}

/// Parse an IANA zone id.
pub fn parse_time_zone(id: &str) -> EngineResult<Tz> {
    id.parse::<Tz>()
        .map_err(|_| EngineError::InvalidTimeZone(id.to_string()))
}

fn numeric(previous: &str) -> Option<f64> {
    previous.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn is_structural_change(spec: &ExtensionItemSpec, previous: Option<&str>) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    match spec {
        ExtensionItemSpec::Static { value } => previous != value.to_string(),
        ExtensionItemSpec::Incremental { .. } => numeric(previous).is_none(),
        ExtensionItemSpec::Dynamic { .. }
        | ExtensionItemSpec::Timestamp { .. }
        | ExtensionItemSpec::Date { .. } => false,
    }
}

fn format_integer(value: f64) -> String {
    (value.floor() as i64).to_string()
}

fn next_incremental(
    initial_value: i64,
    expression: &str,
    vars: &BTreeMap<String, f64>,
    previous: Option<&str>,
) -> String {
    let v = previous.and_then(numeric).unwrap_or(initial_value as f64);

    let mut scope = vars.clone();
    scope.insert("v".to_string(), v);
    match evaluate(expression, &scope) {
        Ok(next) => format_integer(next),
        Err(e) => {
            debug!(%expression, error = %e, "expression failed, using initial value");
            initial_value.to_string()
        }
    }
}

fn should_reset(reset_on: &[ResetOn], structural: bool, core_changed: bool) -> bool {
    structural || (core_changed && reset_on.iter().any(|r| r.field().is_some()))
}

fn resolve_item(
    spec: &ExtensionItemSpec,
    previous: Option<&str>,
    structural: bool,
    ctx: &ExtensionContext,
) -> EngineResult<String> {
    let value = match spec {
        ExtensionItemSpec::Static { value } => value.to_string(),
        ExtensionItemSpec::Dynamic { value, fallback } => value
            .as_deref()
            .or(fallback.as_deref())
            .unwrap_or_default()
            .to_string(),
        ExtensionItemSpec::Date { format, time_zone } => {
            let tz = match time_zone {
                Some(id) => parse_time_zone(id)?,
                None => ctx.time_zone,
            };
            ctx.start_time
                .with_timezone(&tz)
                .format(format.pattern())
                .to_string()
        }
        ExtensionItemSpec::Timestamp { unit } => match unit {
            TimestampUnit::Ms => ctx.start_time.timestamp_millis().to_string(),
            TimestampUnit::S => ctx.start_time.timestamp().to_string(),
        },
        ExtensionItemSpec::Incremental {
            initial_value,
            expression,
            vars,
            reset_on,
        } => {
            if should_reset(reset_on, structural, ctx.core_changed) {
                initial_value.to_string()
            } else {
                next_incremental(*initial_value, expression, vars, previous)
            }
        }
    };
    Ok(value)
}

/// Resolve one extension field.
///
/// # Errors
///
/// Returns [`EngineError::InvalidTimeZone`] for a date item with an
/// unknown zone.
#[instrument(skip_all, fields(items = strategy.items.len(), previous = previous.len()))]
pub fn resolve_extension(
    strategy: &ExtensionStrategy,
    previous: &[String],
    ctx: &ExtensionContext,
) -> EngineResult<Vec<String>> {
    if !strategy.enabled {
        return Ok(Vec::new());
    }
    if let Some(values) = strategy.override_values.as_ref().filter(|v| !v.is_empty()) {
        debug!(count = values.len(), "using override identifiers");
        return Ok(values.iter().map(ToString::to_string).collect());
    }

    let mut structural = false;
    let mut resolved = Vec::with_capacity(strategy.items.len());
    for (i, spec) in strategy.items.iter().enumerate() {
        let prev = previous.get(i).map(String::as_str);
        if !structural && is_structural_change(spec, prev) {
            debug!(index = i, kind = spec.kind(), ?prev, "structural change");
            structural = true;
        }
        resolved.push(resolve_item(spec, prev, structural, ctx)?);
    }
    Ok(resolved)
}
