pub mod adjust;
pub mod admin;
pub mod chore;
pub mod config;
pub mod gamification;
pub mod kid;
pub mod reward;

use chrono::{DateTime, NaiveDate, Utc};
use kidschores_core::{Coordinator, EntityKind, Report};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn open() -> Result<Coordinator, Box<dyn std::error::Error>> {
    Ok(Coordinator::open_default()?)
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the report and warn when the save did not go through.
pub fn print_report(report: &Report) -> CmdResult {
    if report.is_degraded() {
        eprintln!("warning: changes are kept in memory only; storage could not be written");
    }
    print_json(report)
}

/// Resolve a list of kid names (or IDs) to IDs.
pub fn kid_ids(coordinator: &Coordinator, names: &[String]) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    names
        .iter()
        .map(|n| Ok(coordinator.resolve(EntityKind::Kid, n)?))
        .collect()
}

/// RFC 3339 timestamp, or a plain date meaning local midnight in UTC.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{s}' (expected RFC 3339 or YYYY-MM-DD)"))
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}

/// Parse a snake_case enum value the way it is stored (`shared_first`,
/// `at_midnight_once`, ...). Dashes are accepted in place of underscores.
pub fn parse_snake<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, String> {
    let value = serde_json::Value::String(s.replace('-', "_"));
    serde_json::from_value(value).map_err(|_| format!("invalid value '{s}'"))
}
