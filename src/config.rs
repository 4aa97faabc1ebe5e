use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::contest::{ContestOptions, ListingPolicy};
use crate::phase::ContestSchedule;

pub const DEFAULT_SUBMISSION_END: &str = "2025-10-31T18:55:00";
pub const DEFAULT_VOTING_END: &str = "2025-10-31T21:00:00";

pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub schedule: ContestSchedule,
    pub listing: ListingPolicy,
    pub allow_reset: bool,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Read the configuration from the environment. Fails on unparseable
    /// values and on deadlines that leave no voting window.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let submission_end = parse_instant(&try_load_string(&lookup, "SUBMISSION_END", DEFAULT_SUBMISSION_END))
            .context("Invalid SUBMISSION_END")?;
        let voting_end = parse_instant(&try_load_string(&lookup, "VOTING_END", DEFAULT_VOTING_END))
            .context("Invalid VOTING_END")?;
        let schedule = ContestSchedule::new(submission_end, voting_end)?;

        let listing = try_load::<ListingPolicy, _>(&lookup, "ENTRIES_LISTING", "voting")?;

        Ok(Self {
            bind_addr: try_load_string(&lookup, "BIND_ADDR", "0.0.0.0"),
            port: try_load(&lookup, "PORT", "3000")?,
            database_path: try_load_string(&lookup, "DATABASE_PATH", "contest.db").into(),
            upload_dir: try_load_string(&lookup, "UPLOAD_DIR", "uploads").into(),
            static_dir: try_load_string(&lookup, "STATIC_DIR", "public").into(),
            schedule,
            listing,
            allow_reset: try_load(&lookup, "ALLOW_RESET", "false")?,
            max_upload_bytes: try_load(&lookup, "MAX_UPLOAD_BYTES", "10485760")?,
        })
    }

    pub fn contest_options(&self) -> ContestOptions {
        ContestOptions {
            listing: self.listing,
            allow_reset: self.allow_reset,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn try_load_string<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr, F>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = try_load_string(lookup, key, default);
    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("Invalid {key} value '{raw}': {e}")
    })
}

/// `RUST_LOG` when it parses, otherwise `default`
pub fn log_filter(default: &str) -> EnvFilter {
    filter_from(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(), default)
}

fn filter_from(directives: Option<&str>, default: &str) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` in local time
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .with_context(|| format!("'{}' is not an RFC 3339 or local date-time", raw))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("'{}' does not exist in the local time zone", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.database_path, PathBuf::from("contest.db"));
        assert_eq!(config.listing, ListingPolicy::VotingOnly);
        assert!(!config.allow_reset);
        assert!(config.schedule.submission_end() < config.schedule.voting_end());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("SUBMISSION_END", "2025-10-31T18:00:00Z"),
            ("VOTING_END", "2025-10-31T20:00:00-04:00"),
            ("ENTRIES_LISTING", "always"),
            ("ALLOW_RESET", "true"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.schedule.submission_end().to_rfc3339(), "2025-10-31T18:00:00+00:00");
        assert_eq!(config.schedule.voting_end().to_rfc3339(), "2025-11-01T00:00:00+00:00");
        assert_eq!(config.listing, ListingPolicy::Always);
        assert!(config.contest_options().allow_reset);
    }

    #[test]
    fn test_inverted_deadlines_fail_fast() {
        let result = Config::from_lookup(lookup(&[
            ("SUBMISSION_END", "2025-10-31T21:00:00Z"),
            ("VOTING_END", "2025-10-31T18:00:00Z"),
        ]));
        assert!(result.is_err());

        let result = Config::from_lookup(lookup(&[
            ("SUBMISSION_END", "2025-10-31T21:00:00Z"),
            ("VOTING_END", "2025-10-31T21:00:00Z"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_values_fail() {
        assert!(Config::from_lookup(lookup(&[("PORT", "lots")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ALLOW_RESET", "maybe")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ENTRIES_LISTING", "sometimes")])).is_err());
        assert!(Config::from_lookup(lookup(&[("VOTING_END", "Halloween")])).is_err());
    }

    #[test]
    fn test_parse_naive_local_instant() {
        let parsed = parse_instant("2025-10-31T18:55:00").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 10, 31, 18, 55, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_log_filter_prefers_rust_log() {
        use tracing_subscriber::filter::LevelFilter;

        assert_eq!(filter_from(Some("debug"), "info").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(filter_from(None, "info").max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(filter_from(Some("  "), "warn").max_level_hint(), Some(LevelFilter::WARN));
    }
}
