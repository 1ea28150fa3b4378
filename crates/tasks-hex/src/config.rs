//! Environment configuration. Every variable is required; there are no
//! defaults, and a malformed value is an error rather than a fallback.

use std::env;
use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;

pub use tasks_types::config::{ConnectionConfig, DatabaseConfig, PoolConfig};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid duration format: '{raw}': {source}")]
    InvalidDuration {
        key: &'static str,
        raw: String,
        source: DurationError,
    },

    #[error("invalid int format: '{raw}': {source}")]
    InvalidInt {
        key: &'static str,
        raw: String,
        source: ParseIntError,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub read: Duration,
    pub read_header: Duration,
    pub write: Duration,
    pub idle: Duration,
}

impl TimeoutConfig {
    /// Time allowed to read a request's headers. Falls back to the read
    /// timeout when unset; `None` means no limit.
    pub fn header_read_limit(&self) -> Option<Duration> {
        non_zero(self.read_header).or(non_zero(self.read))
    }

    /// Time a kept-alive connection may wait for its next request. Falls back
    /// to the read timeout when unset; `None` means no limit.
    pub fn idle_limit(&self) -> Option<Duration> {
        non_zero(self.idle).or(non_zero(self.read))
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: String,
    pub timeout: TimeoutConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app: AppConfig::from_lookup(&lookup)?,
            database: database_from_lookup(&lookup)?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);
        Ok(Self {
            port: vars.string("APP_PORT")?,
            timeout: TimeoutConfig {
                read: vars.duration("SERVER_READ_TIMEOUT")?,
                read_header: vars.duration("SERVER_READ_HEADER_TIMEOUT")?,
                write: vars.duration("SERVER_WRITE_TIMEOUT")?,
                idle: vars.duration("SERVER_IDLE_TIMEOUT")?,
            },
        })
    }
}

pub fn database_from_env() -> Result<DatabaseConfig, ConfigError> {
    database_from_lookup(|key| env::var(key).ok())
}

pub fn database_from_lookup<F>(lookup: F) -> Result<DatabaseConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let vars = Vars(&lookup);
    let connection = ConnectionConfig {
        host: vars.string("DB_HOST")?,
        port: vars.string("DB_PORT")?,
        user: vars.string("DB_USER")?,
        password: vars.string("DB_PASSWORD")?,
        db_name: vars.string("DB_NAME")?,
        sslmode: vars.string("DB_SSLMODE")?,
    };
    let driver = vars.string("DB_DRIVER")?;
    let pool = PoolConfig {
        max_open_conns: vars.int("DB_MAX_OPEN_CONNS")?,
        max_idle_conns: vars.int("DB_MAX_IDLE_CONNS")?,
        conn_max_lifetime: vars.duration("DB_CONN_MAX_LIFETIME")?,
        conn_max_idle_time: vars.duration("DB_CONN_MAX_IDLE_TIME")?,
    };
    Ok(DatabaseConfig {
        connection,
        driver,
        pool,
    })
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &'static str) -> Result<String, ConfigError> {
        match (self.0)(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ConfigError::Missing(key)),
        }
    }

    fn duration(&self, key: &'static str) -> Result<Duration, ConfigError> {
        let raw = self.string(key)?;
        parse_duration(&raw).map_err(|source| ConfigError::InvalidDuration { key, raw, source })
    }

    fn int(&self, key: &'static str) -> Result<i32, ConfigError> {
        let raw = self.string(key)?;
        raw.parse()
            .map_err(|source| ConfigError::InvalidInt { key, raw, source })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,
    #[error("negative durations are not allowed")]
    Negative,
    #[error("expected a number at byte {0}")]
    ExpectedNumber(usize),
    #[error("missing unit after '{0}'")]
    MissingUnit(String),
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("duration overflows")]
    Overflow,
}

const UNITS: [(&str, u128); 7] = [
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses unit-suffixed durations such as `300ms`, `5s`, `1h30m` or `1.5s`.
/// A bare `0` is accepted; any other number needs a unit.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationError> {
    let s = raw.strip_prefix('+').unwrap_or(raw);
    if s.starts_with('-') {
        return Err(DurationError::Negative);
    }
    if s.is_empty() {
        return Err(DurationError::Empty);
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let bytes = s.as_bytes();
    let mut pos = 0;
    let mut total: u128 = 0;

    while pos < bytes.len() {
        let num_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
            pos += 1;
        }
        let number = &s[num_start..pos];
        if number.is_empty() || number == "." || number.matches('.').count() > 1 {
            return Err(DurationError::ExpectedNumber(num_start));
        }

        let unit_start = pos;
        while pos < bytes.len() && !(bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
            pos += 1;
        }
        let unit = &s[unit_start..pos];
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(number.to_string()));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| DurationError::Overflow)?
        };
        let mut nanos = whole.checked_mul(scale).ok_or(DurationError::Overflow)?;
        if !frac.is_empty() {
            let digits = frac.len().min(18) as u32;
            let frac_value: u128 = frac[..digits as usize]
                .parse()
                .map_err(|_| DurationError::Overflow)?;
            nanos = nanos
                .checked_add(frac_value * scale / 10u128.pow(digits))
                .ok_or(DurationError::Overflow)?;
        }
        total = total.checked_add(nanos).ok_or(DurationError::Overflow)?;
    }

    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| DurationError::Overflow)?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn app_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("APP_PORT", "8080"),
            ("SERVER_READ_TIMEOUT", "2s"),
            ("SERVER_READ_HEADER_TIMEOUT", "3s"),
            ("SERVER_WRITE_TIMEOUT", "4s"),
            ("SERVER_IDLE_TIMEOUT", "5s"),
        ])
    }

    fn db_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DB_HOST", "localhost"),
            ("DB_PORT", "5432"),
            ("DB_USER", "tasks"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "tasks"),
            ("DB_SSLMODE", "disable"),
            ("DB_DRIVER", "postgres"),
            ("DB_MAX_OPEN_CONNS", "25"),
            ("DB_MAX_IDLE_CONNS", "5"),
            ("DB_CONN_MAX_LIFETIME", "5m"),
            ("DB_CONN_MAX_IDLE_TIME", "1m30s"),
        ])
    }

    fn lookup<'a>(
        vars: &'a HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn loads_app_config() {
        let vars = app_vars();
        let cfg = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.port, "8080");
        assert_eq!(cfg.timeout.read, Duration::from_secs(2));
        assert_eq!(cfg.timeout.read_header, Duration::from_secs(3));
        assert_eq!(cfg.timeout.write, Duration::from_secs(4));
        assert_eq!(cfg.timeout.idle, Duration::from_secs(5));
    }

    #[test]
    fn connection_limits_fall_back_to_read_timeout() {
        let mut timeout = TimeoutConfig {
            read: Duration::from_secs(2),
            read_header: Duration::ZERO,
            write: Duration::ZERO,
            idle: Duration::ZERO,
        };
        assert_eq!(timeout.header_read_limit(), Some(Duration::from_secs(2)));
        assert_eq!(timeout.idle_limit(), Some(Duration::from_secs(2)));

        timeout.read_header = Duration::from_millis(500);
        timeout.idle = Duration::from_secs(30);
        assert_eq!(timeout.header_read_limit(), Some(Duration::from_millis(500)));
        assert_eq!(timeout.idle_limit(), Some(Duration::from_secs(30)));

        let unset = TimeoutConfig::default();
        assert_eq!(unset.header_read_limit(), None);
        assert_eq!(unset.idle_limit(), None);
    }

    #[test]
    fn empty_port_is_missing() {
        let mut vars = app_vars();
        vars.insert("APP_PORT", "");
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err.to_string(), "environment variable APP_PORT must be set");
    }

    #[test]
    fn malformed_duration_names_raw_value() {
        let mut vars = app_vars();
        vars.insert("SERVER_READ_TIMEOUT", "s2");
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().starts_with("invalid duration format: 's2'"));
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                key: "SERVER_READ_TIMEOUT",
                ..
            }
        ));
    }

    #[test]
    fn loads_database_config() {
        let vars = db_vars();
        let cfg = database_from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.connection.host, "localhost");
        assert_eq!(cfg.connection.port, "5432");
        assert_eq!(cfg.connection.sslmode, "disable");
        assert_eq!(cfg.driver, "postgres");
        assert_eq!(cfg.pool.max_open_conns, 25);
        assert_eq!(cfg.pool.max_idle_conns, 5);
        assert_eq!(cfg.pool.conn_max_lifetime, Duration::from_secs(300));
        assert_eq!(cfg.pool.conn_max_idle_time, Duration::from_secs(90));
    }

    #[test]
    fn missing_driver_and_bad_int() {
        let mut vars = db_vars();
        vars.remove("DB_DRIVER");
        let err = database_from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DB_DRIVER"));

        let mut vars = db_vars();
        vars.insert("DB_MAX_OPEN_CONNS", "ten");
        let err = database_from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().starts_with("invalid int format: 'ten'"));
    }

    #[test]
    fn negative_pool_limits_are_accepted() {
        let mut vars = db_vars();
        vars.insert("DB_MAX_OPEN_CONNS", "-1");
        vars.insert("DB_MAX_IDLE_CONNS", "-1");
        let cfg = database_from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.pool.max_open_conns, -1);
        assert_eq!(cfg.pool.max_idle_conns, -1);
    }

    #[test]
    fn combined_config_needs_both_halves() {
        let vars = app_vars();
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DB_HOST"));
    }

    #[test]
    fn parses_unit_suffixed_durations() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("+2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert_eq!(parse_duration("-1s"), Err(DurationError::Negative));
        assert_eq!(parse_duration("s2"), Err(DurationError::ExpectedNumber(0)));
        assert_eq!(
            parse_duration("5"),
            Err(DurationError::MissingUnit("5".into()))
        );
        assert_eq!(
            parse_duration("3d"),
            Err(DurationError::UnknownUnit("d".into()))
        );
        assert_eq!(parse_duration("1..2s"), Err(DurationError::ExpectedNumber(0)));
        assert_eq!(
            parse_duration("340282366920938463463374607431768211.9us"),
            Err(DurationError::Overflow)
        );
        assert_eq!(
            parse_duration("99999999999999999999999999999999999999999h"),
            Err(DurationError::Overflow)
        );
    }
}
