//! Server configuration for the guestbook.
//!
//! Loaded once at startup from environment variables and shared read-only
//! through [`AppState`](crate::state::AppState). Nothing reads the
//! environment after [`ServerConfig::from_env`] returns.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use guestbook_core::entry::EntryLimits;
use guestbook_core::repository::DEFAULT_LIST_CAP;
use guestbook_storage::{RetryPolicy, redact_uri};

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("required environment variable {var} is not set")]
    Missing { var: &'static str },

    /// A variable is set but cannot be used.
    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Document store connection URI.
    pub database_url: String,
    /// Secret that unlocks writing.
    pub write_password: String,
    /// Secret that unlocks reading.
    pub read_password: String,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Directory holding the single-page client.
    pub static_dir: PathBuf,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
    /// Maximum entries per listing; `None` is unbounded.
    pub list_limit: Option<usize>,
    /// Entry field limits.
    pub entry_limits: EntryLimits,
    /// Rate limit window for password verification.
    pub rate_limit_window: Duration,
    /// Requests allowed per client per window.
    pub rate_limit_max: u32,
    /// Database connection pool size.
    pub db_pool_size: u32,
    /// Initial connection attempts; `0` retries forever.
    pub db_connect_attempts: u32,
    /// Wait between connection attempts.
    pub db_retry_delay: Duration,
    /// Interval between store health checks.
    pub db_health_interval: Duration,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &redact_uri(&self.database_url))
            .field("write_password", &"[redacted]")
            .field("read_password", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("static_dir", &self.static_dir)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("list_limit", &self.list_limit)
            .field("entry_limits", &self.entry_limits)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("db_pool_size", &self.db_pool_size)
            .field("db_connect_attempts", &self.db_connect_attempts)
            .field("db_retry_delay", &self.db_retry_delay)
            .field("db_health_interval", &self.db_health_interval)
            .finish()
    }
}

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` (or `MONGODB_URI`): document store URI, required
    /// - `WRITE_PASSWORD`, `READ_PASSWORD`: access secrets, required
    /// - `PORT`: port to bind on `0.0.0.0` (default: `3000`)
    /// - `GUESTBOOK_BIND_ADDR`: full bind address, overrides `PORT`
    /// - `GUESTBOOK_LOG_LEVEL`: log filter (default: `info`)
    /// - `GUESTBOOK_STATIC_DIR`: client assets (default: `./public`)
    /// - `GUESTBOOK_BODY_LIMIT_BYTES`: request body cap (default: 10 MiB)
    /// - `GUESTBOOK_LIST_LIMIT`: listing cap or `unbounded` (default: `100`)
    /// - `GUESTBOOK_MAX_NAME_LEN`, `GUESTBOOK_MAX_MESSAGE_LEN`,
    ///   `GUESTBOOK_MAX_SIGNATURE_LEN`: field limits in bytes
    /// - `GUESTBOOK_RATE_LIMIT_WINDOW_SECS`, `GUESTBOOK_RATE_LIMIT_MAX`:
    ///   verify-password limit (default: 100 per 900 seconds)
    /// - `GUESTBOOK_DB_POOL_SIZE` (default: `10`)
    /// - `GUESTBOOK_DB_CONNECT_ATTEMPTS` (default: `5`, `0` = forever)
    /// - `GUESTBOOK_DB_RETRY_DELAY_SECS` (default: `5`)
    /// - `GUESTBOOK_DB_HEALTH_INTERVAL_SECS` (default: `30`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL")
            .or_else(|| get("MONGODB_URI"))
            .ok_or(ConfigError::Missing {
                var: "DATABASE_URL",
            })?;
        let write_password = get("WRITE_PASSWORD").ok_or(ConfigError::Missing {
            var: "WRITE_PASSWORD",
        })?;
        let read_password = get("READ_PASSWORD").ok_or(ConfigError::Missing {
            var: "READ_PASSWORD",
        })?;

        // Priority: GUESTBOOK_BIND_ADDR > PORT > 0.0.0.0:3000
        let bind_addr = if let Some(addr) = get("GUESTBOOK_BIND_ADDR") {
            parse_value("GUESTBOOK_BIND_ADDR", &addr)?
        } else {
            let port = parse_or(&get, "PORT", DEFAULT_PORT)?;
            SocketAddr::from(([0, 0, 0, 0], port))
        };

        let list_limit = match get("GUESTBOOK_LIST_LIMIT") {
            Some(v) if v.eq_ignore_ascii_case("unbounded") => None,
            Some(v) => {
                let cap = parse_value::<usize>("GUESTBOOK_LIST_LIMIT", &v)?;
                Some(positive("GUESTBOOK_LIST_LIMIT", cap)?)
            }
            None => Some(DEFAULT_LIST_CAP),
        };

        let defaults = EntryLimits::default();
        let entry_limits = EntryLimits {
            max_name_len: positive(
                "GUESTBOOK_MAX_NAME_LEN",
                parse_or(&get, "GUESTBOOK_MAX_NAME_LEN", defaults.max_name_len)?,
            )?,
            max_message_len: positive(
                "GUESTBOOK_MAX_MESSAGE_LEN",
                parse_or(&get, "GUESTBOOK_MAX_MESSAGE_LEN", defaults.max_message_len)?,
            )?,
            max_signature_len: positive(
                "GUESTBOOK_MAX_SIGNATURE_LEN",
                parse_or(&get, "GUESTBOOK_MAX_SIGNATURE_LEN", defaults.max_signature_len)?,
            )?,
            max_date_len: defaults.max_date_len,
        };

        Ok(Self {
            bind_addr,
            database_url,
            write_password,
            read_password,
            log_level: get("GUESTBOOK_LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            static_dir: get("GUESTBOOK_STATIC_DIR")
                .map_or_else(|| PathBuf::from("./public"), PathBuf::from),
            body_limit_bytes: positive(
                "GUESTBOOK_BODY_LIMIT_BYTES",
                parse_or(&get, "GUESTBOOK_BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
            )?,
            list_limit,
            entry_limits,
            rate_limit_window: secs(
                "GUESTBOOK_RATE_LIMIT_WINDOW_SECS",
                parse_or(&get, "GUESTBOOK_RATE_LIMIT_WINDOW_SECS", 900)?,
            )?,
            rate_limit_max: positive(
                "GUESTBOOK_RATE_LIMIT_MAX",
                parse_or(&get, "GUESTBOOK_RATE_LIMIT_MAX", 100)?,
            )?,
            db_pool_size: positive(
                "GUESTBOOK_DB_POOL_SIZE",
                parse_or(&get, "GUESTBOOK_DB_POOL_SIZE", 10)?,
            )?,
            db_connect_attempts: parse_or(&get, "GUESTBOOK_DB_CONNECT_ATTEMPTS", 5)?,
            db_retry_delay: Duration::from_secs(parse_or(
                &get,
                "GUESTBOOK_DB_RETRY_DELAY_SECS",
                5,
            )?),
            db_health_interval: secs(
                "GUESTBOOK_DB_HEALTH_INTERVAL_SECS",
                parse_or(&get, "GUESTBOOK_DB_HEALTH_INTERVAL_SECS", 30)?,
            )?,
        })
    }

    /// Retry policy for the initial store connection.
    #[must_use]
    pub const fn db_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.db_retry_delay).with_max_attempts(self.db_connect_attempts)
    }

    /// PostgreSQL pool settings.
    #[cfg(feature = "postgres-backend")]
    #[must_use]
    pub fn postgres_options(&self) -> guestbook_storage::PostgresOptions {
        guestbook_storage::PostgresOptions {
            max_connections: self.db_pool_size,
            ..guestbook_storage::PostgresOptions::default()
        }
    }
}

fn parse_value<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: format!("{raw:?}: {e}"),
    })
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(var).map_or(Ok(default), |raw| parse_value(var, &raw))
}

fn positive<T>(var: &'static str, value: T) -> Result<T, ConfigError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        return Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(value)
}

fn secs(var: &'static str, value: u64) -> Result<Duration, ConfigError> {
    positive(var, value).map(Duration::from_secs)
}
