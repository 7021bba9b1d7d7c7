use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Argon2id cost parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 3,
            parallelism: 6,
        }
    }
}

/// Lifetime rules applied to every issued session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Maximum time between two accesses before a session expires.
    pub idle_timeout: chrono::Duration,
    /// Absolute lifetime, counted from issuance. Also the cookie `Max-Age`.
    pub max_lifetime: chrono::Duration,
}

/// Upper bound for `SESSION_DURATION_DAYS`.
pub const MAX_SESSION_DURATION_DAYS: i64 = 3650;
/// Upper bound for `SESSION_IDLE_TIMEOUT_SECS`.
pub const MAX_IDLE_TIMEOUT_SECS: i64 = 365 * 86_400;

impl SessionPolicy {
    /// Builds a policy from raw configuration values.
    ///
    /// Both limits must be positive and no larger than
    /// [`MAX_IDLE_TIMEOUT_SECS`] and [`MAX_SESSION_DURATION_DAYS`], which keeps
    /// every expiry timestamp representable.
    pub fn from_limits(idle_secs: i64, duration_days: i64) -> Result<Self> {
        if idle_secs <= 0 || idle_secs > MAX_IDLE_TIMEOUT_SECS {
            anyhow::bail!(
                "SESSION_IDLE_TIMEOUT_SECS must be between 1 and {}",
                MAX_IDLE_TIMEOUT_SECS
            );
        }
        if duration_days <= 0 || duration_days > MAX_SESSION_DURATION_DAYS {
            anyhow::bail!(
                "SESSION_DURATION_DAYS must be between 1 and {}",
                MAX_SESSION_DURATION_DAYS
            );
        }

        let idle_timeout = chrono::Duration::try_seconds(idle_secs)
            .context("SESSION_IDLE_TIMEOUT_SECS is out of range")?;
        let max_lifetime = chrono::Duration::try_days(duration_days)
            .context("SESSION_DURATION_DAYS is out of range")?;

        Ok(Self {
            idle_timeout,
            max_lifetime,
        })
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: chrono::Duration::minutes(30),
            max_lifetime: chrono::Duration::days(7),
        }
    }
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// JSON file holding the registered identities.
    pub users_db_path: PathBuf,
    /// Name of the cookie carrying the session token.
    pub cookie_name: String,
    /// Whether cookies get the `Secure` attribute.
    pub secure_cookies: bool,
    /// Session expiration rules.
    pub session: SessionPolicy,
    /// How often the background sweeper runs.
    pub sweep_interval: Duration,
    /// Password hashing cost.
    pub hashing: HashingParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            users_db_path: PathBuf::from("db/users.json"),
            cookie_name: "session".to_string(),
            secure_cookies: false,
            session: SessionPolicy::default(),
            sweep_interval: Duration::from_secs(300),
            hashing: HashingParams::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// Every variable is optional; unset ones fall back to [`Config::default`].
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let idle_secs: i64 = parse_var("SESSION_IDLE_TIMEOUT_SECS", 1800)?;
        let duration_days: i64 = parse_var("SESSION_DURATION_DAYS", 7)?;
        let sweep_secs: u64 = parse_var("SESSION_SWEEP_INTERVAL_SECS", 300)?;

        let session = SessionPolicy::from_limits(idle_secs, duration_days)?;
        if sweep_secs == 0 {
            anyhow::bail!("SESSION_SWEEP_INTERVAL_SECS must be positive");
        }

        let is_production = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            == "production";

        Ok(Self {
            bind_addr: parse_var("BIND_ADDR", defaults.bind_addr)?,
            users_db_path: env::var("USERS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.users_db_path),
            cookie_name: env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.cookie_name),
            secure_cookies: is_production,
            session,
            sweep_interval: Duration::from_secs(sweep_secs),
            hashing: HashingParams {
                memory_kib: parse_var("ARGON2_MEMORY_KIB", defaults.hashing.memory_kib)?,
                iterations: parse_var("ARGON2_ITERATIONS", defaults.hashing.iterations)?,
                parallelism: parse_var("ARGON2_PARALLELISM", defaults.hashing.parallelism)?,
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}
