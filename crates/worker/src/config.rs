use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use zapnotify_core::access::{AccessFilter, AllowAll, AllowList};
use zapnotify_core::channels::{DEFAULT_RELAY_URL, PAYMENT_NOTIFICATION_CHANNEL};
use zapnotify_core::error::{IdentityError, ResolveError};
use zapnotify_core::keys::ServiceIdentity;
use zapnotify_db::ReconnectConfig;
use zapnotify_relay::MAX_DISPATCH_TIMEOUT;

const CONNECT_TIMEOUT_RANGE: RangeInclusive<u64> = 1..=300;
const MIN_BACKOFF_RANGE: RangeInclusive<u64> = 1..=3600;
const MAX_BACKOFF_RANGE: RangeInclusive<u64> = 1..=86_400;

/// Worker configuration loaded from environment variables.
///
/// `DB_CONN_STRING` and `SECRET_KEY` are required. Everything else has a
/// default suitable for production.
#[derive(Debug)]
pub struct WorkerConfig {
    /// Postgres connection string for the `LISTEN` connection.
    pub db_conn_string: String,
    /// Signing identity parsed from `SECRET_KEY`.
    pub identity: ServiceIdentity,
    /// Ordered, fixed relay endpoint list.
    pub relay_urls: Vec<String>,
    /// Notification channel to subscribe to.
    pub channel: String,
    /// Allow-list of recipients; `None` means every recipient is eligible.
    pub allow_list: Option<AllowList>,
    /// Overall publish deadline per dispatch.
    pub dispatch_timeout: Duration,
    /// Bound on a single relay handshake.
    pub relay_connect_timeout: Duration,
    /// Reconnect backoff for the database listener.
    pub listener_backoff: ReconnectConfig,
}

/// Configuration problems. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("SECRET_KEY is unusable: {0}")]
    SecretKey(#[from] IdentityError),

    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be between {min} and {max} seconds, got {value}")]
    OutOfRange {
        var: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("RELAY_URLS must name at least one relay")]
    NoRelays,

    #[error("Relay URL '{0}' must start with ws:// or wss://")]
    InvalidRelayUrl(String),

    #[error("ALLOWED_PUBKEYS contains an invalid entry: {0}")]
    AllowList(#[from] ResolveError),

    #[error("LISTENER_MIN_BACKOFF_SECS ({min}) exceeds LISTENER_MAX_BACKOFF_SECS ({max})")]
    BackoffRange { min: u64, max: u64 },
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                      | Default                |
    /// |------------------------------|------------------------|
    /// | `DB_CONN_STRING`             | required               |
    /// | `SECRET_KEY`                 | required               |
    /// | `RELAY_URLS`                 | `wss://relay.damus.io` |
    /// | `NOTIFY_CHANNEL`             | `payment_notifs`       |
    /// | `ALLOWED_PUBKEYS`            | empty (allow all)      |
    /// | `DISPATCH_TIMEOUT_SECS`      | `10`                   |
    /// | `RELAY_CONNECT_TIMEOUT_SECS` | `5`                    |
    /// | `LISTENER_MIN_BACKOFF_SECS`  | `10`                   |
    /// | `LISTENER_MAX_BACKOFF_SECS`  | `60`                   |
    ///
    /// Durations are whole seconds and must be at least 1. The dispatch
    /// timeout is capped at an hour and the connect timeout at five minutes.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_conn_string = lookup("DB_CONN_STRING")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DB_CONN_STRING"))?;

        let secret_key = lookup("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        let identity = ServiceIdentity::from_secret_key(&secret_key)?;

        let relay_urls = split_list(
            &lookup("RELAY_URLS").unwrap_or_else(|| DEFAULT_RELAY_URL.to_string()),
        );
        if relay_urls.is_empty() {
            return Err(ConfigError::NoRelays);
        }
        if let Some(bad) = relay_urls
            .iter()
            .find(|u| !(u.starts_with("ws://") || u.starts_with("wss://")))
        {
            return Err(ConfigError::InvalidRelayUrl(bad.clone()));
        }

        let channel = lookup("NOTIFY_CHANNEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| PAYMENT_NOTIFICATION_CHANNEL.to_string());

        let allow_list = AllowList::new(split_list(&lookup("ALLOWED_PUBKEYS").unwrap_or_default()))?;
        let allow_list = (!allow_list.is_empty()).then_some(allow_list);

        let dispatch_timeout = secs(
            &lookup,
            "DISPATCH_TIMEOUT_SECS",
            10,
            1..=MAX_DISPATCH_TIMEOUT.as_secs(),
        )?;
        let relay_connect_timeout =
            secs(&lookup, "RELAY_CONNECT_TIMEOUT_SECS", 5, CONNECT_TIMEOUT_RANGE)?;

        let min_backoff = secs(&lookup, "LISTENER_MIN_BACKOFF_SECS", 10, MIN_BACKOFF_RANGE)?;
        let max_backoff = secs(&lookup, "LISTENER_MAX_BACKOFF_SECS", 60, MAX_BACKOFF_RANGE)?;
        if min_backoff > max_backoff {
            return Err(ConfigError::BackoffRange {
                min: min_backoff.as_secs(),
                max: max_backoff.as_secs(),
            });
        }

        Ok(Self {
            db_conn_string,
            identity,
            relay_urls,
            channel,
            allow_list,
            dispatch_timeout,
            relay_connect_timeout,
            listener_backoff: ReconnectConfig::between(min_backoff, max_backoff),
        })
    }

    /// The recipient policy selected by `ALLOWED_PUBKEYS`.
    pub fn access_filter(&self) -> Arc<dyn AccessFilter> {
        match &self.allow_list {
            Some(list) => Arc::new(list.clone()),
            None => Arc::new(AllowAll),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn secs<F>(
    lookup: &F,
    var: &'static str,
    default: u64,
    range: RangeInclusive<u64>,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(Duration::from_secs(default));
    };
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value: raw.clone() })?;
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange {
            var,
            value,
            min: *range.start(),
            max: *range.end(),
        });
    }
    Ok(Duration::from_secs(value))
}
