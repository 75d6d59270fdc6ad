use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_HOST_URL: &str = "https://psychopass.animekaizoku.com/";
pub const MIN_TOKEN_LEN: usize = 20;

/// Knobs of the polling state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// How long the server may hold one `getUpdates` call open.
    pub timeout_seconds: u32,
    /// Upper bound on session start attempts, counted across reconnects.
    pub max_connection_tries: u32,
    /// Fixed pause before reconnecting after a refused connection.
    pub reconnect_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_connection_tries: 50,
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

impl DispatcherConfig {
    pub fn with_timeout_seconds(mut self, secs: u32) -> Self {
        self.timeout_seconds = secs;
        self
    }

    pub fn with_max_connection_tries(mut self, tries: u32) -> Self {
        self.max_connection_tries = tries;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(Error::Config(
                "poll timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_connection_tries == 0 {
            return Err(Error::Config(
                "max connection tries must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Typed configuration for the listener binary.
#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub host_url: String,
    pub dispatcher: DispatcherConfig,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = get("SIBYL_TOKEN").unwrap_or_default().trim().to_string();
        if token.is_empty() {
            return Err(Error::Config(
                "SIBYL_TOKEN environment variable is required".to_string(),
            ));
        }
        if token.len() < MIN_TOKEN_LEN {
            return Err(Error::Config(format!(
                "token length should be at least {MIN_TOKEN_LEN}"
            )));
        }

        let host_url = normalize_host_url(&get("SIBYL_HOST_URL").unwrap_or_default())?;

        let defaults = DispatcherConfig::default();
        let dispatcher = DispatcherConfig {
            timeout_seconds: parse_num(&get, "SIBYL_POLL_TIMEOUT")?
                .unwrap_or(defaults.timeout_seconds),
            max_connection_tries: parse_num(&get, "SIBYL_MAX_CONNECTION_TRIES")?
                .unwrap_or(defaults.max_connection_tries),
            reconnect_backoff: parse_num(&get, "SIBYL_RECONNECT_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_backoff),
        };
        dispatcher.validate()?;

        Ok(Self {
            token,
            host_url,
            dispatcher,
        })
    }
}

/// Canonicalise a host URL so endpoint names can be appended directly.
///
/// Empty input selects [`DEFAULT_HOST_URL`]; a missing scheme becomes `https://`.
pub fn normalize_host_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_HOST_URL.to_string());
    }
    if raw.len() < 4 {
        return Err(Error::Config(format!("invalid host url: {raw}")));
    }

    let mut url = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    Ok(url)
}

fn parse_num<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}
