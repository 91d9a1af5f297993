//! Reader configuration from environment variables.

use crate::document::DocumentIdentity;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Pad URL, required.
pub const URL_VAR: &str = "PEER_PAD_URL";
pub const API_ADDR_VAR: &str = "PEER_PAD_API_ADDR";
pub const PEERS_VAR: &str = "PEER_PAD_PEERS";
pub const APP_VAR: &str = "PEER_PAD_APP";
pub const RENDER_DELAY_VAR: &str = "PEER_PAD_RENDER_DELAY_MS";
pub const STOP_DELAY_VAR: &str = "PEER_PAD_STOP_DELAY_MS";
pub const REQUEST_TIMEOUT_VAR: &str = "PEER_PAD_REQUEST_TIMEOUT_MS";
pub const LIVE_READ_VAR: &str = "PEER_PAD_LIVE_READ";

pub const DEFAULT_API_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_APP: &str = "peer-pad/2";
/// Extra settling time before every render.
pub const DEFAULT_RENDER_DELAY: Duration = Duration::from_millis(1000);
/// Time the stop acknowledgment gets to flush before the process exits.
pub const DEFAULT_STOP_DELAY: Duration = Duration::from_millis(500);

/// How requests are served once the session is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// Sleep before each render
    pub render_delay: Duration,
    /// Delay between acknowledging `/_stop` and exiting
    pub stop_delay: Duration,
    /// Per-request deadline; `None` waits as long as it takes
    pub request_timeout: Option<Duration>,
    /// Re-read the replicas on every request instead of using the bootstrap snapshot
    pub live_read: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            render_delay: DEFAULT_RENDER_DELAY,
            stop_delay: DEFAULT_STOP_DELAY,
            request_timeout: None,
            live_read: false,
        }
    }
}

/// Configuration for a reader node.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Document this process serves
    pub identity: DocumentIdentity,

    /// HTTP listen address
    pub api_addr: SocketAddr,

    /// Peers for the mesh overlay (`host:port`)
    pub peers: Vec<String>,

    /// Application name announced to peers
    pub app: String,

    /// Request handling
    pub serve: ServeOptions,
}

impl ReaderConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(URL_VAR))?;
        let identity = DocumentIdentity::from_url(url.trim())?;

        let api_addr = match parsed::<SocketAddr, _>(&lookup, API_ADDR_VAR)? {
            Some(addr) => addr,
            None => DEFAULT_API_ADDR.parse().map_err(|_| ConfigError::InvalidValue {
                var: API_ADDR_VAR,
                value: DEFAULT_API_ADDR.to_string(),
            })?,
        };

        let peers = lookup(PEERS_VAR)
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let app = lookup(APP_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_APP.to_string());

        let serve = ServeOptions {
            render_delay: millis(&lookup, RENDER_DELAY_VAR)?.unwrap_or(DEFAULT_RENDER_DELAY),
            stop_delay: millis(&lookup, STOP_DELAY_VAR)?.unwrap_or(DEFAULT_STOP_DELAY),
            request_timeout: millis(&lookup, REQUEST_TIMEOUT_VAR)?,
            live_read: flag(&lookup, LIVE_READ_VAR)?,
        };

        Ok(Self {
            identity,
            api_addr,
            peers,
            app,
            serve,
        })
    }
}

fn parsed<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn millis<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parsed::<u64, _>(lookup, var)?.map(Duration::from_millis))
}

fn flag<F>(lookup: &F, var: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") | Some("yes") | Some("on") => Ok(true),
        Some("0") | Some("false") | Some("no") | Some("off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            var,
            value: other.to_string(),
        }),
    }
}
