//! Datasource configuration, populated from environment variables.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Static basic-auth credentials sent with every PI Web API request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PIWEB_URL must be set to the PI Web API base URL")]
    MissingUrl,

    #[error("PIWEB_BIND must be a valid socket address (e.g. 0.0.0.0:3100), got {0:?}")]
    InvalidBind(String),

    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Runtime configuration for one datasource instance.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `PIWEB_URL` | (required) | PI Web API base URL, e.g. `https://pi.example.com/piwebapi` |
/// | `PIWEB_BIND` | `0.0.0.0:3100` | TCP socket address to listen on |
/// | `PIWEB_DATASOURCE_UID` | `piwebapi` | Instance UID used in channel addresses |
/// | `PIWEB_USER` | (absent) | Basic-auth user name |
/// | `PIWEB_PASSWORD` | (absent) | Basic-auth password |
/// | `PIWEB_WEBID_TTL_SECS` | `300` | WebID cache lifetime and eviction period |
/// | `PIWEB_HTTP_TIMEOUT_SECS` | `30` | Per-request timeout for PI Web API calls |
#[derive(Debug, Clone)]
pub struct DatasourceConfig {
    /// PI Web API base URL, without a trailing slash.
    pub url: String,

    /// Socket address the service binds to.
    pub bind_addr: SocketAddr,

    /// UID of this datasource instance.
    pub datasource_uid: String,

    /// Basic-auth credentials; `None` sends unauthenticated requests.
    pub credentials: Option<Credentials>,

    /// How long a resolved WebID may be served from cache.
    pub webid_ttl_secs: u64,

    /// Timeout applied to every outbound request.
    pub http_timeout_secs: u64,
}

impl DatasourceConfig {
    /// Config for `url` with every other field at its default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3100)),
            datasource_uid: "piwebapi".into(),
            credentials: None,
            webid_ttl_secs: 300,
            http_timeout_secs: 30,
        }
    }

    /// Populate config from environment variables, applying defaults where absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("PIWEB_URL").map_err(|_| ConfigError::MissingUrl)?;
        let mut config = Self::new(url);

        if let Ok(bind) = std::env::var("PIWEB_BIND") {
            config.bind_addr = bind.parse().map_err(|_| ConfigError::InvalidBind(bind))?;
        }
        if let Ok(uid) = std::env::var("PIWEB_DATASOURCE_UID") {
            config.datasource_uid = uid;
        }
        if let (Ok(username), Ok(password)) =
            (std::env::var("PIWEB_USER"), std::env::var("PIWEB_PASSWORD"))
        {
            config.credentials = Some(Credentials { username, password });
        }
        if let Some(secs) = positive_env("PIWEB_WEBID_TTL_SECS")? {
            config.webid_ttl_secs = secs;
        }
        if let Some(secs) = positive_env("PIWEB_HTTP_TIMEOUT_SECS")? {
            config.http_timeout_secs = secs;
        }
        Ok(config)
    }

    pub fn webid_ttl(&self) -> Duration {
        Duration::from_secs(self.webid_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn positive_env(var: &'static str) -> Result<Option<u64>, ConfigError> {
    let Ok(value) = std::env::var(var) else {
        return Ok(None);
    };
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}
