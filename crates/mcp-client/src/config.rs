use std::{fmt, num::ParseIntError, str::FromStr, time::Duration};

use mcp_types::{Implementation, LATEST_PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Requests wait this long for a response unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("address must be host:port, got {0:?}")]
    MissingPort(String),
    #[error("address is missing a host: {0:?}")]
    MissingHost(String),
    #[error("invalid port in {input:?}: {source}")]
    InvalidPort {
        input: String,
        #[source]
        source: ParseIntError,
    },
    #[error("client_info.name is required")]
    MissingClientName,
    #[error("protocol_version is required")]
    MissingProtocolVersion,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("default_server is required")]
    MissingDefaultServer,
}

/// Where a transport should connect to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::MissingPort(s.to_string()))?;

        if host.is_empty() {
            return Err(ConfigError::MissingHost(s.to_string()));
        }

        let port = port
            .parse::<u16>()
            .map_err(|source| ConfigError::InvalidPort {
                input: s.to_string(),
                source,
            })?;

        Ok(Self::new(host, port))
    }
}

/// Client-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Reported to the server during `initialize`.
    pub client_info: Implementation,
    pub protocol_version: String,
    /// How long a request may stay pending. Written as (fractional) seconds.
    #[serde(rename = "request_timeout_secs", with = "duration_secs")]
    pub request_timeout: Duration,
    /// Server id used by callers that do not route explicitly.
    pub default_server: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_server: "default".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_default_server(mut self, server_id: impl Into<String>) -> Self {
        self.default_server = server_id.into();
        self
    }

    /// Checked by [`Client::with_config`](crate::Client::with_config).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_info.name.is_empty() {
            return Err(ConfigError::MissingClientName);
        }

        if self.protocol_version.is_empty() {
            return Err(ConfigError::MissingProtocolVersion);
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.default_server.is_empty() {
            return Err(ConfigError::MissingDefaultServer);
        }

        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

/// Per-call overrides for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abandon the request with `Cancelled` once `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let address: Address = "localhost:8123".parse().unwrap();
        assert_eq!(address, Address::new("localhost", 8123));
        assert_eq!(address.to_string(), "localhost:8123");

        assert_eq!(
            "localhost".parse::<Address>(),
            Err(ConfigError::MissingPort("localhost".to_string()))
        );
        assert_eq!(
            ":8123".parse::<Address>(),
            Err(ConfigError::MissingHost(":8123".to_string()))
        );
        assert!(matches!(
            "localhost:http".parse::<Address>(),
            Err(ConfigError::InvalidPort { .. })
        ));
        assert!(matches!(
            "localhost:70000".parse::<Address>(),
            Err(ConfigError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.protocol_version, LATEST_PROTOCOL_VERSION);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "request_timeout_secs": 5,
            "default_server": "persona-server",
        }))
        .unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.default_server, "persona-server");
        assert_eq!(config.client_info.name, "mcp-client");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let config = ClientConfig {
            default_server: String::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingDefaultServer));
    }

    #[test]
    fn test_sub_second_timeouts_are_kept() {
        let config = ClientConfig::default().with_request_timeout(Duration::from_millis(1500));
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));

        let config = ClientConfig::default().with_request_timeout(Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
        assert!(config.validate().is_ok());

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["request_timeout_secs"], serde_json::json!(0.5));

        let config: ClientConfig =
            serde_json::from_value(serde_json::json!({ "request_timeout_secs": 1.5 })).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(1500));

        assert!(serde_json::from_value::<ClientConfig>(
            serde_json::json!({ "request_timeout_secs": -1 })
        )
        .is_err());
    }
}
