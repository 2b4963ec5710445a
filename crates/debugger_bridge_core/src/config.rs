use std::path::PathBuf;
use std::time::Duration;

/// Transport endpoint a client connects to. The server side may expose both
/// kinds at once; a client picks exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A TCP address in `host:port` form.
    Tcp(String),
    /// A Unix domain socket path.
    Unix(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Tcp("127.0.0.1:5555".to_string()),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    pub fn tcp(address: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::Tcp(address.into()),
            ..Self::default()
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: Endpoint::Unix(path.into()),
            ..Self::default()
        }
    }

    /// Environment overrides: `BRIDGE_SOCKET` (a domain socket path, takes
    /// precedence), `BRIDGE_TCP` (`host:port`), `BRIDGE_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let endpoint = if let Ok(path) = std::env::var("BRIDGE_SOCKET") {
            Endpoint::Unix(PathBuf::from(path))
        } else {
            Endpoint::Tcp(
                std::env::var("BRIDGE_TCP").unwrap_or_else(|_| "127.0.0.1:5555".to_string()),
            )
        };

        let timeout = std::env::var("BRIDGE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_secs(30));

        Self { endpoint, timeout }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, Endpoint::Tcp("127.0.0.1:5555".to_string()));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_constructors() {
        let config = ClientConfig::tcp("localhost:6000");
        assert_eq!(config.endpoint, Endpoint::Tcp("localhost:6000".to_string()));

        let config = ClientConfig::unix("/tmp/bridge.sock");
        assert_eq!(
            config.endpoint,
            Endpoint::Unix(PathBuf::from("/tmp/bridge.sock"))
        );
    }

    #[test]
    fn test_from_env_custom() {
        std::env::set_var("BRIDGE_SOCKET", "/run/bridge.sock");
        std::env::set_var("BRIDGE_TIMEOUT_MS", "5000");

        let config = ClientConfig::from_env();
        assert_eq!(
            config.endpoint,
            Endpoint::Unix(PathBuf::from("/run/bridge.sock"))
        );
        assert_eq!(config.timeout, Duration::from_millis(5000));

        std::env::remove_var("BRIDGE_SOCKET");
        std::env::remove_var("BRIDGE_TIMEOUT_MS");
    }
}
