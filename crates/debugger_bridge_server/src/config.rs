use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TcpEndpoint {
    pub address: String,
    pub port: u16,
}

impl TcpEndpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

/// Which transports to bind. Each entry is independently optional; absent
/// entries are simply not started.
#[derive(Debug, Clone, Default)]
pub struct ListenConfig {
    pub tcp: Option<TcpEndpoint>,
    pub domain: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: ListenConfig,
    /// How long a blocking request waits for an engine halt before it is
    /// answered with `timed_out`.
    pub blocking_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig {
                tcp: Some(TcpEndpoint::new("127.0.0.1", 5555)),
                domain: None,
            },
            blocking_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Environment overrides: `BRIDGE_LISTEN_TCP` (`host:port`, empty string
    /// disables), `BRIDGE_LISTEN_SOCKET` (a domain socket path),
    /// `BRIDGE_BLOCKING_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("BRIDGE_LISTEN_TCP") {
            config.listen.tcp = parse_tcp(&value);
        }

        if let Ok(path) = std::env::var("BRIDGE_LISTEN_SOCKET") {
            if !path.is_empty() {
                config.listen.domain = Some(PathBuf::from(path));
            }
        }

        if let Some(timeout) = std::env::var("BRIDGE_BLOCKING_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.blocking_timeout = Duration::from_millis(timeout);
        }

        config
    }
}

fn parse_tcp(value: &str) -> Option<TcpEndpoint> {
    let (address, port) = value.rsplit_once(':')?;
    let port = port.parse::<u16>().ok()?;
    Some(TcpEndpoint::new(address, port))
}
