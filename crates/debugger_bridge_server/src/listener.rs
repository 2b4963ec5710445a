//! Transport listeners feeding the one dispatcher.
//!
//! Each configured endpoint runs its own accept loop; every accepted
//! connection gets its own task that serves frames until the peer hangs up.
//! All of them funnel into the same `BridgeServer`. The two transports share
//! one generic connection loop; only the bind/accept step differs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use debugger_bridge_core::wire;

use crate::server::BridgeServer;

pub struct ListenerManager {
    shutdown: watch::Sender<bool>,
    accept_loops: Vec<JoinHandle<()>>,
    tcp_addr: Option<SocketAddr>,
    socket_path: Option<PathBuf>,
    running: bool,
}

impl ListenerManager {
    /// Bind every configured endpoint and start its accept loop. Endpoints
    /// left unconfigured are simply not started; starting with none is fine.
    pub async fn start(server: Arc<BridgeServer>) -> debugger_bridge_core::Result<Self> {
        let (shutdown, _) = watch::channel(false);
        let listen = server.config().listen.clone();
        let mut accept_loops = Vec::new();
        let mut tcp_addr = None;
        let mut socket_path = None;

        if let Some(tcp) = &listen.tcp {
            let addr = format!("{}:{}", tcp.address, tcp.port);
            let listener = TcpListener::bind(&addr).await?;
            let local = listener.local_addr()?;
            info!("TCP listener bound on {local}");
            tcp_addr = Some(local);
            accept_loops.push(tokio::spawn(tcp_accept_loop(
                listener,
                server.clone(),
                shutdown.subscribe(),
            )));
        }

        if let Some(path) = &listen.domain {
            // A previous run may have left its socket behind; the bind below
            // surfaces the real error if this removal fails.
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Could not remove stale socket {}: {e}", path.display());
                }
            }
            let listener = UnixListener::bind(path)?;
            info!("Domain socket listener bound on {}", path.display());
            socket_path = Some(path.clone());
            accept_loops.push(tokio::spawn(unix_accept_loop(
                listener,
                server.clone(),
                shutdown.subscribe(),
            )));
        }

        Ok(Self {
            shutdown,
            accept_loops,
            tcp_addr,
            socket_path,
            running: true,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The bound TCP address, useful when the configured port was 0.
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp_addr
    }

    pub fn socket_path(&self) -> Option<&PathBuf> {
        self.socket_path.as_ref()
    }

    /// Stop accepting, close every listening socket, and join every accept
    /// loop. In-flight connections finish on their own.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        for handle in self.accept_loops.drain(..) {
            if let Err(e) = handle.await {
                error!("Accept loop failed to join: {e}");
            }
        }
        if let Some(path) = self.socket_path.take() {
            let _ = std::fs::remove_file(&path);
        }
        self.running = false;
        info!("Listeners stopped");
    }
}

async fn tcp_accept_loop(
    listener: TcpListener,
    server: Arc<BridgeServer>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("TCP accept loop shutting down");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted TCP connection from {peer}");
                    tokio::spawn(serve_connection(stream, server.clone()));
                }
                Err(e) => warn!("TCP accept failed: {e}"),
            }
        }
    }
}

async fn unix_accept_loop(
    listener: UnixListener,
    server: Arc<BridgeServer>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("Domain socket accept loop shutting down");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    debug!("Accepted domain socket connection");
                    tokio::spawn(serve_connection(stream, server.clone()));
                }
                Err(e) => warn!("Domain socket accept failed: {e}"),
            }
        }
    }
}

/// One request/response exchange per frame until the peer hangs up. Faults
/// never escape: the dispatcher answers with typed errors, and transport
/// errors just end the connection.
async fn serve_connection<S>(mut stream: S, server: Arc<BridgeServer>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = match wire::read_frame(&mut stream).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Client disconnected");
                return;
            }
            Err(e) => {
                debug!("Connection read failed: {e}");
                return;
            }
        };

        let response = server.handle_request(&frame).await;
        let encoded = match response.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to encode response: {e}");
                return;
            }
        };
        if let Err(e) = wire::write_frame(&mut stream, &encoded).await {
            debug!("Connection write failed: {e}");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use debugger_bridge_core::client::{BridgeClient, ClientReply};
    use debugger_bridge_core::commands;
    use debugger_bridge_core::config::ClientConfig;
    use debugger_bridge_core::engine::{DebugEngine, TargetState};
    use debugger_bridge_core::registry::CommandRegistry;
    use debugger_bridge_core::types::CommandReply;

    use crate::config::{ListenConfig, ServerConfig, TcpEndpoint};

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    struct FixedEngine;

    impl DebugEngine for FixedEngine {
        fn host_version(&self) -> String {
            "fixed-1.0".to_string()
        }

        fn target_state(&self) -> anyhow::Result<TargetState> {
            Ok(TargetState::Stopped)
        }

        fn read_memory(&self, _address: u64, length: usize) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0xAA; length])
        }

        fn read_registers(&self) -> anyhow::Result<BTreeMap<String, u64>> {
            Ok(BTreeMap::from([("pc".to_string(), 0x1000u64)]))
        }
    }

    fn tcp_only_server() -> Arc<BridgeServer> {
        let config = ServerConfig {
            listen: ListenConfig {
                tcp: Some(TcpEndpoint::new("127.0.0.1", 0)),
                domain: None,
            },
            blocking_timeout: Duration::from_secs(5),
        };
        let server = Arc::new(BridgeServer::new(
            config,
            Arc::new(CommandRegistry::with_builtin_commands()),
        ));
        server.set_engine(Arc::new(FixedEngine));
        server
    }

    /// Pump `drain` from a plain thread, the way an engine halt callback
    /// would arrive, until the flag is raised.
    fn spawn_drain_pump(server: Arc<BridgeServer>) -> (Arc<AtomicBool>, std::thread::JoinHandle<()>) {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                server.drain();
                std::thread::sleep(Duration::from_millis(10));
            }
        });
        (done, handle)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tcp_round_trip_with_typed_reply() {
        init_tracing();
        let server = tcp_only_server();
        let mut manager = ListenerManager::start(server.clone())
            .await
            .expect("listeners start");
        let addr = manager.tcp_addr().expect("tcp bound");

        let client = BridgeClient::new(ClientConfig::tcp(addr.to_string()));
        let reply = client
            .send(&commands::version::request())
            .await
            .expect("send should succeed");
        match reply {
            ClientReply::Success(CommandReply::Version(version)) => {
                assert_eq!(version.host_version, "fixed-1.0");
            }
            other => panic!("expected Version reply, got {other:?}"),
        }

        manager.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_request_over_tcp_is_drained() {
        init_tracing();
        let server = tcp_only_server();
        let mut manager = ListenerManager::start(server.clone())
            .await
            .expect("listeners start");
        let addr = manager.tcp_addr().expect("tcp bound");
        let (done, pump) = spawn_drain_pump(server.clone());

        let client = BridgeClient::new(ClientConfig::tcp(addr.to_string()));
        let reply = client
            .send(&commands::memory::request(0x4000, 4))
            .await
            .expect("send should succeed");
        match reply {
            ClientReply::Success(CommandReply::Memory(memory)) => {
                assert_eq!(memory.address, 0x4000);
                assert_eq!(memory.bytes().expect("valid base64"), vec![0xAA; 4]);
            }
            other => panic!("expected Memory reply, got {other:?}"),
        }

        done.store(true, Ordering::SeqCst);
        pump.join().expect("drain pump");
        manager.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn domain_socket_round_trip_and_stale_socket_cleanup() {
        init_tracing();
        let path = std::env::temp_dir().join(format!(
            "debugger-bridge-test-{}.sock",
            std::process::id()
        ));
        // Leave a stale artifact behind; start() must clear it.
        std::fs::write(&path, b"stale").expect("plant stale socket file");

        let config = ServerConfig {
            listen: ListenConfig {
                tcp: None,
                domain: Some(path.clone()),
            },
            blocking_timeout: Duration::from_secs(5),
        };
        let server = Arc::new(BridgeServer::new(
            config,
            Arc::new(CommandRegistry::with_builtin_commands()),
        ));
        server.set_engine(Arc::new(FixedEngine));

        let mut manager = ListenerManager::start(server.clone())
            .await
            .expect("listeners start despite stale socket");
        assert_eq!(manager.socket_path(), Some(&path));

        let client = BridgeClient::new(ClientConfig::unix(&path));
        let reply = client
            .send(&commands::version::request())
            .await
            .expect("send should succeed");
        assert!(!reply.is_error(), "got {reply:?}");

        manager.stop().await;
        assert!(!path.exists(), "socket file removed on stop");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_terminates_accept_loops() {
        init_tracing();
        let server = tcp_only_server();
        let mut manager = ListenerManager::start(server.clone())
            .await
            .expect("listeners start");
        let addr = manager.tcp_addr().expect("tcp bound");
        assert!(manager.is_running());

        manager.stop().await;
        assert!(!manager.is_running());

        let refused = tokio::net::TcpStream::connect(addr).await;
        assert!(refused.is_err(), "listening socket must be closed");
    }

    #[tokio::test]
    async fn zero_configured_endpoints_is_valid() {
        init_tracing();
        let config = ServerConfig {
            listen: ListenConfig::default(),
            blocking_timeout: Duration::from_secs(5),
        };
        let server = Arc::new(BridgeServer::new(
            config,
            Arc::new(CommandRegistry::with_builtin_commands()),
        ));

        let mut manager = ListenerManager::start(server).await.expect("start with nothing to bind");
        assert!(manager.tcp_addr().is_none());
        assert!(manager.socket_path().is_none());
        manager.stop().await;
    }
}
