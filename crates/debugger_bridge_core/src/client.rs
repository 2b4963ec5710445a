//! Client proxy used by views and tooling to submit commands to the bridge.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::net::{TcpStream, UnixStream};
use tokio::time::timeout;

use crate::api::{ApiRequest, ApiResponse, ErrorKind};
use crate::config::{ClientConfig, Endpoint};
use crate::error::BridgeError;
use crate::registry::CommandRegistry;
use crate::types::CommandReply;
use crate::wire;

/// What a single `send` produces: either the decoded success reply or the
/// server's typed error. Transport faults surface as `Err(BridgeError)` from
/// `send` itself, never through this type.
#[derive(Debug, Clone)]
pub enum ClientReply {
    Success(CommandReply),
    Error {
        kind: ErrorKind,
        message: Option<String>,
    },
}

impl ClientReply {
    pub fn is_error(&self) -> bool {
        matches!(self, ClientReply::Error { .. })
    }
}

#[derive(Clone)]
pub struct BridgeClient {
    config: ClientConfig,
    registry: Arc<CommandRegistry>,
}

enum BridgeStream {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl BridgeStream {
    async fn connect(endpoint: &Endpoint) -> crate::Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => Ok(Self::Tcp(TcpStream::connect(addr.as_str()).await?)),
            Endpoint::Unix(path) => Ok(Self::Unix(UnixStream::connect(path).await?)),
        }
    }

    async fn write_frame(&mut self, payload: &[u8]) -> crate::Result<()> {
        match self {
            Self::Tcp(stream) => wire::write_frame(stream, payload).await,
            Self::Unix(stream) => wire::write_frame(stream, payload).await,
        }
    }

    async fn read_frame(&mut self) -> crate::Result<Option<Vec<u8>>> {
        match self {
            Self::Tcp(stream) => wire::read_frame(stream).await,
            Self::Unix(stream) => wire::read_frame(stream).await,
        }
    }
}

impl BridgeClient {
    /// A client over the given endpoint with the built-in command set for
    /// reply resolution.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_registry(config, Arc::new(CommandRegistry::with_builtin_commands()))
    }

    /// A client resolving replies against a caller-supplied registry, for
    /// hosts with custom commands.
    pub fn with_registry(config: ClientConfig, registry: Arc<CommandRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request over a fresh connection and decode the reply into the
    /// most specific type the registry declares for the request's kind.
    pub async fn send(&self, request: &ApiRequest) -> crate::Result<ClientReply> {
        let payload = request.encode()?;
        let mut stream = BridgeStream::connect(&self.config.endpoint).await?;

        tracing::debug!(
            "Sending request: kind={}, blocking={}",
            request.kind,
            request.blocking
        );
        stream.write_frame(&payload).await?;

        let frame = timeout(self.config.timeout, stream.read_frame())
            .await
            .map_err(|_| BridgeError::Timeout(self.config.timeout))??;

        let raw = match frame {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                tracing::warn!("Empty reply for request kind={}", request.kind);
                return Ok(ClientReply::Error {
                    kind: ErrorKind::EmptyResponse,
                    message: None,
                });
            }
        };

        let response =
            ApiResponse::decode(&raw).map_err(|e| BridgeError::InvalidResponse(e.to_string()))?;

        if response.is_error {
            tracing::debug!(
                "Error reply for kind={}: {:?}",
                request.kind,
                response.status
            );
            return Ok(ClientReply::Error {
                kind: response.status.unwrap_or(ErrorKind::Generic),
                message: response.message,
            });
        }

        let payload = response.payload.unwrap_or(Value::Null);
        let reply = match self.registry.lookup(&request.kind) {
            Some(handler) => handler.decode_reply(payload).map_err(|e| {
                BridgeError::InvalidResponse(format!("payload for '{}': {e}", request.kind))
            })?,
            None => CommandReply::Raw(payload),
        };
        Ok(ClientReply::Success(reply))
    }

    /// Send a batch concurrently, one fresh connection per request. Replies
    /// keep the positional order of the requests. If any request hit a
    /// transport fault, the first such fault is returned, but only after
    /// every sibling has been given the chance to finish.
    pub async fn send_many(&self, requests: Vec<ApiRequest>) -> crate::Result<Vec<ClientReply>> {
        let mut tasks = Vec::with_capacity(requests.len());
        for request in requests {
            let client = self.clone();
            tasks.push(tokio::spawn(
                async move { client.send(&request).await },
            ));
        }

        let mut replies = Vec::with_capacity(tasks.len());
        let mut first_fault = None;
        for task in tasks {
            match task.await {
                Ok(Ok(reply)) => replies.push(reply),
                Ok(Err(e)) => {
                    if first_fault.is_none() {
                        first_fault = Some(e);
                    }
                }
                Err(e) => {
                    if first_fault.is_none() {
                        first_fault = Some(BridgeError::Io(std::io::Error::other(e.to_string())));
                    }
                }
            }
        }

        match first_fault {
            Some(fault) => Err(fault),
            None => Ok(replies),
        }
    }

    /// Construct and send a request in one call.
    pub async fn perform(
        &self,
        kind: impl Into<String>,
        parameters: Map<String, Value>,
        blocking: bool,
    ) -> crate::Result<ClientReply> {
        let request = ApiRequest {
            kind: kind.into(),
            parameters,
            blocking,
            timed_out: false,
        };
        self.send(&request).await
    }
}
