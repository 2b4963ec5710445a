//! Request dispatch against the registry and the engine halt protocol.
//!
//! `handle_request` is the outer entry point the listeners call: it decides
//! blocking vs. non-blocking and performs the wait. `dispatch_request` is the
//! inner, always-synchronous "run it now" primitive, shared by the immediate
//! path and by `drain`. `drain` is only ever invoked from the engine's own
//! halt callback context, the one context the engine is safe to touch from.

use std::sync::{Arc, RwLock};

use tokio::time::timeout;
use tracing::{debug, warn};

use debugger_bridge_core::api::{ApiRequest, ApiResponse, ErrorKind};
use debugger_bridge_core::engine::DebugEngine;
use debugger_bridge_core::registry::CommandRegistry;

use crate::config::ServerConfig;
use crate::queue::RequestQueue;

pub struct BridgeServer {
    config: ServerConfig,
    registry: Arc<CommandRegistry>,
    engine: RwLock<Option<Arc<dyn DebugEngine>>>,
    queue: RequestQueue,
}

impl BridgeServer {
    pub fn new(config: ServerConfig, registry: Arc<CommandRegistry>) -> Self {
        Self {
            config,
            registry,
            engine: RwLock::new(None),
            queue: RequestQueue::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Install the engine capability. Requests dispatched while no engine is
    /// installed short-circuit to `engine_not_present`.
    pub fn set_engine(&self, engine: Arc<dyn DebugEngine>) {
        *self.engine.write().expect("engine lock poisoned") = Some(engine);
    }

    pub fn clear_engine(&self) {
        *self.engine.write().expect("engine lock poisoned") = None;
    }

    pub fn engine(&self) -> Option<Arc<dyn DebugEngine>> {
        self.engine.read().expect("engine lock poisoned").clone()
    }

    /// Number of blocking requests currently parked for the next drain.
    pub fn pending_requests(&self) -> usize {
        self.queue.len()
    }

    /// Outer entry point: decode raw bytes and run the full pipeline,
    /// including the blocking wait. Every fault comes back as a typed
    /// response; nothing escapes to the listener.
    pub async fn handle_request(&self, raw: &[u8]) -> ApiResponse {
        let request = match ApiRequest::decode(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to decode request: {e}");
                return ApiResponse::error_with(ErrorKind::InvalidRequest, e.to_string());
            }
        };
        self.handle_parsed(request).await
    }

    /// Named-parameter variant: the kind arrives as a route segment and the
    /// parameters as a flat string-typed key/value set.
    pub async fn handle_named(
        &self,
        kind: &str,
        pairs: &[(String, String)],
    ) -> ApiResponse {
        let request = ApiRequest::from_kv(kind, pairs.iter().cloned());
        self.handle_parsed(request).await
    }

    async fn handle_parsed(&self, mut request: ApiRequest) -> ApiResponse {
        if self.engine().is_none() {
            return ApiResponse::error(ErrorKind::EngineNotPresent);
        }

        let Some(handler) = self.registry.lookup(&request.kind) else {
            return ApiResponse::error_with(
                ErrorKind::PluginNotFound,
                format!("no handler for '{}'", request.kind),
            );
        };

        if let Err(field) = handler.validate(&request) {
            return ApiResponse::missing_field(field);
        }

        if !request.blocking {
            return self.dispatch_request(&request);
        }

        // Blocking: park until the engine halts and drains the queue, or the
        // wait deadline passes. The oneshot channel is the claim: whichever
        // side resolves it first wins, the other side's action is a no-op.
        let wait = self.config.blocking_timeout;
        let (id, rx) = self.queue.push(request.clone());
        debug!("Queued blocking request: kind={}, id={id}", request.kind);

        match timeout(wait, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                self.queue.remove(id);
                ApiResponse::error_with(
                    ErrorKind::Generic,
                    "reply channel closed before a response was produced",
                )
            }
            Err(_) => {
                self.queue.remove(id);
                request.timed_out = true;
                debug!(
                    "Blocking request timed out: kind={}, id={id}, waited={wait:?}",
                    request.kind
                );
                ApiResponse::error(ErrorKind::TimedOut)
            }
        }
    }

    /// Inner dispatch primitive: validate and execute right now, on the
    /// calling thread. Used directly for non-blocking requests and by
    /// `drain` for queued ones.
    pub fn dispatch_request(&self, request: &ApiRequest) -> ApiResponse {
        let Some(engine) = self.engine() else {
            return ApiResponse::error(ErrorKind::EngineNotPresent);
        };

        let Some(handler) = self.registry.lookup(&request.kind) else {
            return ApiResponse::error_with(
                ErrorKind::PluginNotFound,
                format!("no handler for '{}'", request.kind),
            );
        };

        if let Err(field) = handler.validate(request) {
            return ApiResponse::missing_field(field);
        }

        match handler.execute(engine.as_ref(), request) {
            Ok(payload) => ApiResponse::success(payload),
            Err(fault) => {
                warn!("Handler for '{}' failed: {fault:#}", request.kind);
                fault_response(&fault)
            }
        }
    }

    /// Drain the pending queue. Called by whatever owns the engine, from the
    /// engine's own thread, once per halt. Requests queued while this runs
    /// are left for the next halt.
    pub fn drain(&self) {
        let pending = self.queue.take_all();
        if pending.is_empty() {
            return;
        }
        debug!("Draining {} queued request(s)", pending.len());

        for entry in pending {
            let response = self.dispatch_request(&entry.request);
            if entry.reply.send(response).is_err() {
                // Waiter timed out and went away; it already answered for
                // itself.
                debug!("Dropping response for departed waiter: id={}", entry.id);
            }
        }
    }
}

/// The single place a handler fault becomes a wire error. The alternate
/// format keeps the whole context chain in the message.
fn fault_response(fault: &anyhow::Error) -> ApiResponse {
    ApiResponse::error_with(ErrorKind::Generic, format!("{fault:#}"))
}
