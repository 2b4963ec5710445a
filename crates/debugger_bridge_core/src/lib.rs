//! Debugger Bridge Core
//!
//! Shared library for communicating with a live debugger over the bridge
//! protocol. Provides the JSON command envelope, the command registry the
//! server dispatches against, the engine capability boundary, and the client
//! proxy used by views and tooling to submit commands.

pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use api::{ApiRequest, ApiResponse, ErrorKind};
pub use client::{BridgeClient, ClientReply};
pub use config::{ClientConfig, Endpoint};
pub use engine::{DebugEngine, TargetState};
pub use error::BridgeError;
pub use registry::{CommandHandler, CommandRegistry};

/// Result type alias using BridgeError
pub type Result<T> = std::result::Result<T, BridgeError>;
