//! The command envelope exchanged between clients and the bridge server.
//!
//! Both sides of the wire speak JSON: a request names a command `kind`, a
//! bag of named parameters, and whether the caller is willing to wait for an
//! engine halt window (`blocking`). A response is either a success carrying a
//! handler-specific payload or one of a closed set of typed errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version of the bridge command protocol, reported by the `version` command.
pub const API_VERSION: u32 = 1;

/// Closed taxonomy of wire-level error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    EngineNotPresent,
    PluginNotFound,
    MissingField,
    TimedOut,
    EmptyResponse,
    Generic,
}

/// One command invocation as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub blocking: bool,
    /// Lifecycle flag, never serialized: set once when a blocking wait
    /// expires before the engine drains the request.
    #[serde(skip)]
    pub timed_out: bool,
}

impl ApiRequest {
    /// A non-blocking request with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            parameters: Map::new(),
            blocking: false,
            timed_out: false,
        }
    }

    /// A blocking request: the caller waits for the engine's next halt window.
    pub fn blocking(kind: impl Into<String>) -> Self {
        Self {
            blocking: true,
            ..Self::new(kind)
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Build a request from a flat string-typed key/value set, as submitted
    /// through the named-parameter route variant. Equivalent to the generic
    /// form with every parameter value a JSON string.
    pub fn from_kv<I, K, V>(kind: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::new(kind);
        for (name, value) in pairs {
            request
                .parameters
                .insert(name.into(), Value::String(value.into()));
        }
        request
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Outcome of one command invocation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl ApiResponse {
    pub fn success(payload: Value) -> Self {
        Self {
            is_error: false,
            status: None,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn error(kind: ErrorKind) -> Self {
        Self {
            is_error: true,
            status: Some(kind),
            message: None,
            payload: None,
        }
    }

    pub fn error_with(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::error(kind)
        }
    }

    pub fn missing_field(name: &str) -> Self {
        Self::error_with(ErrorKind::MissingField, format!("missing field: {name}"))
    }

    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
