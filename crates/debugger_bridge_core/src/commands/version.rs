use serde_json::{json, Value};

use crate::api::{ApiRequest, API_VERSION};
use crate::engine::DebugEngine;
use crate::registry::CommandHandler;
use crate::types::{CommandReply, VersionResponse};

pub const KIND: &str = "version";

/// Reports the bridge API version and the hosting debugger's version.
/// Non-blocking: reading engine metadata needs no halt window.
pub struct VersionCommand;

impl CommandHandler for VersionCommand {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn execute(&self, engine: &dyn DebugEngine, _request: &ApiRequest) -> anyhow::Result<Value> {
        Ok(json!({
            "api_version": API_VERSION,
            "host_version": engine.host_version(),
        }))
    }

    fn decode_reply(&self, payload: Value) -> serde_json::Result<CommandReply> {
        serde_json::from_value::<VersionResponse>(payload).map(CommandReply::Version)
    }
}

pub fn request() -> ApiRequest {
    ApiRequest::new(KIND)
}
