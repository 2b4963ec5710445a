use serde_json::{json, Value};

use crate::api::ApiRequest;
use crate::engine::DebugEngine;
use crate::registry::CommandHandler;
use crate::types::{CommandReply, RegistersResponse};

pub const KIND: &str = "read_registers";

/// Reads the register file of the halted target.
pub struct ReadRegistersCommand;

impl CommandHandler for ReadRegistersCommand {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn execute(&self, engine: &dyn DebugEngine, _request: &ApiRequest) -> anyhow::Result<Value> {
        let registers = engine.read_registers()?;
        Ok(json!({ "registers": registers }))
    }

    fn decode_reply(&self, payload: Value) -> serde_json::Result<CommandReply> {
        serde_json::from_value::<RegistersResponse>(payload).map(CommandReply::Registers)
    }
}

pub fn request() -> ApiRequest {
    ApiRequest::blocking(KIND)
}
