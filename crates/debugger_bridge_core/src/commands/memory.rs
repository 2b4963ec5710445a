use anyhow::Context as _;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::api::ApiRequest;
use crate::engine::DebugEngine;
use crate::registry::CommandHandler;
use crate::types::{CommandReply, MemoryResponse};

pub const KIND: &str = "read_memory";

/// Reads a range of target memory. Blocking: touching target memory requires
/// an engine halt window. Bytes travel base64-encoded inside the JSON payload.
pub struct ReadMemoryCommand;

impl CommandHandler for ReadMemoryCommand {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn required_parameters(&self) -> &'static [&'static str] {
        &["address", "length"]
    }

    fn execute(&self, engine: &dyn DebugEngine, request: &ApiRequest) -> anyhow::Result<Value> {
        let address = request
            .parameters
            .get("address")
            .context("missing address parameter")
            .and_then(parse_address)?;
        let length = request
            .parameters
            .get("length")
            .context("missing length parameter")
            .and_then(parse_length)?;
        let data = engine
            .read_memory(address, length)
            .with_context(|| format!("reading {length} bytes at {address:#x}"))?;
        Ok(json!({
            "address": address,
            "length": data.len(),
            "data_base64": BASE64_STANDARD.encode(&data),
        }))
    }

    fn decode_reply(&self, payload: Value) -> serde_json::Result<CommandReply> {
        serde_json::from_value::<MemoryResponse>(payload).map(CommandReply::Memory)
    }
}

pub fn request(address: u64, length: usize) -> ApiRequest {
    ApiRequest::blocking(KIND)
        .with_param("address", address)
        .with_param("length", length as u64)
}

/// Addresses arrive as JSON integers or as strings, decimal or 0x-prefixed
/// hex (the named-parameter route only carries strings).
fn parse_address(value: &Value) -> anyhow::Result<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| anyhow::anyhow!("address must be a non-negative integer")),
        Value::String(s) => {
            let s = s.trim();
            let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => s.parse::<u64>(),
            };
            parsed.map_err(|_| anyhow::anyhow!("unparseable address '{s}'"))
        }
        other => anyhow::bail!("address must be an integer or string, got {other}"),
    }
}

fn parse_length(value: &Value) -> anyhow::Result<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| anyhow::anyhow!("length must be a non-negative integer")),
        Value::String(s) => s
            .trim()
            .parse::<usize>()
            .map_err(|_| anyhow::anyhow!("unparseable length '{s}'")),
        other => anyhow::bail!("length must be an integer or string, got {other}"),
    }
}
