use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::TargetState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub api_version: u32,
    pub host_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: TargetState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryResponse {
    pub address: u64,
    pub length: usize,
    pub data_base64: String,
}

impl MemoryResponse {
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.data_base64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistersResponse {
    pub registers: BTreeMap<String, u64>,
}

/// A success payload decoded into the most specific type the registry knows
/// for the originating request's kind. Kinds without a declared reply type
/// stay `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Version(VersionResponse),
    State(StateResponse),
    Memory(MemoryResponse),
    Registers(RegistersResponse),
    Raw(Value),
}
