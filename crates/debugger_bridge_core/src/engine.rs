//! The opaque debugger-engine capability.
//!
//! The bridge never owns a debugger; the host process hands it one (or takes
//! it away) at runtime. Command handlers only ever see this trait, and the
//! server only calls into it from the engine's own halt callback context.
//! The engine is not safe to touch from listener threads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Execution state of the debug target as the engine last reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Invalid,
    Stopped,
    Running,
    Exited,
}

pub trait DebugEngine: Send + Sync {
    /// Name and version of the hosting debugger, e.g. "lldb-1403.0.17".
    fn host_version(&self) -> String;

    fn target_state(&self) -> anyhow::Result<TargetState>;

    fn read_memory(&self, address: u64, length: usize) -> anyhow::Result<Vec<u8>>;

    fn read_registers(&self) -> anyhow::Result<BTreeMap<String, u64>>;
}
