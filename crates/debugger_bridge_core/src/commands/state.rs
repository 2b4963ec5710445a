use serde_json::{json, Value};

use crate::api::ApiRequest;
use crate::engine::DebugEngine;
use crate::registry::CommandHandler;
use crate::types::{CommandReply, StateResponse};

pub const KIND: &str = "state";

/// Reports the target's execution state as of the last halt.
pub struct StateCommand;

impl CommandHandler for StateCommand {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn execute(&self, engine: &dyn DebugEngine, _request: &ApiRequest) -> anyhow::Result<Value> {
        let state = engine.target_state()?;
        Ok(json!({ "state": state }))
    }

    fn decode_reply(&self, payload: Value) -> serde_json::Result<CommandReply> {
        serde_json::from_value::<StateResponse>(payload).map(CommandReply::State)
    }
}

pub fn request() -> ApiRequest {
    ApiRequest::blocking(KIND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::StubEngine;
    use crate::engine::TargetState;

    #[test]
    fn test_state_reports_engine_state() {
        let engine = StubEngine {
            state: TargetState::Running,
            ..StubEngine::default()
        };
        let payload = StateCommand
            .execute(&engine, &request())
            .expect("state should succeed");
        assert_eq!(payload["state"], "running");
    }

    #[test]
    fn test_state_reply_decodes_typed() {
        let engine = StubEngine::default();
        let payload = StateCommand
            .execute(&engine, &request())
            .expect("state should succeed");
        match StateCommand.decode_reply(payload).expect("typed decode") {
            CommandReply::State(reply) => assert_eq!(reply.state, TargetState::Stopped),
            other => panic!("expected State reply, got {other:?}"),
        }
    }

    #[test]
    fn test_state_request_is_blocking() {
        assert!(request().blocking);
    }
}
