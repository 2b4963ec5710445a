//! Registry mapping a command `kind` string to its handler.
//!
//! Handlers are polymorphic over a small capability set: declare required
//! parameters, execute against the engine, and decode a success payload into
//! the most specific reply type they know. The built-in command set is
//! registered at construction; hosts may add their own handlers on top.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::api::ApiRequest;
use crate::engine::DebugEngine;
use crate::types::CommandReply;

pub trait CommandHandler: Send + Sync {
    fn kind(&self) -> &'static str;

    fn required_parameters(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check the request against the declared parameter schema. Returns the
    /// first missing field name, if any.
    fn validate(&self, request: &ApiRequest) -> Result<(), &'static str> {
        for field in self.required_parameters() {
            if !request.parameters.contains_key(*field) {
                return Err(*field);
            }
        }
        Ok(())
    }

    fn execute(&self, engine: &dyn DebugEngine, request: &ApiRequest) -> anyhow::Result<Value>;

    /// Decode a success payload into this command's specific reply type.
    fn decode_reply(&self, payload: Value) -> serde_json::Result<CommandReply> {
        Ok(CommandReply::Raw(payload))
    }
}

pub struct CommandRegistry {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// An empty registry, for hosts that supply their own command set.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry pre-populated with the built-in commands.
    pub fn with_builtin_commands() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::commands::version::VersionCommand));
        registry.register(Arc::new(crate::commands::state::StateCommand));
        registry.register(Arc::new(crate::commands::memory::ReadMemoryCommand));
        registry.register(Arc::new(crate::commands::registers::ReadRegistersCommand));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    pub fn lookup(&self, kind: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoCommand;

    impl CommandHandler for EchoCommand {
        fn kind(&self) -> &'static str {
            "echo"
        }

        fn required_parameters(&self) -> &'static [&'static str] {
            &["text"]
        }

        fn execute(&self, _engine: &dyn DebugEngine, request: &ApiRequest) -> anyhow::Result<Value> {
            Ok(json!({"text": request.parameters["text"]}))
        }
    }

    #[test]
    fn test_builtin_commands_registered() {
        let registry = CommandRegistry::with_builtin_commands();
        for kind in ["version", "state", "read_memory", "read_registers"] {
            assert!(registry.lookup(kind).is_some(), "missing builtin {kind}");
        }
    }

    #[test]
    fn test_lookup_unknown_kind() {
        let registry = CommandRegistry::with_builtin_commands();
        assert!(registry.lookup("nonexistent").is_none());
    }

    #[test]
    fn test_register_custom_handler() {
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(EchoCommand));
        assert!(registry.lookup("echo").is_some());
        assert!(registry.lookup("version").is_none());
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        let handler = EchoCommand;
        let request = ApiRequest::new("echo");
        assert_eq!(handler.validate(&request), Err("text"));

        let request = ApiRequest::new("echo").with_param("text", "hi");
        assert_eq!(handler.validate(&request), Ok(()));
    }

    #[test]
    fn test_default_decode_reply_is_raw() {
        let handler = EchoCommand;
        let reply = handler
            .decode_reply(json!({"text": "hi"}))
            .expect("decode should succeed");
        assert!(matches!(reply, CommandReply::Raw(_)));
    }
}
