use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Frame of {0} bytes exceeds maximum frame size")]
    OversizedFrame(usize),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
