pub mod decoder;
pub mod http;

pub use decoder::{ decode_fragments, Utf8StreamDecoder };
pub use http::HttpChatTransport;

use async_trait::async_trait;
use futures::Stream;
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use crate::cli::Args;
use crate::error::ChatError;
use crate::models::chat::WireMessage;

/// Decoded text fragments in arrival order. Finite, and ends after the first
/// error it yields.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Batch,
    Stream,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseMode::Batch => write!(f, "batch"),
            ResponseMode::Stream => write!(f, "stream"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseResponseModeError {
    message: String,
}

impl fmt::Display for ParseResponseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseResponseModeError {}

impl FromStr for ResponseMode {
    type Err = ParseResponseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batch" | "mock" => Ok(ResponseMode::Batch),
            "stream" | "streaming" => Ok(ResponseMode::Stream),
            _ =>
                Err(ParseResponseModeError {
                    message: format!("Invalid response mode: '{}' (expected 'stream' or 'batch')", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    pub stream_route: String,
    pub batch_route: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            stream_route: "/api/chat".to_string(),
            batch_route: "/api/chatMock".to_string(),
        }
    }
}

impl TransportConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            base_url: args.base_url.clone(),
            stream_route: args.stream_route.clone(),
            batch_route: args.batch_route.clone(),
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Batch mode: one request, one complete assistant reply.
    async fn complete(&self, messages: &[WireMessage]) -> Result<String, ChatError>;

    /// Streaming mode: resolves once response headers arrive; the body is
    /// read lazily as the returned stream is polled.
    async fn stream(&self, messages: &[WireMessage]) -> Result<FragmentStream, ChatError>;
}

pub fn new_transport(config: &TransportConfig) -> Result<Arc<dyn ChatTransport>, ChatError> {
    let transport = HttpChatTransport::new(config.clone())?;
    Ok(Arc::new(transport))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes_case_insensitively() {
        assert_eq!("Stream".parse::<ResponseMode>(), Ok(ResponseMode::Stream));
        assert_eq!(" batch ".parse::<ResponseMode>(), Ok(ResponseMode::Batch));
        assert!("chatMock".parse::<ResponseMode>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for mode in [ResponseMode::Batch, ResponseMode::Stream] {
            assert_eq!(mode.to_string().parse::<ResponseMode>(), Ok(mode));
        }
    }
}
