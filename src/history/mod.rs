mod file;
mod memory;

pub use file::FileHistoryStore;
pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::{ info, warn };
use std::path::PathBuf;
use std::sync::Arc;
use crate::cli::Args;
use crate::error::ChatError;
use crate::models::chat::{ ChatMessage, Conversation };

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Restores the persisted conversation. Missing or malformed data yields
    /// an empty conversation.
    async fn load(&self) -> Conversation;

    async fn save(&self, conversation: &Conversation) -> Result<(), ChatError>;

    async fn clear(&self) -> Result<(), ChatError>;
}

pub fn encode_conversation(conversation: &Conversation) -> Result<String, ChatError> {
    Ok(serde_json::to_string(conversation.messages())?)
}

pub fn decode_conversation(raw: &str) -> Result<Conversation, ChatError> {
    let messages: Vec<ChatMessage> = serde_json::from_str(raw)?;
    Ok(Conversation::from(messages))
}

/// Soft decode used by `load`: anything that is not a well-formed message
/// array is treated as no history.
pub(crate) fn decode_or_empty(raw: &str, source: &str) -> Conversation {
    match decode_conversation(raw) {
        Ok(conversation) => conversation,
        Err(e) => {
            warn!("Ignoring malformed chat history in {}: {}", source, e);
            Conversation::new()
        }
    }
}

pub fn create_history_store(args: &Args) -> Result<Arc<dyn HistoryStore>, ChatError> {
    match args.history_type.to_lowercase().as_str() {
        "file" => {
            let store = FileHistoryStore::new(PathBuf::from(&args.history_dir), &args.storage_key)?;
            info!("Chat history will be stored in: {}", store.path().display());
            Ok(Arc::new(store))
        }
        "memory" => {
            info!("Chat history will be kept in memory only");
            Ok(Arc::new(MemoryHistoryStore::new()))
        }
        other => Err(ChatError::Validation(format!("Unsupported history store type: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_browser_style_history() {
        let raw = r#"[
            {"id":"1700000000000","role":"user","content":"سلام","timestamp":"2024-05-01T10:15:00.000Z"},
            {"id":"1700000000001","role":"assistant","content":"hello","timestamp":"2024-05-01T10:15:02.500Z"}
        ]"#;

        let conversation = decode_conversation(raw).unwrap();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].content, "سلام");
        assert_eq!(conversation.messages()[1].role, Role::Assistant);
        assert_eq!(
            conversation.messages()[1].timestamp.to_rfc3339(),
            "2024-05-01T10:15:02.500+00:00"
        );
    }

    #[test]
    fn shape_mismatches_fall_back_to_empty() {
        let cases = [
            "not json",
            r#"{"messages": []}"#,
            r#"[{"id":"1","role":"system","content":"x","timestamp":"2024-05-01T10:15:00Z"}]"#,
            r#"[{"id":"1","role":"user","content":"x","timestamp":"yesterday"}]"#,
            r#"[{"id":1,"role":"user","content":"x","timestamp":"2024-05-01T10:15:00Z"}]"#,
            r#"[{"role":"user","content":"x"}]"#,
        ];

        for raw in cases {
            assert!(decode_or_empty(raw, "test").is_empty(), "expected empty history for {}", raw);
        }
    }

    #[test]
    fn encode_then_decode_preserves_pairs_and_instants() {
        let conversation = Conversation::new()
            .append(ChatMessage::user("first"))
            .append(ChatMessage::assistant("second"));

        let restored = decode_conversation(&encode_conversation(&conversation).unwrap()).unwrap();

        assert_eq!(restored.wire_messages(), conversation.wire_messages());
        for (a, b) in restored.messages().iter().zip(conversation.messages()) {
            assert_eq!(a.timestamp, b.timestamp);
            assert_eq!(a.id, b.id);
        }
    }
}
