use async_trait::async_trait;
use tokio::sync::Mutex;
use crate::error::ChatError;
use crate::history::{ decode_or_empty, encode_conversation, HistoryStore };
use crate::models::chat::Conversation;

/// Keeps the serialized history in memory. Goes through the same JSON
/// encoding as the file store.
#[derive(Default)]
pub struct MemoryHistoryStore {
    raw: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
            saves: Mutex::new(0),
        }
    }

    pub async fn raw(&self) -> Option<String> {
        self.raw.lock().await.clone()
    }

    pub async fn save_count(&self) -> usize {
        *self.saves.lock().await
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self) -> Conversation {
        match self.raw.lock().await.as_deref() {
            Some(raw) => decode_or_empty(raw, "memory"),
            None => Conversation::new(),
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), ChatError> {
        let json = encode_conversation(conversation)?;
        *self.raw.lock().await = Some(json);
        *self.saves.lock().await += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), ChatError> {
        *self.raw.lock().await = None;
        Ok(())
    }
}
