use async_trait::async_trait;
use log::{ debug, warn };
use std::path::{ Path, PathBuf };
use tokio::fs;
use crate::error::ChatError;
use crate::history::{ decode_or_empty, encode_conversation, HistoryStore };
use crate::models::chat::Conversation;

/// Persists the conversation as one JSON array in `<dir>/<key>.json`.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: PathBuf, storage_key: &str) -> Result<Self, ChatError> {
        let key = storage_key.trim();
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(ChatError::Validation(format!("Invalid storage key: '{}'", storage_key)));
        }
        Ok(Self {
            path: dir.join(format!("{}.json", key)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self) -> Conversation {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => decode_or_empty(&raw, &self.path.display().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No chat history at {}", self.path.display());
                Conversation::new()
            }
            Err(e) => {
                warn!("Failed to read chat history {}: {}", self.path.display(), e);
                Conversation::new()
            }
        }
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), ChatError> {
        let json = encode_conversation(conversation)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        fs::write(&temp, json).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), ChatError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
