use crate::models::chat::{ ChatMessage, Conversation };

const FILLER: char = ' ';

/// Folds streamed text fragments into the assistant message of the current
/// turn. Fragments must be applied in arrival order.
///
/// The backend's single leading filler byte is kept in the buffer but not
/// rendered; the assistant message is created on the first fragment that
/// carries anything past it.
#[derive(Debug, Default)]
pub struct StreamReconciler {
    buffer: String,
    message: Option<ChatMessage>,
}

impl StreamReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn content(&self) -> &str {
        self.buffer.strip_prefix(FILLER).unwrap_or(&self.buffer)
    }

    /// The assistant message owned by this stream, once created.
    pub fn message(&self) -> Option<&ChatMessage> {
        self.message.as_ref()
    }

    /// Applies one fragment. Returns the updated conversation and the message
    /// as it now reads, or `None` when nothing visible changed.
    pub fn apply(
        &mut self,
        conversation: &Conversation,
        fragment: &str
    ) -> Option<(Conversation, ChatMessage)> {
        self.buffer.push_str(fragment);
        if self.content().is_empty() {
            return None;
        }

        let content = self.content().to_string();
        let updated = match &self.message {
            Some(current) if owns_last(conversation, current) => {
                let message = current.with_content(content);
                (conversation.replace_last(message.clone()), message)
            }
            // First visible text, or our message is no longer the trailing
            // entry: start a fresh assistant message at the end.
            _ => {
                let message = ChatMessage::assistant(content);
                (conversation.append(message.clone()), message)
            }
        };
        self.message = Some(updated.1.clone());
        Some(updated)
    }

    /// Ends reconciliation and returns the final message, if any was created.
    pub fn finish(self) -> Option<ChatMessage> {
        self.message
    }
}

fn owns_last(conversation: &Conversation, message: &ChatMessage) -> bool {
    conversation.last().map(|last| last.id == message.id).unwrap_or(false)
}

/// Folds a complete fragment sequence in one go.
pub fn reconcile_all<'a, I>(conversation: &Conversation, fragments: I) -> Conversation
    where I: IntoIterator<Item = &'a str>
{
    let mut reconciler = StreamReconciler::new();
    let mut current = conversation.clone();
    for fragment in fragments {
        if let Some((next, _)) = reconciler.apply(&current, fragment) {
            current = next;
        }
    }
    current
}
