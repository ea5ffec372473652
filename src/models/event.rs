use super::chat::ChatMessage;
use crate::transport::ResponseMode;

/// Notifications emitted by the controller so a view can refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// A turn is awaiting its reply in the given mode.
    TypingStarted(ResponseMode),
    MessageAppended(ChatMessage),
    MessageUpdated(ChatMessage),
    TypingStopped,
    Cleared,
}
