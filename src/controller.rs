use futures::{ FutureExt, StreamExt };
use futures::future::Fuse;
use log::{ debug, error, info, warn };
use std::sync::Arc;
use tokio::sync::{ mpsc, oneshot, Mutex };
use crate::error::ChatError;
use crate::history::HistoryStore;
use crate::locale::Locale;
use crate::models::chat::{ ChatMessage, Conversation, WireMessage };
use crate::models::event::ChatEvent;
use crate::reconciler::StreamReconciler;
use crate::transport::{ ChatTransport, ResponseMode };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingResponse,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    /// The turn failed and the fallback reply was appended.
    Failed {
        reason: String,
    },
    /// Cancelled by the caller. Streamed text received so far is kept.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub mode: ResponseMode,
    pub locale: Locale,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            mode: ResponseMode::Stream,
            locale: Locale::Fa,
        }
    }
}

type CancelSignal = Fuse<oneshot::Receiver<()>>;

struct Inner {
    conversation: Conversation,
    state: TurnState,
    mode: ResponseMode,
    cancel: Option<oneshot::Sender<()>>,
}

/// Drives one conversation: validates input, runs at most one turn at a
/// time against the transport and keeps the store in sync after every
/// change.
pub struct ConversationController {
    store: Arc<dyn HistoryStore>,
    transport: Arc<dyn ChatTransport>,
    locale: Locale,
    inner: Mutex<Inner>,
    events: Option<mpsc::Sender<ChatEvent>>,
}

impl ConversationController {
    pub async fn new(
        store: Arc<dyn HistoryStore>,
        transport: Arc<dyn ChatTransport>,
        config: ControllerConfig
    ) -> Self {
        let conversation = store.load().await;
        info!("Restored {} messages from chat history", conversation.len());
        Self {
            store,
            transport,
            locale: config.locale,
            inner: Mutex::new(Inner {
                conversation,
                state: TurnState::Idle,
                mode: config.mode,
                cancel: None,
            }),
            events: None,
        }
    }

    pub fn with_events(mut self, events: mpsc::Sender<ChatEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub async fn conversation(&self) -> Conversation {
        self.inner.lock().await.conversation.clone()
    }

    pub async fn state(&self) -> TurnState {
        self.inner.lock().await.state
    }

    pub async fn mode(&self) -> ResponseMode {
        self.inner.lock().await.mode
    }

    pub async fn set_mode(&self, mode: ResponseMode) -> Result<(), ChatError> {
        let mut inner = self.inner.lock().await;
        if inner.state == TurnState::AwaitingResponse {
            return Err(ChatError::Busy);
        }
        info!("Response mode switched from {} to {}", inner.mode, mode);
        inner.mode = mode;
        Ok(())
    }

    /// Signals the in-flight turn to stop. Returns false when nothing was
    /// running.
    pub async fn cancel(&self) -> bool {
        match self.inner.lock().await.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub async fn clear(&self) -> Result<(), ChatError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == TurnState::AwaitingResponse {
                return Err(ChatError::Busy);
            }
            self.store.clear().await?;
            inner.conversation = Conversation::new();
        }
        info!("Chat history cleared");
        self.emit(ChatEvent::Cleared).await;
        Ok(())
    }

    /// Runs one turn. Empty input and submissions made while a turn is in
    /// flight are rejected without touching the conversation; every other
    /// path ends back in `Idle`.
    pub async fn submit(&self, input: &str) -> Result<TurnOutcome, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::Validation("message is empty".to_string()));
        }

        let user_message = ChatMessage::user(text);
        let (wire, mode, cancel) = {
            let mut inner = self.inner.lock().await;
            if inner.state == TurnState::AwaitingResponse {
                warn!("Rejected submission while a response is in progress");
                return Err(ChatError::Busy);
            }
            inner.conversation = inner.conversation.append(user_message.clone());
            inner.state = TurnState::AwaitingResponse;
            let (tx, rx) = oneshot::channel();
            inner.cancel = Some(tx);
            self.persist(&inner.conversation).await;
            (inner.conversation.wire_messages(), inner.mode, rx.fuse())
        };
        self.emit(ChatEvent::MessageAppended(user_message)).await;
        self.emit(ChatEvent::TypingStarted(mode)).await;

        debug!("Starting {} turn with {} messages", mode, wire.len());
        let result = match mode {
            ResponseMode::Batch => self.run_batch(&wire, cancel).await,
            ResponseMode::Stream => self.run_stream(&wire, cancel).await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Chat turn failed: {}", e);
                let fallback = ChatMessage::assistant(self.locale.fallback_reply());
                self.append(fallback).await;
                TurnOutcome::Failed { reason: e.to_string() }
            }
        };

        {
            let mut inner = self.inner.lock().await;
            inner.state = TurnState::Idle;
            inner.cancel = None;
        }
        self.emit(ChatEvent::TypingStopped).await;
        Ok(outcome)
    }

    async fn run_batch(
        &self,
        wire: &[WireMessage],
        mut cancel: CancelSignal
    ) -> Result<TurnOutcome, ChatError> {
        let content = tokio::select! {
            result = self.transport.complete(wire) => result?,
            Ok(()) = &mut cancel => {
                info!("Batch request cancelled");
                return Ok(TurnOutcome::Cancelled);
            }
        };
        self.append(ChatMessage::assistant(content)).await;
        Ok(TurnOutcome::Completed)
    }

    async fn run_stream(
        &self,
        wire: &[WireMessage],
        mut cancel: CancelSignal
    ) -> Result<TurnOutcome, ChatError> {
        let mut fragments = tokio::select! {
            result = self.transport.stream(wire) => result?,
            Ok(()) = &mut cancel => {
                info!("Stream cancelled before the response arrived");
                return Ok(TurnOutcome::Cancelled);
            }
        };

        let mut reconciler = StreamReconciler::new();
        let mut received = 0usize;
        loop {
            let next = tokio::select! {
                next = fragments.next() => next,
                Ok(()) = &mut cancel => {
                    info!("Stream cancelled after {} fragments", received);
                    return Ok(TurnOutcome::Cancelled);
                }
            };
            let fragment = match next {
                Some(Ok(fragment)) => fragment,
                // Partial content stays in place.
                Some(Err(e)) => return Err(e),
                None => break,
            };
            received += 1;

            let previous = reconciler.message().map(|m| m.id.clone());
            let updated = {
                let mut inner = self.inner.lock().await;
                match reconciler.apply(&inner.conversation, &fragment) {
                    Some((conversation, message)) => {
                        inner.conversation = conversation;
                        self.persist(&inner.conversation).await;
                        Some(message)
                    }
                    None => None,
                }
            };
            if let Some(message) = updated {
                let event = if previous.as_deref() == Some(message.id.as_str()) {
                    ChatEvent::MessageUpdated(message)
                } else {
                    ChatEvent::MessageAppended(message)
                };
                self.emit(event).await;
            }
        }

        if reconciler.finish().is_none() {
            warn!("Stream completed without any visible content ({} fragments)", received);
        }
        Ok(TurnOutcome::Completed)
    }

    async fn append(&self, message: ChatMessage) {
        {
            let mut inner = self.inner.lock().await;
            inner.conversation = inner.conversation.append(message.clone());
            self.persist(&inner.conversation).await;
        }
        self.emit(ChatEvent::MessageAppended(message)).await;
    }

    async fn persist(&self, conversation: &Conversation) {
        if let Err(e) = self.store.save(conversation).await {
            warn!("Failed to persist chat history: {}", e);
        }
    }

    async fn emit(&self, event: ChatEvent) {
        if let Some(events) = &self.events {
            if events.send(event).await.is_err() {
                debug!("Chat event receiver dropped");
            }
        }
    }
}
