#![allow(dead_code)]

use async_trait::async_trait;
use chat_widget::controller::{ ControllerConfig, ConversationController };
use chat_widget::error::ChatError;
use chat_widget::history::{ HistoryStore, MemoryHistoryStore };
use chat_widget::locale::Locale;
use chat_widget::models::chat::{ Conversation, WireMessage };
use chat_widget::transport::{ decode_fragments, ChatTransport, FragmentStream, ResponseMode };
use futures::stream::{ self, StreamExt };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use tokio::sync::oneshot;

#[derive(Clone)]
pub enum Reply {
    Batch(String),
    Chunks(Vec<Vec<u8>>),
    ChunksThenError(Vec<Vec<u8>>),
    /// Sends the chunks and then never finishes.
    ChunksThenHang(Vec<Vec<u8>>),
    Fail,
}

/// Scripted transport that records what it was asked and what the store held
/// at that moment.
pub struct FakeTransport {
    reply: Reply,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<WireMessage>>>,
    persisted_at_call: Mutex<Vec<Option<String>>>,
    store: Option<Arc<MemoryHistoryStore>>,
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            persisted_at_call: Mutex::new(Vec::new()),
            store: None,
            gate: tokio::sync::Mutex::new(None),
        }
    }

    pub fn observing(mut self, store: Arc<MemoryHistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Holds the first call until the returned sender fires.
    pub fn gated(self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let transport = Self {
            gate: tokio::sync::Mutex::new(Some(rx)),
            ..self
        };
        (transport, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<WireMessage>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn persisted_at_call(&self) -> Vec<Option<String>> {
        self.persisted_at_call.lock().unwrap().clone()
    }

    async fn record(&self, messages: &[WireMessage]) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());
        let persisted = match &self.store {
            Some(store) => store.raw().await,
            None => None,
        };
        self.persisted_at_call.lock().unwrap().push(persisted);

        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
    }
}

fn byte_stream(chunks: Vec<Vec<u8>>) -> impl futures::Stream<Item = Result<Vec<u8>, ChatError>> {
    stream::iter(chunks.into_iter().map(Ok))
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn complete(&self, messages: &[WireMessage]) -> Result<String, ChatError> {
        self.record(messages).await;
        match &self.reply {
            Reply::Batch(content) => Ok(content.clone()),
            Reply::Fail => Err(ChatError::Request { status: Some(503), message: "unavailable".to_string() }),
            _ => Err(ChatError::Decode("scripted for streaming".to_string())),
        }
    }

    async fn stream(&self, messages: &[WireMessage]) -> Result<FragmentStream, ChatError> {
        self.record(messages).await;
        match &self.reply {
            Reply::Chunks(chunks) => Ok(decode_fragments(byte_stream(chunks.clone()))),
            Reply::ChunksThenError(chunks) => {
                let failing = byte_stream(chunks.clone()).chain(
                    stream::once(async { Err(ChatError::request("connection reset")) })
                );
                Ok(decode_fragments(failing))
            }
            Reply::ChunksThenHang(chunks) => {
                Ok(decode_fragments(byte_stream(chunks.clone()).chain(stream::pending())))
            }
            Reply::Fail => Err(ChatError::request("connection refused")),
            Reply::Batch(_) => Err(ChatError::Decode("scripted for batch".to_string())),
        }
    }
}

/// Store whose writes always fail. Loads return whatever it was seeded with.
#[derive(Default)]
pub struct FailingStore {
    seeded: Conversation,
}

impl FailingStore {
    pub fn seeded(conversation: Conversation) -> Self {
        Self { seeded: conversation }
    }
}

#[async_trait]
impl HistoryStore for FailingStore {
    async fn load(&self) -> Conversation {
        self.seeded.clone()
    }

    async fn save(&self, _conversation: &Conversation) -> Result<(), ChatError> {
        Err(ChatError::Storage("disk full".to_string()))
    }

    async fn clear(&self) -> Result<(), ChatError> {
        Err(ChatError::Storage("read-only filesystem".to_string()))
    }
}

pub fn config(mode: ResponseMode) -> ControllerConfig {
    ControllerConfig { mode, locale: Locale::En }
}

pub async fn controller_with(
    store: Arc<MemoryHistoryStore>,
    transport: Arc<FakeTransport>,
    mode: ResponseMode
) -> ConversationController {
    ConversationController::new(store, transport, config(mode)).await
}
