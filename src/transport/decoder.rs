use futures::{ stream, Stream, StreamExt };
use crate::error::ChatError;
use super::FragmentStream;

/// Incremental UTF-8 decoder. Bytes of a character split across chunk
/// boundaries are held back until the rest of the character arrives, so at
/// most three bytes are pending between calls.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> Result<String, ChatError> {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_some() => {
                return Err(
                    ChatError::Decode(format!("invalid UTF-8 sequence at byte {}", e.valid_up_to()))
                );
            }
            Err(e) => e.valid_up_to(),
        };
        let complete: Vec<u8> = self.pending.drain(..valid).collect();
        String::from_utf8(complete).map_err(|e| ChatError::Decode(e.to_string()))
    }

    pub fn finish(&mut self) -> Result<(), ChatError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            let dangling = self.pending.len();
            self.pending.clear();
            Err(ChatError::Decode(format!("stream ended inside a multi-byte character ({} bytes)", dangling)))
        }
    }
}

/// Turns a byte stream into a lazy stream of decoded text fragments. The
/// first failure is yielded once and ends the stream.
pub fn decode_fragments<S, B, E>(bytes: S) -> FragmentStream
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Into<ChatError> + Send + 'static
{
    let state = Some((Box::pin(bytes), Utf8StreamDecoder::new()));
    Box::pin(
        stream::unfold(state, |state| async move {
            let (mut bytes, mut decoder) = state?;
            loop {
                match bytes.next().await {
                    Some(Ok(chunk)) =>
                        match decoder.decode(chunk.as_ref()) {
                            Ok(text) if text.is_empty() => {
                                continue;
                            }
                            Ok(text) => {
                                return Some((Ok(text), Some((bytes, decoder))));
                            }
                            Err(e) => {
                                return Some((Err(e), None));
                            }
                        }
                    Some(Err(e)) => {
                        return Some((Err(e.into()), None));
                    }
                    None => {
                        return match decoder.finish() {
                            Ok(()) => None,
                            Err(e) => Some((Err(e), None)),
                        };
                    }
                }
            }
        })
    )
}
