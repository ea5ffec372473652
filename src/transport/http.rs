use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, Response, header::{ HeaderMap, HeaderValue, ACCEPT } };
use crate::error::ChatError;
use crate::models::api::{ ChatCompletion, ChatRequest, ErrorBody };
use crate::models::chat::WireMessage;
use super::{ decode_fragments, ChatTransport, FragmentStream, TransportConfig };

const MAX_ERROR_BODY: usize = 512;

/// Talks to the chat backend over HTTP. Never retries.
pub struct HttpChatTransport {
    http: HttpClient,
    config: TransportConfig,
}

impl HttpChatTransport {
    pub fn new(config: TransportConfig) -> Result<Self, ChatError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(ChatError::Validation(format!("Invalid base URL: '{}'", config.base_url)));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChatError::request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), route.trim_start_matches('/'))
    }

    async fn post(&self, route: &str, messages: &[WireMessage]) -> Result<Response, ChatError> {
        let url = self.url(route);
        let body = ChatRequest { messages: messages.to_vec() };
        debug!("POST {} ({} messages)", url, body.messages.len());

        let resp = self.http.post(&url).json(&body).send().await.map_err(|e| {
            error!("Chat request to {} failed: {}", url, e);
            ChatError::from(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = error_message(&text).unwrap_or_else(|| status.to_string());
            error!("Chat backend returned {}: {}", status, message);
            return Err(ChatError::Request {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(resp)
    }
}

/// Extracts something printable from a JSON `{"error": ...}` or plain-text
/// error body.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(trimmed) {
        return Some(parsed.error);
    }
    Some(trimmed.chars().take(MAX_ERROR_BODY).collect())
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn complete(&self, messages: &[WireMessage]) -> Result<String, ChatError> {
        let resp = self.post(&self.config.batch_route, messages).await?;
        let bytes = resp.bytes().await?;
        let completion: ChatCompletion = serde_json::from_slice(&bytes)?;
        completion
            .into_content()
            .ok_or_else(|| ChatError::Decode("response contained no choices".to_string()))
    }

    async fn stream(&self, messages: &[WireMessage]) -> Result<FragmentStream, ChatError> {
        let resp = self.post(&self.config.stream_route, messages).await?;
        Ok(decode_fragments(resp.bytes_stream()))
    }
}
