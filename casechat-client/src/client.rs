//! HTTP client for the case chat API.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::store::MessageStore;
use async_trait::async_trait;
use casechat_core::{CaseId, Conversation, ConversationId, Message};
use casechat_streaming::{ByteStream, MessageTransport, StreamError, StreamResult};
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateConversationRequest<'a> {
    title: &'a str,
}

/// Client for the conversation endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client from a config.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        // No client-wide timeout: it would cut off long streamed replies.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ClientError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Set a custom HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Submit a message and return the raw streamed reply.
    ///
    /// The response is returned only for a success status; the body is not
    /// bounded by the JSON request timeout.
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> ClientResult<Response> {
        let url = self
            .config
            .endpoint(&["conversations", conversation_id.as_str(), "messages"])?;
        debug!(conversation_id = %conversation_id, "submitting message");

        let request = self
            .client
            .post(url)
            .header("Accept", "text/event-stream")
            .json(&SendMessageRequest { content });
        let response = self.execute(request).await?;
        Self::check_status(response).await
    }

    /// Fetch all persisted messages of a conversation.
    pub async fn get_messages(&self, conversation_id: &ConversationId) -> ClientResult<Vec<Message>> {
        let url = self
            .config
            .endpoint(&["conversations", conversation_id.as_str(), "messages"])?;
        self.json(self.client.get(url)).await
    }

    /// List the conversations of a case.
    pub async fn list_conversations(&self, case_id: &CaseId) -> ClientResult<Vec<Conversation>> {
        let url = self
            .config
            .endpoint(&["cases", case_id.as_str(), "conversations"])?;
        self.json(self.client.get(url)).await
    }

    /// Create a conversation in a case.
    ///
    /// A missing or blank title falls back to [`Conversation::DEFAULT_TITLE`].
    pub async fn create_conversation(
        &self,
        case_id: &CaseId,
        title: Option<&str>,
    ) -> ClientResult<Conversation> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(Conversation::DEFAULT_TITLE);
        let url = self
            .config
            .endpoint(&["cases", case_id.as_str(), "conversations"])?;
        self.json(self.client.post(url).json(&CreateConversationRequest { title }))
            .await
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let request = request.timeout(self.config.timeout);
        let response = Self::check_status(self.execute(request).await?).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.config.timeout))?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, self.config.timeout))
    }

    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "request failed");
        Err(ClientError::http(status.as_u16(), body))
    }
}

#[async_trait]
impl MessageTransport for ApiClient {
    async fn open_stream(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> StreamResult<ByteStream> {
        let response = self.send_message(conversation_id, content).await?;
        let body = response
            .bytes_stream()
            .map_err(|e| StreamError::Connection(e.to_string()));
        Ok(Box::pin(body))
    }
}

#[async_trait]
impl MessageStore for ApiClient {
    async fn fetch_messages(&self, conversation_id: &ConversationId) -> ClientResult<Vec<Message>> {
        self.get_messages(conversation_id).await
    }
}
