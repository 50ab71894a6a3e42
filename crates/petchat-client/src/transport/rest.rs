//! REST endpoints used next to the sockets.
//!
//! History pages heal gaps after a reconnect, `send_message` is the fallback
//! when the room socket is not connected, and `mark_as_read` backs
//! [`RestReceipts`].
//!
//! Unsafe methods carry a CSRF token fetched once from `{api}/csrf/` and
//! cached. A 403 drops the cached token so the next call fetches a fresh one.

use std::sync::Arc;

use parking_lot::Mutex;
use petchat_crypto::{MessageKey, decrypt_message};
use petchat_proto::{ChatId, MessageId, UserSummary};
use reqwest::{Method, RequestBuilder, StatusCode, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};

use crate::{Author, ChatMessage, ReadReceipts};

/// Default page size of the history endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// REST failures.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Request could not be sent or the body could not be read.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("{status}: {body}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The CSRF endpoint returned no token.
    #[error("csrf token missing from response")]
    MissingCsrf,
}

impl RestError {
    /// Whether the server rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

/// Query for one history page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePage {
    /// 1-based page number.
    pub page: u32,
    /// Messages per page.
    pub page_size: u32,
    /// Only messages older than this id.
    pub before_message_id: Option<MessageId>,
}

impl Default for MessagePage {
    fn default() -> Self {
        Self { page: 1, page_size: DEFAULT_PAGE_SIZE, before_message_id: None }
    }
}

/// A stored message as returned by the history and send endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestMessage {
    /// Message id.
    pub id: MessageId,
    /// Sender.
    pub author: UserSummary,
    /// Body, possibly sealed.
    #[serde(default)]
    pub body: String,
    /// Creation time.
    #[serde(default)]
    pub created: String,
}

impl RestMessage {
    /// Run the decrypt step and convert to the socket message shape.
    pub fn into_chat_message(self, key: Option<&MessageKey>) -> ChatMessage {
        let outcome = decrypt_message(key, &self.body);
        ChatMessage {
            id: self.id,
            author: Author { id: self.author.id, username: self.author.username },
            body: outcome.text,
            timestamp: self.created,
            decrypt: outcome.status,
        }
    }
}

/// Latest message preview in a chat group listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LastMessage {
    /// Message id.
    pub id: MessageId,
    /// Body, possibly sealed.
    #[serde(default)]
    pub body: String,
    /// Author username.
    #[serde(default)]
    pub author: String,
    /// Creation time.
    #[serde(default)]
    pub created: String,
}

/// A chat group the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatGroup {
    /// Group id.
    pub id: ChatId,
    /// Group name, also the room socket name.
    pub name: String,
    /// Direct conversation rather than a group.
    #[serde(default)]
    pub is_private: bool,
    /// Members currently online.
    #[serde(default)]
    pub online_count: u32,
    /// Total members.
    #[serde(default)]
    pub member_count: u32,
    /// Latest message, if any.
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    /// Members.
    #[serde(default)]
    pub members: Vec<UserSummary>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Paged { results } => results,
            Self::Plain(items) => items,
        }
    }
}

#[derive(Deserialize)]
struct CsrfResponse {
    #[serde(rename = "csrfToken", alias = "csrf_token", alias = "csrftoken")]
    token: Option<String>,
}

#[derive(Deserialize)]
struct UnreadCount {
    total_unread_count: u64,
}

#[derive(Serialize)]
struct NewChatGroup<'a> {
    name: &'a str,
    is_private: bool,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    invite_users: &'a [String],
}

/// Client for the chat REST API.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
    csrf: Arc<Mutex<Option<String>>>,
}

impl RestClient {
    /// Client for `api_base` (e.g. `http://localhost:8000/api`).
    pub fn new(api_base: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
            csrf: Arc::new(Mutex::new(None)),
        }
    }

    /// Fetch one history page of `chat`.
    pub async fn get_messages(
        &self,
        chat: ChatId,
        page: MessagePage,
    ) -> Result<Vec<RestMessage>, RestError> {
        let mut query = vec![
            ("page", page.page.to_string()),
            ("page_size", page.page_size.to_string()),
        ];
        if let Some(before) = page.before_message_id {
            query.push(("before_message_id", before.to_string()));
        }

        let request = self.request(Method::GET, &format!("chats/groups/{chat}/messages/")).await?;
        let listing: Listing<RestMessage> = Self::json(request.query(&query)).await?;
        Ok(listing.into_vec())
    }

    /// Post a message over REST. Used when the room socket is down.
    pub async fn send_message(&self, chat: ChatId, body: &str) -> Result<RestMessage, RestError> {
        let path = format!("chats/groups/{chat}/send_message/");
        let request = self.request(Method::POST, &path).await?;
        self.unsafe_json(request.json(&json!({ "body": body }))).await
    }

    /// Upload an image message.
    pub async fn send_image_message(
        &self,
        chat: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<RestMessage, RestError> {
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("image", part);

        let path = format!("chats/groups/{chat}/send_message/");
        let request = self.request(Method::POST, &path).await?;
        self.unsafe_json(request.multipart(form)).await
    }

    /// Mark every message in `chat` as read.
    pub async fn mark_as_read(&self, chat: ChatId) -> Result<(), RestError> {
        let path = format!("chats/groups/{chat}/mark_as_read/");
        let request = self.request(Method::POST, &path).await?;
        self.unsafe_send(request).await?;
        Ok(())
    }

    /// Unread messages across all chats.
    pub async fn unread_count(&self) -> Result<u64, RestError> {
        let request = self.request(Method::GET, "chats/groups/unread_count/").await?;
        let count: UnreadCount = Self::json(request).await?;
        Ok(count.total_unread_count)
    }

    /// Add `username` to `chat`.
    pub async fn invite_user(&self, chat: ChatId, username: &str) -> Result<(), RestError> {
        let path = format!("chats/groups/{chat}/invite_user/");
        let request = self.request(Method::POST, &path).await?;
        self.unsafe_send(request.json(&json!({ "username": username }))).await?;
        Ok(())
    }

    /// Chat groups the user belongs to.
    pub async fn chat_groups(&self) -> Result<Vec<ChatGroup>, RestError> {
        let request = self.request(Method::GET, "chats/groups/").await?;
        let listing: Listing<ChatGroup> = Self::json(request).await?;
        Ok(listing.into_vec())
    }

    /// Create a chat group and invite `invite_users` into it.
    pub async fn create_chat_group(
        &self,
        name: &str,
        is_private: bool,
        invite_users: &[String],
    ) -> Result<ChatGroup, RestError> {
        let request = self.request(Method::POST, "chats/groups/").await?;
        let body = NewChatGroup { name, is_private, invite_users };
        self.unsafe_json(request.json(&body)).await
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RestError> {
        let unsafe_method = !matches!(method, Method::GET | Method::HEAD | Method::OPTIONS);
        let url = format!("{}/{}", self.api_base, path);
        let mut request = self.http.request(method, url);

        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("Token {token}"));
        }
        if unsafe_method {
            request = request.header("X-CSRFToken", self.csrf_token().await?);
        }

        Ok(request)
    }

    async fn csrf_token(&self) -> Result<String, RestError> {
        let cached = self.csrf.lock().clone();
        if let Some(token) = cached {
            return Ok(token);
        }

        let response = self.http.get(format!("{}/csrf/", self.api_base)).send().await?;
        let response = Self::check(response).await?;
        let token = response.json::<CsrfResponse>().await?.token.ok_or(RestError::MissingCsrf)?;

        debug!("fetched csrf token");
        *self.csrf.lock() = Some(token.clone());
        Ok(token)
    }

    async fn unsafe_send(&self, request: RequestBuilder) -> Result<reqwest::Response, RestError> {
        let result = match request.send().await {
            Ok(response) => Self::check(response).await,
            Err(err) => Err(err.into()),
        };

        if let Err(RestError::Status { status, .. }) = &result
            && *status == StatusCode::FORBIDDEN
        {
            self.csrf.lock().take();
        }
        result
    }

    async fn unsafe_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RestError> {
        Ok(self.unsafe_send(request).await?.json().await?)
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RestError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RestError::Status { status, body })
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("api_base", &self.api_base)
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

/// [`ReadReceipts`] that posts `mark_as_read` in a spawned task.
///
/// Must be used inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct RestReceipts {
    client: RestClient,
    runtime: tokio::runtime::Handle,
}

impl RestReceipts {
    /// Receipts through `client`, spawned on the current runtime.
    pub fn new(client: RestClient) -> Self {
        Self { client, runtime: tokio::runtime::Handle::current() }
    }
}

impl ReadReceipts for RestReceipts {
    fn mark_as_read(&self, chat: ChatId) {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            if let Err(err) = client.mark_as_read(chat).await {
                warn!(%chat, error = %err, "mark as read failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use petchat_crypto::DecryptStatus;

    use super::*;

    #[test]
    fn listing_accepts_paged_and_plain() {
        let paged: Listing<ChatGroup> =
            serde_json::from_str(r#"{"count":1,"results":[{"id":3,"name":"dogs"}]}"#).unwrap();
        let plain: Listing<ChatGroup> =
            serde_json::from_str(r#"[{"id":3,"name":"dogs","is_private":true}]"#).unwrap();

        assert_eq!(paged.into_vec()[0].name, "dogs");
        assert!(plain.into_vec()[0].is_private);
    }

    #[test]
    fn rest_message_passes_plaintext_through() {
        let raw = r#"{"id":9,"author":{"id":2,"username":"rex"},"body":"woof","created":"now"}"#;
        let message: RestMessage = serde_json::from_str(raw).unwrap();

        let chat = message.into_chat_message(None);
        assert_eq!(chat.id, MessageId(9));
        assert_eq!(chat.author.username, "rex");
        assert_eq!(chat.body, "woof");
        assert_eq!(chat.decrypt, DecryptStatus::Plaintext);
    }

    #[test]
    fn csrf_response_accepts_django_name() {
        let parsed: CsrfResponse = serde_json::from_str(r#"{"csrfToken":"abc"}"#).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("abc"));
    }

    #[test]
    fn unauthorized_is_detected() {
        let err = RestError::Status { status: StatusCode::UNAUTHORIZED, body: String::new() };
        assert!(err.is_unauthorized());
        assert!(!RestError::MissingCsrf.is_unauthorized());
    }
}
