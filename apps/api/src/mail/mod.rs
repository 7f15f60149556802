//! Mail provider boundary.
//!
//! The pipeline consumes an abstract capability set (list, get message, get
//! thread, send, relabel) and treats everything the provider returns as
//! external data. `GmailClient` is the production implementation; tests use
//! in-memory fakes implementing the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod gmail;
pub mod mime;

pub use gmail::GmailClient;

/// Label id Gmail stamps on a message once it has actually gone out.
/// The dispatcher gates label mutations on its presence in the send response.
pub const SENT_LABEL: &str = "SENT";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Decode(String),
}

/// One `(id, threadId)` pair from a mailbox search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: String,
}

/// A raw message header as the provider reports it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Body of a MIME part. `data` is base64url-encoded; attachments carry an
/// `attachment_id` instead of inline data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
}

/// One node of the provider's MIME part tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MimePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MimePart>,
}

/// A fetched message: identifiers, headers, label set, and the MIME payload.
/// Immutable once fetched; lives for one pipeline pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: Option<MimePart>,
}

/// An attachment descriptor pulled out of the part tree (metadata only, the
/// content is never downloaded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentInfo {
    pub filename: String,
    pub mime_type: String,
    pub attachment_id: Option<String>,
}

/// Thread view reduced to what the pipeline needs: how many messages it has.
#[derive(Debug, Clone)]
pub struct ThreadSummary {
    pub id: String,
    pub message_count: usize,
}

/// A threaded reply to send.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub thread_id: String,
    /// RFC 2822 Message-Id of the message being answered.
    pub in_reply_to: Option<String>,
}

/// Provider response to a send; `label_ids` carries the sent marker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
}

impl SendOutcome {
    pub fn was_sent(&self) -> bool {
        self.label_ids.iter().any(|l| l == SENT_LABEL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Abstract mail capability set consumed by the pipeline and dispatcher.
#[async_trait]
pub trait MailProvider: Send + Sync {
    async fn list_message_ids(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>, MailError>;

    async fn get_message(&self, id: &str) -> Result<InboundMessage, MailError>;

    async fn get_thread(&self, id: &str) -> Result<ThreadSummary, MailError>;

    async fn send_reply(&self, reply: &ReplyRequest) -> Result<SendOutcome, MailError>;

    /// Applies a label delta to a message. Takes label ids, not names.
    async fn modify_labels(
        &self,
        message_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailError>;

    /// Resolves a label name to its id, creating the label if missing.
    async fn ensure_label(&self, name: &str) -> Result<Label, MailError>;
}
