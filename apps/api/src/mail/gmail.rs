//! Gmail REST v1 implementation of [`MailProvider`].
//!
//! Replies are sent as base64url-encoded RFC 2822 messages with the original
//! `threadId` so Gmail keeps them in the candidate's conversation. Label ids
//! are resolved by name once and cached for the life of the client.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;

use super::{
    InboundMessage, Label, MailError, MailProvider, MessageSummary, ReplyRequest, SendOutcome,
    ThreadSummary,
};

pub struct GmailClient {
    client: Client,
    base: String,
    access_token: String,
    /// Address replies are sent from (the triaged mailbox).
    from_address: String,
    label_cache: Mutex<HashMap<String, Label>>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageSummary>,
}

#[derive(Debug, Deserialize)]
struct ThreadResponse {
    id: String,
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LabelsResponse {
    #[serde(default)]
    labels: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct GmailErrorBody {
    error: GmailErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GmailErrorDetail {
    message: String,
}

impl GmailClient {
    pub fn new(base: String, access_token: String, from_address: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base: base.trim_end_matches('/').to_string(),
            access_token,
            from_address,
            label_cache: Mutex::new(HashMap::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/gmail/v1/users/me/{}", self.base, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MailError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, MailError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MailError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GmailErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(MailError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response.json::<T>().await.map_err(MailError::Http)
    }

    /// Composes the RFC 2822 source of a threaded reply.
    fn compose_rfc822(&self, reply: &ReplyRequest) -> String {
        let mut lines = vec![
            format!("From: {}", self.from_address),
            format!("To: {}", reply.to),
            format!("Subject: {}", reply.subject),
        ];
        if let Some(parent) = &reply.in_reply_to {
            lines.push(format!("In-Reply-To: {parent}"));
            lines.push(format!("References: {parent}"));
        }
        lines.push("MIME-Version: 1.0".to_string());
        lines.push("Content-Type: text/plain; charset=\"UTF-8\"".to_string());
        lines.push(String::new());
        lines.push(reply.body_text.clone());
        lines.join("\r\n")
    }
}

#[async_trait]
impl MailProvider for GmailClient {
    async fn list_message_ids(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>, MailError> {
        let response: ListResponse = self
            .get_json(
                "messages",
                &[
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                ],
            )
            .await?;
        debug!("inbox search matched {} messages", response.messages.len());
        Ok(response.messages)
    }

    async fn get_message(&self, id: &str) -> Result<InboundMessage, MailError> {
        self.get_json(
            &format!("messages/{id}"),
            &[("format", "full".to_string())],
        )
        .await
    }

    async fn get_thread(&self, id: &str) -> Result<ThreadSummary, MailError> {
        let response: ThreadResponse = self
            .get_json(
                &format!("threads/{id}"),
                &[("format", "minimal".to_string())],
            )
            .await?;
        Ok(ThreadSummary {
            id: response.id,
            message_count: response.messages.len(),
        })
    }

    async fn send_reply(&self, reply: &ReplyRequest) -> Result<SendOutcome, MailError> {
        let raw = URL_SAFE_NO_PAD.encode(self.compose_rfc822(reply));
        self.post_json(
            "messages/send",
            &json!({ "raw": raw, "threadId": reply.thread_id }),
        )
        .await
    }

    async fn modify_labels(
        &self,
        message_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailError> {
        let _: serde_json::Value = self
            .post_json(
                &format!("messages/{message_id}/modify"),
                &json!({ "addLabelIds": add, "removeLabelIds": remove }),
            )
            .await?;
        Ok(())
    }

    async fn ensure_label(&self, name: &str) -> Result<Label, MailError> {
        let mut cache = self.label_cache.lock().await;
        if let Some(label) = cache.get(name) {
            return Ok(label.clone());
        }

        let listed: LabelsResponse = self.get_json("labels", &[]).await?;
        if let Some(label) = listed
            .labels
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
        {
            cache.insert(name.to_string(), label.clone());
            return Ok(label);
        }

        let created: Label = self
            .post_json(
                "labels",
                &json!({
                    "name": name,
                    "labelListVisibility": "labelShow",
                    "messageListVisibility": "show"
                }),
            )
            .await?;
        debug!("created label '{}' ({})", created.name, created.id);
        cache.insert(name.to_string(), created.clone());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GmailClient {
        GmailClient::new(
            "https://gmail.googleapis.com".to_string(),
            "token".to_string(),
            "careers@example.com".to_string(),
        )
    }

    #[test]
    fn test_compose_rfc822_threads_on_parent() {
        let reply = ReplyRequest {
            to: "jane@example.com".to_string(),
            subject: "Re: Application for Backend Developer".to_string(),
            body_text: "Thanks for applying.".to_string(),
            thread_id: "t1".to_string(),
            in_reply_to: Some("<abc@mail.example.com>".to_string()),
        };
        let raw = client().compose_rfc822(&reply);
        assert!(raw.contains("To: jane@example.com"));
        assert!(raw.contains("Subject: Re: Application for Backend Developer"));
        assert!(raw.contains("In-Reply-To: <abc@mail.example.com>"));
        assert!(raw.contains("References: <abc@mail.example.com>"));
        assert!(raw.ends_with("Thanks for applying."));
    }

    #[test]
    fn test_compose_rfc822_without_parent_omits_threading_headers() {
        let reply = ReplyRequest {
            to: "jane@example.com".to_string(),
            subject: "Re: Hello".to_string(),
            body_text: "Hi.".to_string(),
            thread_id: "t1".to_string(),
            in_reply_to: None,
        };
        let raw = client().compose_rfc822(&reply);
        assert!(!raw.contains("In-Reply-To"));
        assert!(!raw.contains("References"));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let c = GmailClient::new(
            "https://gmail.googleapis.com/".to_string(),
            "token".to_string(),
            "careers@example.com".to_string(),
        );
        assert_eq!(
            c.url("messages/send"),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/send"
        );
    }
}
