//! Email metadata extractor.
//!
//! Fetches a message and its thread, decodes the interesting parts, gates out
//! non-recruitment mail, and classifies with the heuristic fast path before
//! paying for an LLM call. Every failure degrades: provider errors drop the
//! record (`None`), LLM trouble degrades the inferred fields to unclear.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::classify::prompts::{METADATA_EXTRACT_PROMPT, METADATA_EXTRACT_SYSTEM};
use crate::classify::{heuristics, Category, Classification, ExperienceStatus, ExtractedMetadata};
use crate::llm_client::decode::extract_json_object;
use crate::llm_client::TextGenerator;
use crate::mail::{mime, MailError, MailProvider};

/// Subjects must mention at least one of these to be treated as an
/// application at all.
const RELEVANCE_KEYWORDS: &[&str] = &[
    "application",
    "applying",
    "apply",
    "job",
    "position",
    "role",
    "resume",
    "cv",
    "candidate",
    "opening",
    "vacancy",
    "career",
    "hiring",
    "internship",
    "developer",
    "engineer",
    "designer",
    "recruiter",
];

/// Any of these disqualifies the mail outright (newsletters, receipts, …).
const EXCLUSION_KEYWORDS: &[&str] = &[
    "unsubscribe",
    "newsletter",
    "webinar",
    "invoice",
    "receipt",
    "password",
    "verify your",
    "promotion",
    "discount",
    "order confirmation",
];

fn is_relevant_subject(subject: &str) -> bool {
    let lower = subject.to_lowercase();
    RELEVANCE_KEYWORDS.iter().any(|kw| lower.contains(kw))
        && !EXCLUSION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Loose wire shape for the LLM response; unknown spellings degrade to
/// unclear instead of failing the whole object.
#[derive(Debug, Deserialize)]
struct LlmExtraction {
    #[serde(default)]
    job_title: Option<String>,
    #[serde(default)]
    experience_status: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

fn parse_category(raw: &str) -> Category {
    match raw.trim() {
        "Developer" => Category::Developer,
        "Web Designer" => Category::WebDesigner,
        "Recruiter" => Category::Recruiter,
        "Sales-Marketing" => Category::SalesMarketing,
        _ => Category::Unclear,
    }
}

fn parse_experience(raw: &str) -> ExperienceStatus {
    match raw.trim().to_lowercase().as_str() {
        "experienced" => ExperienceStatus::Experienced,
        "fresher" => ExperienceStatus::Fresher,
        _ => ExperienceStatus::Unclear,
    }
}

pub struct MetadataExtractor {
    provider: Arc<dyn MailProvider>,
    generator: Arc<dyn TextGenerator>,
    /// Relay address; mail From it carries the candidate in Reply-To.
    consulting_mail: Option<String>,
    llm_backoff: Duration,
}

impl MetadataExtractor {
    pub fn new(
        provider: Arc<dyn MailProvider>,
        generator: Arc<dyn TextGenerator>,
        consulting_mail: Option<String>,
        llm_backoff: Duration,
    ) -> Self {
        Self {
            provider,
            generator,
            consulting_mail,
            llm_backoff,
        }
    }

    /// Extracts the triage record for one message. `None` drops the message
    /// from this run: reply threads, irrelevant mail, and provider failures
    /// all end here. The run-level retry policy is the only retry.
    pub async fn extract(&self, message_id: &str, thread_id: &str) -> Option<ExtractedMetadata> {
        match self.try_extract(message_id, thread_id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("extraction failed for message {message_id}: {e}");
                None
            }
        }
    }

    async fn try_extract(
        &self,
        message_id: &str,
        thread_id: &str,
    ) -> Result<Option<ExtractedMetadata>, MailError> {
        let thread = self.provider.get_thread(thread_id).await?;
        if thread.message_count > 1 {
            // Ongoing conversations are triaged by the reply workflow, not here.
            debug!(
                "thread {} has {} messages, skipping",
                thread.id, thread.message_count
            );
            return Ok(None);
        }

        let message = self.provider.get_message(message_id).await?;
        let payload = message.payload.as_ref();
        let headers = payload.map(|p| p.headers.as_slice()).unwrap_or(&[]);

        let subject = mime::header(headers, "Subject").unwrap_or("").to_string();
        if !is_relevant_subject(&subject) {
            debug!("subject of {message_id} failed the relevance gate");
            return Ok(None);
        }

        let from = mime::header(headers, "From").unwrap_or("");
        let reply_to = mime::header(headers, "Reply-To");
        let rfc_message_id = mime::header(headers, "Message-ID").map(str::to_string);

        // Mail relayed by the consulting partner carries the candidate in
        // Reply-To; everything else is addressed directly.
        let effective_sender = match (&self.consulting_mail, reply_to) {
            (Some(relay), Some(reply_to))
                if from.to_lowercase().contains(&relay.to_lowercase()) =>
            {
                reply_to
            }
            _ => from,
        };
        let (sender_name, sender_email) = mime::parse_mailbox(effective_sender);

        let body = payload.and_then(mime::plain_text_body).unwrap_or_default();
        let attachment_names: Vec<String> = payload
            .map(mime::attachments)
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.filename)
            .collect();

        let heuristic = heuristics::classify_text(&subject, &body);
        let classification = match heuristic {
            // Confident fast path: no LLM call, no cost, no latency.
            Some(c) if c.category != Category::Unclear => c,
            heuristic => {
                let mut inferred = self.classify_with_llm(&subject, &body).await;
                if let Some(h) = heuristic {
                    if inferred.job_title.is_none() {
                        inferred.job_title = h.job_title;
                    }
                    if inferred.experience_status == ExperienceStatus::Unclear {
                        inferred.experience_status = h.experience_status;
                    }
                }
                inferred
            }
        };

        Ok(Some(ExtractedMetadata {
            message_id: message.id,
            thread_id: message.thread_id,
            rfc_message_id,
            sender_name,
            sender_email,
            has_resume: heuristics::detect_resume(&body, &attachment_names),
            has_cover_letter: heuristics::detect_cover_letter(&body, &attachment_names),
            position: classification.job_title,
            category: classification.category,
            experience_status: classification.experience_status,
            subject,
            body,
        }))
    }

    /// LLM fallback. Transient provider trouble gets one coarse
    /// sleep-then-retry; anything else degrades every inferred field to
    /// unclear so the record stays in the batch.
    async fn classify_with_llm(&self, subject: &str, body: &str) -> Classification {
        let prompt = METADATA_EXTRACT_PROMPT
            .replace("{subject}", subject)
            .replace("{body}", body);

        let text = match self.generator.generate(&prompt, METADATA_EXTRACT_SYSTEM).await {
            Ok(text) => text,
            Err(e) if e.is_transient() => {
                warn!(
                    "transient LLM error, backing off {}s: {e}",
                    self.llm_backoff.as_secs()
                );
                tokio::time::sleep(self.llm_backoff).await;
                match self.generator.generate(&prompt, METADATA_EXTRACT_SYSTEM).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("LLM retry failed, falling back to unclear: {e}");
                        return Classification::unclear();
                    }
                }
            }
            Err(e) => {
                warn!("LLM call failed, falling back to unclear: {e}");
                return Classification::unclear();
            }
        };

        match extract_json_object::<LlmExtraction>(&text) {
            Ok(extraction) => Classification {
                job_title: extraction
                    .job_title
                    .filter(|t| !t.trim().is_empty() && !t.eq_ignore_ascii_case("unclear")),
                experience_status: extraction
                    .experience_status
                    .as_deref()
                    .map(parse_experience)
                    .unwrap_or_default(),
                category: extraction
                    .category
                    .as_deref()
                    .map(parse_category)
                    .unwrap_or_default(),
            },
            Err(e) => {
                warn!("could not decode LLM output, falling back to unclear: {e}");
                Classification::unclear()
            }
        }
    }
}
