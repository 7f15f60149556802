//! Pipeline orchestration: search → dedupe → extract → sort → dispatch.
//!
//! One logical thread of sequential async execution per run. Per-record
//! failures are isolated inside the extractor and dispatcher; only a failed
//! inbox search fails the run, and that is what the coarse run-level retry
//! policy covers. Overlapping runs are not serialized — the dedupe cache is
//! the cross-run safeguard against duplicate replies.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::classify::sorter::{sort_into_buckets, SortedBatch};
use crate::classify::MetadataExtractor;
use crate::config::Config;
use crate::dedupe::{CacheStore, DedupeGuard, DedupeKind};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::llm_client::TextGenerator;
use crate::mail::{MailError, MailProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Cron,
    Manual,
}

#[derive(Debug, Serialize)]
pub struct BucketCounts {
    pub missing_resume: usize,
    pub missing_cover_letter: usize,
    pub unclear_position: usize,
    pub multiple_missing: usize,
    pub confirmed: usize,
}

impl BucketCounts {
    fn of(batch: &SortedBatch) -> Self {
        Self {
            missing_resume: batch.missing_resume.len(),
            missing_cover_letter: batch.missing_cover_letter.len(),
            unclear_position: batch.unclear_position.len(),
            multiple_missing: batch.multiple_missing.len(),
            confirmed: batch.confirmed.len(),
        }
    }
}

/// Serializable summary of one pipeline run, returned by the trigger endpoint
/// and logged by the scheduler.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub searched: usize,
    pub duplicates_skipped: usize,
    pub extracted: usize,
    /// Messages the extractor rejected (reply threads, irrelevant mail,
    /// provider failures).
    pub dropped: usize,
    pub buckets: BucketCounts,
    pub dispatch: DispatchReport,
}

/// Tunables split out of [`Config`] so tests can build a pipeline without an
/// environment.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub inbox_query: String,
    pub max_results: u32,
    pub company_name: String,
    pub consulting_mail: Option<String>,
    pub llm_backoff: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            inbox_query: config.inbox_query.clone(),
            max_results: config.max_results,
            company_name: config.company_name.clone(),
            consulting_mail: config.consulting_mail.clone(),
            llm_backoff: Duration::from_secs(config.llm_backoff_secs),
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

pub struct Pipeline {
    provider: Arc<dyn MailProvider>,
    extractor: MetadataExtractor,
    dispatcher: Dispatcher,
    dedupe: DedupeGuard,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn MailProvider>,
        generator: Arc<dyn TextGenerator>,
        cache: Arc<dyn CacheStore>,
        settings: PipelineSettings,
    ) -> Self {
        let extractor = MetadataExtractor::new(
            provider.clone(),
            generator,
            settings.consulting_mail.clone(),
            settings.llm_backoff,
        );
        let dispatcher = Dispatcher::new(provider.clone(), settings.company_name.clone());
        Self {
            provider,
            extractor,
            dispatcher,
            dedupe: DedupeGuard::new(cache),
            settings,
        }
    }

    /// One triage pass over the inbox.
    pub async fn run(&self, trigger: Trigger) -> Result<RunReport, MailError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("pipeline run {run_id} started (trigger: {trigger:?})");

        let summaries = self
            .provider
            .list_message_ids(&self.settings.inbox_query, self.settings.max_results)
            .await?;
        let searched = summaries.len();

        let mut duplicates_skipped = 0;
        let mut dropped = 0;
        let mut records = Vec::new();

        for summary in summaries {
            let fresh_email = self
                .dedupe
                .should_process(DedupeKind::Email, &summary.id)
                .await;
            let fresh_thread = self
                .dedupe
                .should_process(DedupeKind::Thread, &summary.thread_id)
                .await;
            if !fresh_email || !fresh_thread {
                duplicates_skipped += 1;
                continue;
            }

            match self.extractor.extract(&summary.id, &summary.thread_id).await {
                Some(metadata) => records.push(metadata),
                None => dropped += 1,
            }
        }

        let batch = sort_into_buckets(records);
        let buckets = BucketCounts::of(&batch);
        let dispatch = self.dispatcher.dispatch_batch(&batch).await;

        let finished_at = Utc::now();
        info!(
            "pipeline run {run_id} finished: {} searched, {} duplicates, {} extracted, {} dropped",
            searched,
            duplicates_skipped,
            batch.total(),
            dropped
        );

        Ok(RunReport {
            run_id,
            trigger,
            started_at,
            finished_at,
            searched,
            duplicates_skipped,
            extracted: batch.total(),
            dropped,
            buckets,
            dispatch,
        })
    }

    /// Coarse whole-run retry: N attempts with a fixed delay. Per-record
    /// trouble never reaches this level.
    pub async fn run_with_retry(&self, trigger: Trigger) -> Result<RunReport, MailError> {
        let attempts = self.settings.retry_attempts.max(1);
        let mut last_error: Option<MailError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                warn!(
                    "pipeline attempt {attempt} failed, retrying in {}s",
                    self.settings.retry_delay.as_secs()
                );
                tokio::time::sleep(self.settings.retry_delay).await;
            }
            match self.run(trigger).await {
                Ok(report) => return Ok(report),
                Err(e) => {
                    warn!("pipeline run failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(MailError::Decode(
            "pipeline retry loop exhausted".to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    use super::*;
    use crate::dedupe::MemoryStore;
    use crate::llm_client::LlmError;
    use crate::mail::{
        Header, InboundMessage, Label, MessageSummary, MimePart, PartBody, ReplyRequest,
        SendOutcome, ThreadSummary,
    };

    struct FakeMailbox {
        messages: HashMap<String, InboundMessage>,
        order: Vec<MessageSummary>,
        sent: Mutex<Vec<ReplyRequest>>,
        list_failures: AtomicUsize,
    }

    impl FakeMailbox {
        fn new(messages: Vec<InboundMessage>) -> Self {
            let order = messages
                .iter()
                .map(|m| MessageSummary {
                    id: m.id.clone(),
                    thread_id: m.thread_id.clone(),
                })
                .collect();
            Self {
                messages: messages.into_iter().map(|m| (m.id.clone(), m)).collect(),
                order,
                sent: Mutex::new(Vec::new()),
                list_failures: AtomicUsize::new(0),
            }
        }

        fn failing_lists(self, n: usize) -> Self {
            self.list_failures.store(n, Ordering::SeqCst);
            self
        }
    }

    #[async_trait]
    impl MailProvider for FakeMailbox {
        async fn list_message_ids(
            &self,
            _query: &str,
            _max: u32,
        ) -> Result<Vec<MessageSummary>, MailError> {
            let remaining = self.list_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.list_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(MailError::Api {
                    status: 503,
                    message: "service unavailable".to_string(),
                });
            }
            Ok(self.order.clone())
        }

        async fn get_message(&self, id: &str) -> Result<InboundMessage, MailError> {
            self.messages
                .get(id)
                .cloned()
                .ok_or_else(|| MailError::Decode(format!("no message {id}")))
        }

        async fn get_thread(&self, id: &str) -> Result<ThreadSummary, MailError> {
            Ok(ThreadSummary {
                id: id.to_string(),
                message_count: 1,
            })
        }

        async fn send_reply(&self, reply: &ReplyRequest) -> Result<SendOutcome, MailError> {
            self.sent.lock().unwrap().push(reply.clone());
            Ok(SendOutcome {
                id: "sent".to_string(),
                thread_id: reply.thread_id.clone(),
                label_ids: vec!["SENT".to_string()],
            })
        }

        async fn modify_labels(
            &self,
            _id: &str,
            _add: &[String],
            _remove: &[String],
        ) -> Result<(), MailError> {
            Ok(())
        }

        async fn ensure_label(&self, name: &str) -> Result<Label, MailError> {
            Ok(Label {
                id: format!("L_{name}"),
                name: name.to_string(),
            })
        }
    }

    struct NeverGenerator;

    #[async_trait]
    impl crate::llm_client::TextGenerator for NeverGenerator {
        async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    fn text_part(text: &str) -> MimePart {
        MimePart {
            mime_type: "text/plain".to_string(),
            body: PartBody {
                data: Some(URL_SAFE_NO_PAD.encode(text.as_bytes())),
                attachment_id: None,
            },
            ..Default::default()
        }
    }

    fn application(id: &str, subject: &str, body: &str) -> InboundMessage {
        InboundMessage {
            id: id.to_string(),
            thread_id: format!("t-{id}"),
            payload: Some(MimePart {
                mime_type: "multipart/mixed".to_string(),
                headers: vec![
                    Header {
                        name: "Subject".to_string(),
                        value: subject.to_string(),
                    },
                    Header {
                        name: "From".to_string(),
                        value: format!("Jane <{id}@example.com>"),
                    },
                ],
                parts: vec![text_part(body)],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            inbox_query: "in:inbox is:unread".to_string(),
            max_results: 50,
            company_name: "Acme".to_string(),
            consulting_mail: None,
            llm_backoff: Duration::ZERO,
            retry_attempts: 3,
            retry_delay: Duration::ZERO,
        }
    }

    fn pipeline(provider: Arc<FakeMailbox>) -> Pipeline {
        Pipeline::new(
            provider,
            Arc::new(NeverGenerator),
            Arc::new(MemoryStore::new()),
            settings(),
        )
    }

    #[tokio::test]
    async fn test_run_triages_and_replies() {
        let provider = Arc::new(FakeMailbox::new(vec![
            application(
                "m1",
                "Application for Frontend Developer",
                "I have 5 years of experience with React. My resume is attached.",
            ),
            application("m2", "Weekly team lunch", "Pizza on Friday!"),
        ]));
        let report = pipeline(provider.clone()).run(Trigger::Manual).await.unwrap();

        assert_eq!(report.searched, 2);
        assert_eq!(report.extracted, 1);
        assert_eq!(report.dropped, 1); // relevance gate
        assert_eq!(report.dispatch.replies_sent, 1);
        assert_eq!(provider.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_deduplicated() {
        let provider = Arc::new(FakeMailbox::new(vec![application(
            "m1",
            "Application for Frontend Developer",
            "I have 5 years of experience. My resume is attached.",
        )]));
        let pipeline = pipeline(provider.clone());

        let first = pipeline.run(Trigger::Manual).await.unwrap();
        assert_eq!(first.dispatch.replies_sent, 1);

        // Same inbox contents, same run: everything reads as duplicate and no
        // second reply goes out.
        let second = pipeline.run(Trigger::Manual).await.unwrap();
        assert_eq!(second.duplicates_skipped, 1);
        assert_eq!(second.extracted, 0);
        assert_eq!(second.dispatch.replies_sent, 0);
        assert_eq!(provider.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unclear_record_is_sorted_not_dropped() {
        // LLM always fails; the record degrades to unclear fields but still
        // lands in a bucket and gets a reply.
        let provider = Arc::new(FakeMailbox::new(vec![application(
            "m1",
            "Regarding the open position",
            "I would be a great addition to your team.",
        )]));
        let report = pipeline(provider.clone()).run(Trigger::Manual).await.unwrap();

        assert_eq!(report.extracted, 1);
        assert_eq!(report.dropped, 0);
        // No resume, no cover letter, no position: multiple missing.
        assert_eq!(report.buckets.multiple_missing, 1);
        assert_eq!(report.dispatch.replies_sent, 1);
    }

    #[tokio::test]
    async fn test_run_with_retry_recovers_from_transient_search_failure() {
        let provider = Arc::new(
            FakeMailbox::new(vec![application(
                "m1",
                "Application for Frontend Developer",
                "I have 5 years of experience. My resume is attached.",
            )])
            .failing_lists(2),
        );
        let report = pipeline(provider.clone())
            .run_with_retry(Trigger::Cron)
            .await
            .unwrap();
        assert_eq!(report.searched, 1);
    }

    #[tokio::test]
    async fn test_run_with_retry_gives_up_after_attempts() {
        let provider = Arc::new(
            FakeMailbox::new(vec![application(
                "m1",
                "Application for Frontend Developer",
                "body",
            )])
            .failing_lists(10),
        );
        let result = pipeline(provider).run_with_retry(Trigger::Cron).await;
        assert!(result.is_err());
    }
}
