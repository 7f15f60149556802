//! Dispatcher — per-bucket reply and label actions.
//!
//! Every record is processed independently and best-effort: a failed send or
//! relabel is logged and counted, never allowed to abort the rest of the
//! batch. Label mutations only happen after the provider confirms the reply
//! actually went out (the `SENT` marker in the send response).

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::sorter::{Bucket, SortedBatch};
use crate::classify::ExtractedMetadata;
use crate::mail::{MailError, MailProvider, ReplyRequest};

pub mod templates;

use templates::{render, template_for, ReplyTemplate};

/// Stage labels applied alongside replies.
const LABEL_AWAITING_DETAILS: &str = "Awaiting Details";
const LABEL_NEEDS_CLARIFICATION: &str = "Needs Clarification";
const LABEL_PRE_STAGE: &str = "Pre-Stage";
/// Gmail system label cleared once a message has been triaged.
const LABEL_UNREAD: &str = "UNREAD";

/// What happens to every member of a bucket.
pub struct BucketPolicy {
    pub template: &'static ReplyTemplate,
    pub add_labels: &'static [&'static str],
    pub remove_labels: &'static [&'static str],
}

pub fn policy_for(bucket: Bucket) -> BucketPolicy {
    match bucket {
        Bucket::MissingResume | Bucket::MissingCoverLetter | Bucket::MultipleMissing => {
            BucketPolicy {
                template: template_for(bucket),
                add_labels: &[LABEL_AWAITING_DETAILS],
                remove_labels: &[LABEL_UNREAD],
            }
        }
        Bucket::UnclearPosition => BucketPolicy {
            template: template_for(bucket),
            add_labels: &[LABEL_NEEDS_CLARIFICATION],
            remove_labels: &[LABEL_UNREAD],
        },
        Bucket::Confirmed => BucketPolicy {
            template: template_for(bucket),
            add_labels: &[LABEL_PRE_STAGE],
            remove_labels: &[LABEL_UNREAD],
        },
    }
}

#[derive(Debug, Default, Serialize)]
pub struct DispatchReport {
    pub replies_sent: usize,
    pub labels_applied: usize,
    pub skipped_no_contact: usize,
    /// Sends the provider accepted but did not confirm; labels were withheld.
    pub unconfirmed_sends: usize,
    pub failures: usize,
}

enum RecordOutcome {
    Sent { labeled: bool },
    NoContact,
}

pub struct Dispatcher {
    provider: Arc<dyn MailProvider>,
    company_name: String,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn MailProvider>, company_name: String) -> Self {
        Self {
            provider,
            company_name,
        }
    }

    /// Works through every bucket of a sorted batch. Best-effort: each record
    /// is independent and failures only increment a counter.
    pub async fn dispatch_batch(&self, batch: &SortedBatch) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (bucket, records) in batch.iter_buckets() {
            for record in records {
                match self.dispatch_one(bucket, record).await {
                    Ok(RecordOutcome::Sent { labeled }) => {
                        report.replies_sent += 1;
                        if labeled {
                            report.labels_applied += 1;
                        } else {
                            report.unconfirmed_sends += 1;
                        }
                    }
                    Ok(RecordOutcome::NoContact) => report.skipped_no_contact += 1,
                    Err(e) => {
                        warn!(
                            "dispatch failed for message {} ({:?}): {e}",
                            record.message_id, bucket
                        );
                        report.failures += 1;
                    }
                }
            }
        }
        info!(
            "dispatch done: {} replies, {} labeled, {} no-contact, {} unconfirmed, {} failed",
            report.replies_sent,
            report.labels_applied,
            report.skipped_no_contact,
            report.unconfirmed_sends,
            report.failures
        );
        report
    }

    async fn dispatch_one(
        &self,
        bucket: Bucket,
        record: &ExtractedMetadata,
    ) -> Result<RecordOutcome, MailError> {
        let Some(to) = record.sender_email.as_deref() else {
            return Ok(RecordOutcome::NoContact);
        };

        let policy = policy_for(bucket);
        let candidate_name = record.sender_name.as_deref().unwrap_or("Candidate");
        let job_title = record.position.as_deref().unwrap_or("advertised");
        let body = render(policy.template, candidate_name, job_title, &self.company_name);

        let reply = ReplyRequest {
            to: to.to_string(),
            subject: reply_subject(&record.subject),
            body_text: body,
            thread_id: record.thread_id.clone(),
            in_reply_to: record.rfc_message_id.clone(),
        };

        debug!("sending '{}' reply to {to}", policy.template.id);
        let outcome = self.provider.send_reply(&reply).await?;
        if !outcome.was_sent() {
            warn!(
                "send for message {} not confirmed by provider, withholding labels",
                record.message_id
            );
            return Ok(RecordOutcome::Sent { labeled: false });
        }

        let mut add_names: Vec<&str> = policy.add_labels.to_vec();
        if bucket == Bucket::Confirmed {
            if let Some(category_label) = record.category.label_name() {
                add_names.push(category_label);
            }
        }

        let mut add_ids = Vec::with_capacity(add_names.len());
        for name in add_names {
            add_ids.push(self.provider.ensure_label(name).await?.id);
        }
        let mut remove_ids = Vec::with_capacity(policy.remove_labels.len());
        for name in policy.remove_labels {
            remove_ids.push(self.provider.ensure_label(name).await?.id);
        }

        self.provider
            .modify_labels(&record.message_id, &add_ids, &remove_ids)
            .await?;

        Ok(RecordOutcome::Sent { labeled: true })
    }
}

/// `Re: <original subject>`, without stacking prefixes on replies to replies.
fn reply_subject(original: &str) -> String {
    let trimmed = original.trim();
    if trimmed.to_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}
