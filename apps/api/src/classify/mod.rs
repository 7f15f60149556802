//! Classification pipeline: heuristics, LLM fallback, and bucket sorting.

use serde::{Deserialize, Serialize};

pub mod extractor;
pub mod heuristics;
pub mod prompts;
pub mod sorter;

pub use extractor::MetadataExtractor;

/// Candidate category. The serde spellings are the wire contract shared with
/// the LLM extraction prompt; anything the model returns outside this set
/// deserializes to nothing and falls back to `Unclear` upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Developer,
    #[serde(rename = "Web Designer")]
    WebDesigner,
    Recruiter,
    #[serde(rename = "Sales-Marketing")]
    SalesMarketing,
    #[default]
    #[serde(rename = "unclear")]
    Unclear,
}

impl Category {
    /// Label name applied to confirmed candidates of this category.
    pub fn label_name(&self) -> Option<&'static str> {
        match self {
            Category::Developer => Some("Developer"),
            Category::WebDesigner => Some("Web Designer"),
            Category::Recruiter => Some("Recruiter"),
            Category::SalesMarketing => Some("Sales-Marketing"),
            Category::Unclear => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceStatus {
    Experienced,
    Fresher,
    #[default]
    Unclear,
}

/// Result of the heuristic classifier or the LLM fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub job_title: Option<String>,
    pub experience_status: ExperienceStatus,
    pub category: Category,
}

impl Classification {
    /// All-sentinel value used when the LLM fallback fails.
    pub fn unclear() -> Self {
        Self {
            job_title: None,
            experience_status: ExperienceStatus::Unclear,
            category: Category::Unclear,
        }
    }
}

/// The canonical per-message record flowing from the extractor to the sorter
/// and dispatcher. One shape, used everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub message_id: String,
    pub thread_id: String,
    /// RFC 2822 Message-Id of the original mail, used to thread the reply.
    pub rfc_message_id: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub subject: String,
    pub body: String,
    pub has_resume: bool,
    pub has_cover_letter: bool,
    /// `None` means the position could not be inferred.
    pub position: Option<String>,
    pub category: Category,
    pub experience_status: ExperienceStatus,
}
