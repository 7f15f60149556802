//! Keyword/regex classifier — the heuristic fast path.
//!
//! Pure text functions, no I/O. Ambiguity is reported with `None` / `Unclear`
//! sentinels rather than errors; the extractor decides whether to escalate to
//! the LLM. Regexes are compiled once in `LazyLock` statics.

use std::sync::LazyLock;

use regex::Regex;

use super::{Category, Classification, ExperienceStatus};

/// Cover-letter bodies must carry at least this much prose; shorter
/// keyword-laden notes ("see attached") do not count.
const COVER_LETTER_MIN_CHARS: usize = 300;
const COVER_LETTER_MIN_WORDS: usize = 50;

const MAX_TITLE_LEN: usize = 60;

// ── Job title extraction ────────────────────────────────────────────────────

static SUBJECT_TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(
            r"(?i)^\s*(?:(?:re|fwd?):\s*)*application\s+for\s+(?:the\s+)?(?:position\s+of\s+|role\s+of\s+)?(.+)$",
        )
        .unwrap(),
        Regex::new(
            r"(?i)^\s*(?:(?:re|fwd?):\s*)*applying\s+for\s+(?:the\s+)?(?:position\s+of\s+|role\s+of\s+)?(.+)$",
        )
        .unwrap(),
        Regex::new(r"(?i)^\s*job\s+application\s*[:\-–]\s*(.+)$").unwrap(),
        Regex::new(r"(?i)^\s*application\s*[:\-–]\s*(.+)$").unwrap(),
        Regex::new(r"(?i)^\s*candidate\s+for\s+(?:the\s+)?(.+)$").unwrap(),
        Regex::new(r"(?i)\bapplication\s+for\s+(?:the\s+)?(?:position\s+of\s+)?(.+)$").unwrap(),
    ]
});

static BODY_TITLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bapplying\s+for\s+(?:the\s+)?(?:position\s+of\s+|role\s+of\s+)?([^.,;\n]+)")
            .unwrap(),
        Regex::new(r"(?i)\bapply(?:ing)?\s+to\s+(?:the\s+)?([^.,;\n]+?)\s+(?:position|role|opening)\b")
            .unwrap(),
        Regex::new(r"(?i)\bapplication\s+for\s+(?:the\s+)?([^.,;\n]+)").unwrap(),
        Regex::new(r"(?i)\b(?:position|role)\s+of\s+([^.,;\n]+)").unwrap(),
        Regex::new(r"(?i)\bfor\s+the\s+([^.,;\n]+?)\s+(?:position|role|opening|vacancy)\b").unwrap(),
        Regex::new(r"(?i)\binterested\s+in\s+(?:the\s+)?([^.,;\n]+?)\s+(?:position|role|opening)\b")
            .unwrap(),
    ]
});

static AS_A_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bas\s+an?\s+([A-Za-z+#/.][A-Za-z+#/. -]{2,58}?)(?:\s+(?:at|with|in|for|on)\b|[.,;\n]|$)")
        .unwrap()
});

/// Last-resort scan: word(s) immediately preceding a role keyword.
static ROLE_KEYWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([A-Za-z+#./-]+)\s+(developer|engineer|designer|recruiter|analyst|architect|consultant|intern|specialist|tester|manager)\b",
    )
    .unwrap()
});

/// Words that never belong in front of a role keyword.
const TITLE_STOPWORDS: &[&str] = &[
    "a", "an", "the", "as", "any", "this", "that", "your", "our", "my", "every", "another",
];

static BRACKET_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\(\[][^\)\]]*[\)\]]\s*$").unwrap());
static AT_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+at\s+.+$").unwrap());
static ROLE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[-–—|,]?\s*(?:role|position|job|opening|vacancy)\s*$").unwrap()
});

/// Normalizes a captured title: drops bracketed suffixes, a trailing
/// `at <company>` clause, and a trailing Role/Position word.
fn clean_title(raw: &str) -> Option<String> {
    let mut title = raw.trim().to_string();
    loop {
        let cleaned = BRACKET_SUFFIX_RE.replace(&title, "").into_owned();
        if cleaned == title {
            break;
        }
        title = cleaned;
    }
    title = AT_SUFFIX_RE.replace(&title, "").into_owned();
    title = ROLE_SUFFIX_RE.replace(&title, "").into_owned();
    let title = title.trim_matches(|c: char| c.is_whitespace() || "\"'-–—:.".contains(c));

    if title.is_empty() || title.len() > MAX_TITLE_LEN || !title.chars().any(|c| c.is_alphabetic())
    {
        return None;
    }
    Some(title.to_string())
}

/// Tries each extraction strategy in fixed order; the first hit wins.
pub fn extract_job_title(subject: &str, body: &str) -> Option<String> {
    for pattern in SUBJECT_TITLE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(subject) {
            if let Some(title) = clean_title(&caps[1]) {
                return Some(title);
            }
        }
    }

    for pattern in BODY_TITLE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(body) {
            if let Some(title) = clean_title(&caps[1]) {
                return Some(title);
            }
        }
    }

    if let Some(caps) = AS_A_PATTERN.captures(body) {
        if let Some(title) = clean_title(&caps[1]) {
            // Generic phrase extraction is noisy; cap it at short noun phrases.
            if title.split_whitespace().count() <= 5 {
                return Some(title);
            }
        }
    }

    let combined = format!("{subject}\n{body}");
    if let Some(caps) = ROLE_KEYWORD_PATTERN.captures(&combined) {
        let prefix = caps[1].to_lowercase();
        let keyword = &caps[2];
        let title = if TITLE_STOPWORDS.contains(&prefix.as_str()) {
            keyword.to_string()
        } else {
            format!("{} {}", &caps[1], keyword)
        };
        return clean_title(&title);
    }

    None
}

// ── Experience status ───────────────────────────────────────────────────────

static EXPERIENCED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*\+?\s*(?:years?|yrs?)(?:\s+of)?(?:\s+\w+){0,2}\s+experience\b")
            .unwrap(),
        Regex::new(r"(?i)\bexperience\s+of\s+\d+\s*\+?\s*(?:years?|yrs?)\b").unwrap(),
        Regex::new(r"(?i)\b(?:over|more\s+than|nearly|almost)\s+\d+\s*(?:years?|yrs?)\b").unwrap(),
        Regex::new(r"(?i)\b(?:currently|presently)\s+working\s+(?:as|at|with)\b").unwrap(),
        Regex::new(r"(?i)\b(?:have|having)\s+worked\s+(?:as|at|for|with)\b").unwrap(),
        Regex::new(r"(?i)\bmy\s+(?:current|previous|last)\s+(?:role|position|company|employer|job)\b")
            .unwrap(),
        Regex::new(r"(?i)\byears?\s+of\s+(?:professional|industry|work)\s+experience\b").unwrap(),
    ]
});

static FRESHER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\bfreshers?\b").unwrap(),
        Regex::new(r"(?i)\b(?:recent|fresh)(?:ly)?\s+graduated?\b").unwrap(),
        Regex::new(r"(?i)\brecent\s+graduate\b").unwrap(),
        Regex::new(r"(?i)\bentry[\s-]?level\b").unwrap(),
        Regex::new(r"(?i)\bno\s+(?:prior|previous|professional|work)\s+experience\b").unwrap(),
        Regex::new(r"(?i)\b(?:seeking|looking\s+for)\s+(?:my\s+)?first\s+(?:job|role|position|opportunity)\b")
            .unwrap(),
        Regex::new(r"(?i)\bfinal[\s-]year\s+student\b").unwrap(),
        Regex::new(r"(?i)\bjust\s+(?:completed|finished)\s+my\s+(?:degree|studies|graduation)\b")
            .unwrap(),
    ]
});

/// The experienced check takes precedence: a candidate who mentions both
/// years of work and their graduation reads as experienced.
pub fn detect_experience(text: &str) -> ExperienceStatus {
    if EXPERIENCED_PATTERNS.iter().any(|p| p.is_match(text)) {
        return ExperienceStatus::Experienced;
    }
    if FRESHER_PATTERNS.iter().any(|p| p.is_match(text)) {
        return ExperienceStatus::Fresher;
    }
    ExperienceStatus::Unclear
}

// ── Category ────────────────────────────────────────────────────────────────

/// Declaration order is the tie-break: the first category whose keyword
/// matches wins.
const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Developer,
        &[
            "developer",
            "software engineer",
            "engineer",
            "programmer",
            "full stack",
            "full-stack",
            "frontend",
            "front-end",
            "backend",
            "back-end",
            "devops",
            "data scientist",
            "android",
            "ios",
            "react",
            "node.js",
            "python",
            "java",
            "rust",
            "javascript",
            "typescript",
            "golang",
        ],
    ),
    (
        Category::WebDesigner,
        &[
            "web designer",
            "ui designer",
            "ux designer",
            "ui/ux",
            "product designer",
            "graphic designer",
            "figma",
            "photoshop",
            "designer",
        ],
    ),
    (
        Category::Recruiter,
        &[
            "recruiter",
            "recruitment",
            "talent acquisition",
            "human resources",
            "hr executive",
            "hr manager",
            "sourcing",
            "staffing",
            "headhunter",
        ],
    ),
    (
        Category::SalesMarketing,
        &[
            "sales",
            "marketing",
            "business development",
            "seo",
            "content writer",
            "copywriter",
            "social media",
            "account executive",
            "growth",
        ],
    ),
];

fn category_of(text: &str) -> Category {
    let lower = text.to_lowercase();
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return *category;
        }
    }
    Category::Unclear
}

/// The extracted job title is checked before the full text, so an explicit
/// "Web Designer" subject is not drowned out by a body that name-drops React.
pub fn detect_category(job_title: &str, full_text: &str) -> Category {
    match category_of(job_title) {
        Category::Unclear => category_of(full_text),
        category => category,
    }
}

// ── Résumé / cover-letter presence ──────────────────────────────────────────

const RESUME_BODY_KEYWORDS: &[&str] = &[
    "resume",
    "curriculum vitae",
    "my cv",
    "cv attached",
    "attached cv",
    "cv is attached",
    "enclosed cv",
];

const RESUME_FILE_KEYWORDS: &[&str] = &["resume", "cv", "curriculum"];

pub fn detect_resume(body: &str, attachment_filenames: &[String]) -> bool {
    let body_lower = body.to_lowercase();
    if RESUME_BODY_KEYWORDS.iter().any(|kw| body_lower.contains(kw)) {
        return true;
    }
    attachment_filenames.iter().any(|name| {
        let name_lower = name.to_lowercase();
        RESUME_FILE_KEYWORDS.iter().any(|kw| name_lower.contains(kw))
    })
}

const COVER_LETTER_BODY_KEYWORDS: &[&str] = &[
    "cover letter",
    "covering letter",
    "letter of application",
    "motivation letter",
    "statement of purpose",
];

const COVER_LETTER_FILE_KEYWORDS: &[&str] = &["cover", "motivation"];

pub fn detect_cover_letter(body: &str, attachment_filenames: &[String]) -> bool {
    if body.chars().count() < COVER_LETTER_MIN_CHARS
        || body.split_whitespace().count() < COVER_LETTER_MIN_WORDS
    {
        return false;
    }
    let body_lower = body.to_lowercase();
    if COVER_LETTER_BODY_KEYWORDS
        .iter()
        .any(|kw| body_lower.contains(kw))
    {
        return true;
    }
    attachment_filenames.iter().any(|name| {
        let name_lower = name.to_lowercase();
        COVER_LETTER_FILE_KEYWORDS
            .iter()
            .any(|kw| name_lower.contains(kw))
    })
}

// ── Combined classification ─────────────────────────────────────────────────

/// Best-effort classification of an application from subject and body alone.
/// `None` means no job title could be inferred by any strategy; the caller
/// escalates to the LLM in that case.
pub fn classify_text(subject: &str, body: &str) -> Option<Classification> {
    let job_title = extract_job_title(subject, body)?;
    let combined = format!("{subject}\n{body}");
    let experience_status = detect_experience(&combined);
    let category = detect_category(&job_title, &combined);
    Some(Classification {
        job_title: Some(job_title),
        experience_status,
        category,
    })
}
