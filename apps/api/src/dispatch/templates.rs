//! Named reply templates.
//!
//! Placeholder tokens are substituted by literal find-replace; a template is
//! plain content, not logic. Tokens: `[Candidate Name]`, `[Job Title]`,
//! `[Company Name]`.

use crate::classify::sorter::Bucket;

#[derive(Debug)]
pub struct ReplyTemplate {
    pub id: &'static str,
    pub body: &'static str,
}

pub const MISSING_RESUME: ReplyTemplate = ReplyTemplate {
    id: "missing_resume",
    body: "\
Dear [Candidate Name],

Thank you for applying for the [Job Title] position at [Company Name].

We noticed that your application did not include a resume. Could you reply \
to this email with your resume attached (PDF or Word) so we can take your \
application forward?

Best regards,
[Company Name] Recruitment Team",
};

pub const MISSING_COVER_LETTER: ReplyTemplate = ReplyTemplate {
    id: "missing_cover_letter",
    body: "\
Dear [Candidate Name],

Thank you for applying for the [Job Title] position at [Company Name].

To complete your application, please reply with a short cover letter telling \
us why you are interested in the role and what you would bring to it.

Best regards,
[Company Name] Recruitment Team",
};

pub const UNCLEAR_POSITION: ReplyTemplate = ReplyTemplate {
    id: "unclear_position",
    body: "\
Dear [Candidate Name],

Thank you for your interest in [Company Name].

We could not tell from your email which position you are applying for. Could \
you reply with the exact role title from our openings page so we can route \
your application to the right team?

Best regards,
[Company Name] Recruitment Team",
};

pub const MULTIPLE_MISSING: ReplyTemplate = ReplyTemplate {
    id: "multiple_missing",
    body: "\
Dear [Candidate Name],

Thank you for reaching out to [Company Name].

Your application is missing a few details we need to process it: the exact \
position you are applying for, your resume, and a short cover letter. Please \
reply with whichever of these were not included so we can move forward.

Best regards,
[Company Name] Recruitment Team",
};

pub const CONFIRMED: ReplyTemplate = ReplyTemplate {
    id: "confirmed",
    body: "\
Dear [Candidate Name],

Thank you for your application for the [Job Title] position at [Company Name].

Your application is complete and has been passed to our recruitment team for \
review. We will get back to you about the next steps shortly.

Best regards,
[Company Name] Recruitment Team",
};

/// The template used for each bucket.
pub fn template_for(bucket: Bucket) -> &'static ReplyTemplate {
    match bucket {
        Bucket::MissingResume => &MISSING_RESUME,
        Bucket::MissingCoverLetter => &MISSING_COVER_LETTER,
        Bucket::UnclearPosition => &UNCLEAR_POSITION,
        Bucket::MultipleMissing => &MULTIPLE_MISSING,
        Bucket::Confirmed => &CONFIRMED,
    }
}

/// Literal placeholder substitution.
pub fn render(
    template: &ReplyTemplate,
    candidate_name: &str,
    job_title: &str,
    company_name: &str,
) -> String {
    template
        .body
        .replace("[Candidate Name]", candidate_name)
        .replace("[Job Title]", job_title)
        .replace("[Company Name]", company_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_all_tokens() {
        let body = render(&CONFIRMED, "Jane Doe", "Frontend Developer", "Acme");
        assert!(body.contains("Dear Jane Doe,"));
        assert!(body.contains("Frontend Developer position at Acme"));
        assert!(!body.contains("[Candidate Name]"));
        assert!(!body.contains("[Job Title]"));
        assert!(!body.contains("[Company Name]"));
    }

    #[test]
    fn test_render_repeated_token() {
        let body = render(&MISSING_RESUME, "Sam", "QA Tester", "Acme");
        // [Company Name] appears twice; both occurrences are replaced.
        assert_eq!(body.matches("Acme").count(), 2);
    }

    #[test]
    fn test_every_bucket_has_a_template() {
        for bucket in [
            Bucket::MissingResume,
            Bucket::MissingCoverLetter,
            Bucket::UnclearPosition,
            Bucket::MultipleMissing,
            Bucket::Confirmed,
        ] {
            assert!(!template_for(bucket).id.is_empty());
        }
    }

    #[test]
    fn test_unclear_position_template_omits_job_title_token() {
        // There is no inferred title to substitute for this bucket.
        assert!(!UNCLEAR_POSITION.body.contains("[Job Title]"));
    }
}
