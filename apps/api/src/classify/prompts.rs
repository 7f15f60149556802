// Classification LLM prompt templates.
// All prompts for the classify module are defined here.

pub const METADATA_EXTRACT_SYSTEM: &str = "\
You are a precise recruitment-email classifier. \
Read a candidate's email and extract the applied-for position, their \
experience level, and the role category. \
You MUST respond with a single valid JSON object only — no markdown fences, \
no explanations. \
Never invent a job title that is not supported by the email text; use null \
when the position is not stated.";

pub const METADATA_EXTRACT_PROMPT: &str = r#"Classify the following job application email.

SUBJECT:
{subject}

BODY:
{body}

OUTPUT SCHEMA (return exactly this structure):
{
  "job_title": "string" | null,
  "experience_status": "experienced" | "fresher" | "unclear",
  "category": "Developer" | "Web Designer" | "Recruiter" | "Sales-Marketing" | "unclear"
}

RULES:
1. job_title is the position the candidate is applying for, e.g. "Frontend Developer". null if not stated.
2. "experienced" only when the email states professional work history; "fresher" for students and recent graduates; otherwise "unclear".
3. category must be one of the five listed values — never any other string.
4. Return ONLY the JSON object — nothing else, no code fences."#;
