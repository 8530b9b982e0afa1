// LLM prompt constants for JobGPT.

/// Replace `{company}`.
pub const WHY_COMPANY_TEMPLATE: &str = "Why {company}.";

/// Replace `{role}` and `{company}`.
pub const WHY_ROLE_TEMPLATE: &str = "Why this role {role} at {company}.";

/// Replace `{interviewer}` and `{company}`.
pub const THANK_YOU_TEMPLATE: &str =
    "Write a thank you letter to your Interviewer {interviewer} for {company}.";

pub const RESUME_MATCH_ROLE: &str =
    "You are an experienced technical recruiter who compares resumes against job descriptions.";

/// Replace `{resume}` and `{job_description}` before sending.
pub const RESUME_MATCH_TEMPLATE: &str = r#"Compare the candidate's resume with the job description.

Resume:
{resume}

Job description:
{job_description}

Return a JSON object with this EXACT schema:
{
  "match_score": 0-100 integer, how well the resume fits the role,
  "strengths": ["requirement the resume clearly covers", ...],
  "gaps": ["requirement the resume does not show", ...],
  "suggestions": ["concrete edit to the resume for this role", ...]
}"#;
