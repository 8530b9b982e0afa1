use tracing::info;

use super::prompts::{THANK_YOU_TEMPLATE, WHY_COMPANY_TEMPLATE, WHY_ROLE_TEMPLATE};
use crate::llm_client::{prompts::fill, LlmClient, LlmError};

pub fn why_company_prompt(company: &str) -> String {
    fill(WHY_COMPANY_TEMPLATE, &[("company", company)])
}

pub fn why_role_prompt(company: &str, role: &str) -> String {
    fill(WHY_ROLE_TEMPLATE, &[("role", role), ("company", company)])
}

pub fn thank_you_prompt(interviewer: &str, company: &str) -> String {
    fill(
        THANK_YOU_TEMPLATE,
        &[("interviewer", interviewer), ("company", company)],
    )
}

/// Sends a single user prompt and returns the completion text.
pub async fn generate_response(llm: &LlmClient, prompt: &str) -> Result<String, LlmError> {
    let result = llm.complete(prompt, None).await?;
    info!("Generated response ({} chars)", result.len());
    Ok(result)
}

pub async fn generate_why_company(llm: &LlmClient, company: &str) -> Result<String, LlmError> {
    generate_response(llm, &why_company_prompt(company)).await
}

pub async fn generate_why_role(llm: &LlmClient, company: &str, role: &str) -> Result<String, LlmError> {
    generate_response(llm, &why_role_prompt(company, role)).await
}

pub async fn generate_thank_you_letter(
    llm: &LlmClient,
    interviewer: &str,
    company: &str,
) -> Result<String, LlmError> {
    generate_response(llm, &thank_you_prompt(interviewer, company)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wording() {
        assert_eq!(why_company_prompt("Stripe"), "Why Stripe.");
        assert_eq!(
            why_role_prompt("Stripe", "Backend Engineer"),
            "Why this role Backend Engineer at Stripe."
        );
        assert_eq!(
            thank_you_prompt("Ada", "Stripe"),
            "Write a thank you letter to your Interviewer Ada for Stripe."
        );
    }
}
