// LLM prompt constants for company identification.

pub const IDENTIFY_ROLE: &str = "You are a helpful assistant that extracts company information.";

/// Replace `{company_name}` and `{search_results}` before sending.
pub const IDENTIFY_PROMPT_TEMPLATE: &str = r#"Based on the company name "{company_name}" and the following search results,
extract key company information in a structured way. If information is not available,
make an educated guess based on the company name and industry standards.

Search results:
{search_results}

Return a JSON object with this EXACT schema:
{
  "name": "Official company name",
  "website": "Company website URL",
  "industry": "Primary industry",
  "location": "Headquarters location",
  "description": "2-3 sentence description"
}"#;
