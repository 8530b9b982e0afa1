// JobGPT: interview-prep text from the LLM, plus resume upload and
// resume-to-job-description matching.

pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod resume;
