use tracing::info;

use crate::llm_client::LlmClient;
use crate::models::resume::ParsedResume;
use crate::resumes::links::{enrich, extract_links};
use crate::resumes::prompts::{RESUME_PARSE_PROMPT, RESUME_PARSE_SYSTEM};
use crate::resumes::ResumeError;

/// Structures raw resume text with the LLM, then backfills profile and project
/// links harvested from the text itself.
pub async fn parse_resume(llm: &LlmClient, text: &str) -> Result<ParsedResume, ResumeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ResumeError::EmptyText);
    }

    let prompt = RESUME_PARSE_PROMPT.replace("{resume_text}", text);
    let mut resume: ParsedResume = llm.call_json(&prompt, RESUME_PARSE_SYSTEM).await?;

    let links = extract_links(text);
    enrich(&mut resume, &links);

    info!(
        experience = resume.experience.len(),
        education = resume.education.len(),
        skills = resume.skills.len(),
        projects = resume.projects.len(),
        "Resume parsed"
    );
    Ok(resume)
}
