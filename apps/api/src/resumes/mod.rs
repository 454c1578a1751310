//! Resume intake: text extraction, LLM structuring and link enrichment.

pub mod extract;
pub mod handlers;
pub mod links;
pub mod parser;
pub mod prompts;

use thiserror::Error;

use crate::llm_client::LlmError;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("Legacy .doc files are not supported. Please upload a PDF or plain text file.")]
    LegacyDoc,

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Text file is not valid UTF-8")]
    InvalidUtf8,

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("No text could be extracted from the resume")]
    EmptyText,

    #[error(transparent)]
    Llm(#[from] LlmError),
}
