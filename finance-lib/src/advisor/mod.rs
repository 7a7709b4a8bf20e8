//! Financial advice from a hosted language model.

use actix_web::{web, Scope};
use async_trait::async_trait;
use thiserror::Error;

pub mod gemini;
mod handlers;

const PROMPT_PREFIX: &str = "You are a financial advisor. Provide actionable advice for the \
following question in a structured, readable format with bullet points and sections: ";

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Language model returned status {0}")]
    Status(u16),
    #[error("Unable to reach language model: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Unable to read language model response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
    #[error("Language model returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError>;
}

pub fn advice_prompt(question: &str) -> String {
    format!("{}{}", PROMPT_PREFIX, question)
}

/// Splits a reply into its non-blank lines.
pub fn reply_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn advisor_service() -> Scope {
    web::scope("/advisor").service(handlers::chat)
}
