//! LLM review of divergence documents.
//!
//! A thin OpenAI-compatible chat client plus the fixed reviewer prompts.
//! Nothing here knows about git; the input is the rendered document.

pub mod llm;
pub mod prompt;
