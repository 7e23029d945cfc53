//! Grounded answer generation: prompt building and citation linking

pub mod citation;
pub mod prompt;

pub use citation::extract_and_link_citations;
pub use prompt::{PromptBuilder, GENERATION_SYSTEM_PROMPT};
