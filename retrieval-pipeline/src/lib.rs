pub mod answer_retrieval;
pub mod prompt;

pub use answer_retrieval::AnswerRetriever;
pub use prompt::{PromptRequest, ValidatedPrompt};
