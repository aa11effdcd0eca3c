pub mod gemini;
pub mod provider;

pub use gemini::GeminiProvider;
pub use provider::{
    GenerationConfig, GenerationInput, GenerationOutput, LlmError, LlmProvider, LlmResult,
};
