use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInput {
    pub prompt: String,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    Network(String),
    Auth { status: u16, body: String },
    RemoteService { status: Option<u16>, message: String },
}

impl Display for LlmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Auth { status, body } => {
                write!(f, "authentication failed with status {status}: {body}")
            }
            Self::RemoteService {
                status: Some(status),
                message,
            } => write!(f, "model service failed with status {status}: {message}"),
            Self::RemoteService {
                status: None,
                message,
            } => write!(f, "model service error: {message}"),
        }
    }
}

impl Error for LlmError {}

pub type LlmResult<T> = std::result::Result<T, LlmError>;

pub trait LlmProvider {
    fn model(&self) -> &str;

    fn generate(
        &self,
        input: GenerationInput,
    ) -> impl std::future::Future<Output = LlmResult<GenerationOutput>> + Send;
}
