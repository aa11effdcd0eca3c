use serde::{Deserialize, Serialize};

use super::provider::{
    GenerationConfig, GenerationInput, GenerationOutput, LlmError, LlmProvider, LlmResult,
};
use crate::http::{HttpClient, HttpResponseData};

const MAX_ERROR_BODY_CHARS: usize = 400;

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(http: HttpClient, api_key: String, model: String, base_url: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_request(input: &GenerationInput) -> GeminiGenerateRequest<'_> {
        GeminiGenerateRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiRequestPart {
                    text: &input.prompt,
                }],
            }],
            generation_config: GeminiGenerationConfig::from(input.generation),
        }
    }

    fn map_status(response: HttpResponseData) -> LlmError {
        let status = response.status;
        let message = error_message(&response.body);
        let key_rejected = status == 400
            && (response.body.contains("API_KEY_INVALID")
                || response.body.contains("API key not valid"));

        if status == 401 || status == 403 || key_rejected {
            LlmError::Auth {
                status,
                body: message,
            }
        } else {
            LlmError::RemoteService {
                status: Some(status),
                message,
            }
        }
    }

    fn extract_text(resp: GeminiGenerateResponse) -> LlmResult<String> {
        let Some(candidate) = resp.candidates.into_iter().next() else {
            let message = match resp.prompt_feedback.and_then(|fb| fb.block_reason) {
                Some(reason) => format!("prompt was blocked ({reason})"),
                None => "response contained no candidates".to_string(),
            };
            return Err(remote(message));
        };

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let message = match candidate.finish_reason {
                Some(reason) => format!("response contained no text (finish reason {reason})"),
                None => "response contained no text".to_string(),
            };
            return Err(remote(message));
        }

        Ok(text)
    }
}

impl LlmProvider for GeminiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, input: GenerationInput) -> LlmResult<GenerationOutput> {
        let payload = Self::build_request(&input);
        let response = self
            .http
            .post_json(
                &self.endpoint(),
                &[("key", self.api_key.as_str())],
                &payload,
            )
            .await
            .map_err(|err| LlmError::Network(err.to_string()))?;

        if !response.is_success() {
            return Err(Self::map_status(response));
        }

        let parsed = serde_json::from_str::<GeminiGenerateResponse>(&response.body)
            .map_err(|err| remote(format!("malformed response: {err}")))?;
        let text = Self::extract_text(parsed)?;
        Ok(GenerationOutput { text })
    }
}

fn remote(message: String) -> LlmError {
    LlmError::RemoteService {
        status: None,
        message,
    }
}

/// Prefers the `error.message` field of a Google API error body over the raw text.
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<GeminiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    message.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl From<GenerationConfig> for GeminiGenerationConfig {
    fn from(cfg: GenerationConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            top_k: cfg.top_k,
            max_output_tokens: cfg.max_output_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}
