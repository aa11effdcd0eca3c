pub mod prompt;

use crate::llm::{GenerationConfig, GenerationInput, LlmError, LlmProvider};
use crate::memory::ConversationMemory;
use prompt::{build_prompt, current_date_label};

pub const GENERATION_ERROR_PREFIX: &str = "Error generating response: ";

/// What the tutor produced for one question. A failed generation still
/// carries displayable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub failed: bool,
}

pub struct Tutor<P> {
    provider: P,
    generation: GenerationConfig,
    today: fn() -> String,
}

impl<P: LlmProvider> Tutor<P> {
    pub fn new(provider: P, generation: GenerationConfig) -> Self {
        Self {
            provider,
            generation,
            today: current_date_label,
        }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn with_date_source(mut self, today: fn() -> String) -> Self {
        self.today = today;
        self
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub async fn generate_response(&self, memory: &ConversationMemory, question: &str) -> String {
        self.reply(memory, question).await.text
    }

    pub async fn reply(&self, memory: &ConversationMemory, question: &str) -> Reply {
        match self.try_generate(memory, question).await {
            Ok(text) => Reply {
                text,
                failed: false,
            },
            Err(err) => Reply {
                text: format!("{GENERATION_ERROR_PREFIX}{err}"),
                failed: true,
            },
        }
    }

    async fn try_generate(
        &self,
        memory: &ConversationMemory,
        question: &str,
    ) -> Result<String, LlmError> {
        let prompt = build_prompt(&memory.format_for_prompt(), question, &(self.today)());
        let output = self
            .provider
            .generate(GenerationInput {
                prompt,
                generation: self.generation,
            })
            .await?;
        Ok(output.text)
    }
}

#[cfg(test)]
mod tests {
    use super::{GENERATION_ERROR_PREFIX, Reply, Tutor};
    use crate::http::{HttpClient, HttpDebugConfig};
    use crate::llm::{
        GeminiProvider, GenerationConfig, GenerationInput, GenerationOutput, LlmError,
        LlmProvider, LlmResult,
    };
    use crate::memory::ConversationMemory;
    use reqwest::Client;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct ScriptedProvider {
        result: LlmResult<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn answering(text: &str) -> Self {
            Self {
                result: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: LlmError) -> Self {
            Self {
                result: Err(err),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmProvider for ScriptedProvider {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, input: GenerationInput) -> LlmResult<GenerationOutput> {
            self.prompts.lock().expect("prompts lock").push(input.prompt);
            self.result.clone().map(|text| GenerationOutput { text })
        }
    }

    fn fixed_date() -> String {
        "March 05, 2025".to_string()
    }

    #[tokio::test]
    async fn generate_response_returns_model_text_unchanged() {
        let tutor = Tutor::new(
            ScriptedProvider::answering("A p-value is..."),
            GenerationConfig::default(),
        );
        let mut memory = ConversationMemory::default();

        let answer = tutor
            .generate_response(&memory, "What is a p-value?")
            .await;
        assert_eq!(answer, "A p-value is...");

        memory.add_exchange("What is a p-value?", answer);
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn generate_response_folds_failures_into_text() {
        for err in [
            LlmError::Network("connection reset".to_string()),
            LlmError::Auth {
                status: 401,
                body: "bad key".to_string(),
            },
            LlmError::RemoteService {
                status: Some(503),
                message: "unavailable".to_string(),
            },
        ] {
            let expected = format!("Error generating response: {err}");
            let tutor = Tutor::new(ScriptedProvider::failing(err), GenerationConfig::default());

            let reply = tutor.reply(&ConversationMemory::default(), "q").await;
            assert!(reply.text.starts_with(GENERATION_ERROR_PREFIX));
            assert_eq!(
                reply,
                Reply {
                    text: expected,
                    failed: true
                }
            );
        }
    }

    #[tokio::test]
    async fn prompt_includes_history_and_question() {
        let tutor = Tutor::new(ScriptedProvider::answering("ok"), GenerationConfig::default())
            .with_date_source(fixed_date);
        let mut memory = ConversationMemory::new(4);
        memory.add_exchange("What is a mean?", "The average.");

        tutor.generate_response(&memory, "And a median?").await;

        let prompts = tutor.provider.prompts.lock().expect("prompts lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Current date: March 05, 2025\n\nPrevious conversation:\n"));
        assert!(prompts[0].ends_with(
            "Human: What is a mean?\nAI Tutor: The average.\n\n\nHuman: And a median?\nAI Tutor:"
        ));
    }

    static DATE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn advancing_date() -> String {
        let day = DATE_CALLS.fetch_add(1, Ordering::SeqCst) + 1;
        format!("January {day:02}, 2030")
    }

    #[tokio::test]
    async fn prompt_recomputes_date_on_every_call() {
        let tutor = Tutor::new(ScriptedProvider::answering("ok"), GenerationConfig::default())
            .with_date_source(advancing_date);
        let memory = ConversationMemory::default();

        tutor.generate_response(&memory, "q").await;
        tutor.generate_response(&memory, "q").await;

        assert_eq!(DATE_CALLS.load(Ordering::SeqCst), 2);
        let prompts = tutor.provider.prompts.lock().expect("prompts lock");
        assert!(prompts[0].contains("Current date: January 01, 2030"));
        assert!(prompts[1].contains("Current date: January 02, 2030"));
    }

    #[tokio::test]
    async fn gemini_backed_tutor_reports_http_failures_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("Human: What is a p-value?"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": {"code": 500, "message": "Internal error encountered."}
            })))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(
            HttpClient::new(Client::new(), HttpDebugConfig::disabled()),
            "test-key".to_string(),
            "gemini-test".to_string(),
            server.uri(),
        );
        let tutor = Tutor::new(provider, GenerationConfig::default());

        let answer = tutor
            .generate_response(&ConversationMemory::default(), "What is a p-value?")
            .await;
        assert_eq!(
            answer,
            "Error generating response: model service failed with status 500: Internal error encountered."
        );
        assert_eq!(tutor.model(), "gemini-test");
    }
}
