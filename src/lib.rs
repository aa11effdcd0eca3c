pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod memory;
pub mod session;
pub mod trace;
pub mod tutor;

use anyhow::{Result, bail};
use cli::{AppState, CliArgs, Theme, prompt_for_api_key, run_repl};
use config::AppConfig;
use http::{HttpClient, HttpDebugConfig};
use llm::GeminiProvider;
use session::{Session, generate_session_id};
use std::io::{self, IsTerminal};
use trace::SessionTrace;
use tutor::Tutor;

pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = AppConfig::load_with_path(args.config.as_deref())?;
    apply_cli_overrides(&mut config, &args);

    let session_id = generate_session_id();
    let trace = if args.no_trace {
        None
    } else {
        Some(SessionTrace::create(&session_id)?)
    };

    let api_key = resolve_api_key(
        config.gemini_api_key.take(),
        io::stdin().is_terminal(),
        prompt_for_api_key,
    )?;
    if api_key.prompted {
        println!("API Key saved for this session.");
    }

    let http = HttpClient::new(
        reqwest::Client::new(),
        HttpDebugConfig::from_verbose(args.verbose),
    )
    .with_trace(trace.clone());
    let provider = GeminiProvider::new(
        http,
        api_key.value,
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    );

    let mut app_state = AppState {
        session: Session::new(session_id, config.max_history, trace),
        tutor: Tutor::new(provider, config.generation),
        theme: Theme::detect(&config.theme),
        interactive: io::stdout().is_terminal(),
    };

    run_repl(&mut app_state).await
}

fn apply_cli_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(model) = args.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        config.gemini_model = model.to_string();
    }
    if let Some(max_history) = args.max_history {
        config.max_history = usize::from(max_history);
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ApiKey {
    value: String,
    prompted: bool,
}

fn resolve_api_key(
    configured: Option<String>,
    can_prompt: bool,
    prompt: impl FnOnce() -> Result<String>,
) -> Result<ApiKey> {
    if let Some(value) = configured {
        return Ok(ApiKey {
            value,
            prompted: false,
        });
    }

    if !can_prompt {
        bail!(
            "{}: set GEMINI_API_KEY (or GOOGLE_API_KEY) in your shell, a .env file or the config file",
            cli::KEY_MISSING
        );
    }

    Ok(ApiKey {
        value: prompt()?,
        prompted: true,
    })
}

#[cfg(test)]
mod tests {
    use super::{ApiKey, apply_cli_overrides, resolve_api_key};
    use crate::cli::CliArgs;
    use crate::config::{AppConfig, ThemeConfig};
    use crate::llm::GenerationConfig;
    use anyhow::bail;
    use clap::Parser;

    fn config() -> AppConfig {
        AppConfig {
            gemini_api_key: None,
            gemini_model: "gemini-1.5-pro".to_string(),
            gemini_base_url: "https://example.com".to_string(),
            max_history: 20,
            generation: GenerationConfig::default(),
            theme: ThemeConfig::default(),
        }
    }

    #[test]
    fn configured_key_is_used_without_prompting() {
        let key = resolve_api_key(Some("cfg-key".to_string()), true, || {
            panic!("should not prompt")
        })
        .expect("key");
        assert_eq!(
            key,
            ApiKey {
                value: "cfg-key".to_string(),
                prompted: false
            }
        );
    }

    #[test]
    fn missing_key_is_prompted_for_on_a_terminal() {
        let key = resolve_api_key(None, true, || Ok("typed-key".to_string())).expect("key");
        assert_eq!(
            key,
            ApiKey {
                value: "typed-key".to_string(),
                prompted: true
            }
        );
    }

    #[test]
    fn missing_key_without_terminal_fails_with_guidance() {
        let err = resolve_api_key(None, false, || Ok("unused".to_string()))
            .expect_err("should fail");
        let message = err.to_string();
        assert!(message.starts_with("Please enter your Google API Key to use the application"));
        assert!(message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn cancelled_prompt_propagates_error() {
        let err = resolve_api_key(None, true, || bail!("cancelled")).expect_err("should fail");
        assert_eq!(err.to_string(), "cancelled");
    }

    #[test]
    fn cli_flags_override_config() {
        let mut cfg = config();
        let args = CliArgs::try_parse_from([
            "ds_tutor",
            "--model",
            "gemini-2.0-flash",
            "--max-history",
            "4",
        ])
        .expect("args");

        apply_cli_overrides(&mut cfg, &args);

        assert_eq!(cfg.gemini_model, "gemini-2.0-flash");
        assert_eq!(cfg.max_history, 4);
    }

    #[test]
    fn absent_cli_flags_keep_config() {
        let mut cfg = config();
        let args = CliArgs::try_parse_from(["ds_tutor"]).expect("args");

        apply_cli_overrides(&mut cfg, &args);

        assert_eq!(cfg, config());
    }
}
