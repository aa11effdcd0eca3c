use reqwest::Url;
use reqwest::header::HeaderValue;
use serde_json::Value;

const REDACTED: &str = "***REDACTED***";
const SECRET_NAMES: [&str; 9] = [
    "key",
    "api_key",
    "apikey",
    "token",
    "authorization",
    "secret",
    "password",
    "x-api-key",
    "x-goog-api-key",
];

/// Controls the `--verbose` request/response dump written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpDebugConfig {
    pub enabled: bool,
    pub redact_secrets: bool,
    pub max_body_chars: usize,
}

impl HttpDebugConfig {
    pub fn from_verbose(verbose: bool) -> Self {
        Self {
            enabled: verbose,
            redact_secrets: true,
            max_body_chars: 4_000,
        }
    }

    pub fn disabled() -> Self {
        Self::from_verbose(false)
    }
}

pub fn redact_url(url: &Url, redact: bool) -> String {
    if !redact || url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if is_secret_name(&name) {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

pub fn redact_header_value(name: &str, value: &HeaderValue, redact: bool) -> String {
    if redact && is_secret_name(name) {
        return REDACTED.to_string();
    }

    value
        .to_str()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|_| "<non-utf8>".to_string())
}

/// Masks secret-looking keys anywhere in a JSON body; non-JSON bodies pass through.
pub fn redact_text_body(raw: &str, redact: bool) -> String {
    if !redact {
        return raw.to_string();
    }

    let Ok(mut json) = serde_json::from_str::<Value>(raw) else {
        return raw.to_string();
    };
    mask_secrets(&mut json);
    serde_json::to_string(&json).unwrap_or_else(|_| raw.to_string())
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let total = input.chars().count();
    if total <= max_chars {
        return input.to_string();
    }

    let kept: String = input.chars().take(max_chars).collect();
    format!("{kept}... <truncated {} chars>", total - max_chars)
}

fn mask_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (name, item) in map.iter_mut() {
                if is_secret_name(name) {
                    *item = Value::String(REDACTED.to_string());
                } else {
                    mask_secrets(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

fn is_secret_name(name: &str) -> bool {
    SECRET_NAMES
        .iter()
        .any(|secret| secret.eq_ignore_ascii_case(name))
}
