use crate::llm::GenerationConfig;
use crate::memory::DEFAULT_MAX_HISTORY;
use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const CONFIG_DIR_NAME: &str = "ds_tutor";
const CONFIG_FILE_NAME: &str = "config.toml";
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub max_history: usize,
    pub generation: GenerationConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub preset: ThemePreset,
    pub styles: HashMap<ThemeToken, StyleOverride>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: ThemePreset::Default,
            styles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemePreset {
    Default,
    Light,
    HighContrast,
}

impl FromStr for ThemePreset {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "light" => Ok(Self::Light),
            "high-contrast" => Ok(Self::HighContrast),
            _ => Err(format!("unknown preset '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeToken {
    UserPrompt,
    TutorLabel,
    TutorText,
    TutorWaiting,
    TutorError,
    SystemInfo,
    SystemError,
    Banner,
}

impl ThemeToken {
    pub fn all() -> &'static [ThemeToken] {
        &[
            Self::UserPrompt,
            Self::TutorLabel,
            Self::TutorText,
            Self::TutorWaiting,
            Self::TutorError,
            Self::SystemInfo,
            Self::SystemError,
            Self::Banner,
        ]
    }
}

impl FromStr for ThemeToken {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "user_prompt" => Ok(Self::UserPrompt),
            "tutor_label" => Ok(Self::TutorLabel),
            "tutor_text" => Ok(Self::TutorText),
            "tutor_waiting" => Ok(Self::TutorWaiting),
            "tutor_error" => Ok(Self::TutorError),
            "system_info" => Ok(Self::SystemInfo),
            "system_error" => Ok(Self::SystemError),
            "banner" => Ok(Self::Banner),
            _ => Err(format!("unknown token '{value}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOverride {
    pub fg: Option<HexColor>,
    pub bg: Option<HexColor>,
    pub modifiers: Option<Vec<ThemeModifier>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || "invalid hex color, expected #RRGGBB".to_string();
        let digits = value
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.is_ascii())
            .ok_or_else(invalid)?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeModifier {
    Bold,
    Dim,
    Italic,
    Underlined,
    Reversed,
    CrossedOut,
}

impl FromStr for ThemeModifier {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "bold" => Ok(Self::Bold),
            "dim" => Ok(Self::Dim),
            "italic" => Ok(Self::Italic),
            "underlined" => Ok(Self::Underlined),
            "reversed" => Ok(Self::Reversed),
            "crossed_out" => Ok(Self::CrossedOut),
            _ => Err(format!("unknown modifier '{value}'")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    gemini_api_key: Option<String>,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    max_history: Option<i64>,
    generation: Option<RawGenerationConfig>,
    theme: Option<RawThemeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGenerationConfig {
    temperature: Option<f64>,
    top_p: Option<f64>,
    top_k: Option<i64>,
    max_output_tokens: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThemeConfig {
    name: Option<String>,
    styles: Option<HashMap<String, RawStyleOverride>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStyleOverride {
    fg: Option<String>,
    bg: Option<String>,
    modifiers: Option<Vec<String>>,
}

impl AppConfig {
    /// Resolution order, lowest first: defaults, config file, `.env`, process env.
    pub fn load_with_path(explicit_path: Option<&Path>) -> Result<Self> {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.is_file() {
                    bail!(
                        "Failed to load config {}: file does not exist",
                        path.display()
                    );
                }
                path.to_path_buf()
            }
            None => discover_config_path()?,
        };
        let file_config = load_file_config(&config_path)?;

        dotenvy::dotenv().ok();

        let file_api_key = file_config
            .as_ref()
            .and_then(|cfg| cfg.gemini_api_key.as_deref())
            .and_then(|value| non_empty(value).map(ToOwned::to_owned));
        let file_model = file_config
            .as_ref()
            .and_then(|cfg| cfg.gemini_model.as_deref())
            .and_then(|value| non_empty(value).map(ToOwned::to_owned));
        let file_base_url = file_config
            .as_ref()
            .and_then(|cfg| cfg.gemini_base_url.as_deref())
            .and_then(|value| non_empty(value).map(ToOwned::to_owned));

        let max_history = match env_non_empty("DS_TUTOR_MAX_HISTORY") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|value| *value >= 1)
                .ok_or_else(|| {
                    anyhow!("Invalid DS_TUTOR_MAX_HISTORY '{raw}': expected a positive integer")
                })?,
            None => match file_config.as_ref().and_then(|cfg| cfg.max_history) {
                Some(value) => usize::try_from(value)
                    .ok()
                    .filter(|value| *value >= 1)
                    .ok_or_else(|| {
                        config_error(&config_path, "max_history", "must be at least 1")
                    })?,
                None => DEFAULT_MAX_HISTORY,
            },
        };

        let generation = validate_generation(
            file_config.as_ref().and_then(|cfg| cfg.generation.as_ref()),
            &config_path,
        )?;
        let theme = validate_theme(
            file_config.as_ref().and_then(|cfg| cfg.theme.as_ref()),
            &config_path,
        )?;

        Ok(Self {
            gemini_api_key: API_KEY_VARS
                .iter()
                .find_map(|key| env_non_empty(key))
                .or(file_api_key),
            gemini_model: env_non_empty("GEMINI_MODEL")
                .or(file_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: env_non_empty("GEMINI_BASE_URL")
                .or(file_base_url)
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            max_history,
            generation,
            theme,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

fn validate_generation(
    raw: Option<&RawGenerationConfig>,
    config_path: &Path,
) -> Result<GenerationConfig> {
    let mut config = GenerationConfig::default();
    let Some(raw) = raw else {
        return Ok(config);
    };

    if let Some(temperature) = raw.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(config_error(
                config_path,
                "generation.temperature",
                "must be between 0 and 2",
            ));
        }
        config.temperature = temperature as f32;
    }
    if let Some(top_p) = raw.top_p {
        if !(top_p > 0.0 && top_p <= 1.0) {
            return Err(config_error(
                config_path,
                "generation.top_p",
                "must be greater than 0 and at most 1",
            ));
        }
        config.top_p = top_p as f32;
    }
    if let Some(top_k) = raw.top_k {
        config.top_k = positive_u32(top_k, config_path, "generation.top_k")?;
    }
    if let Some(max_output_tokens) = raw.max_output_tokens {
        config.max_output_tokens =
            positive_u32(max_output_tokens, config_path, "generation.max_output_tokens")?;
    }

    Ok(config)
}

fn positive_u32(value: i64, config_path: &Path, key_path: &str) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| config_error(config_path, key_path, "must be a positive integer"))
}

fn validate_theme(raw_theme: Option<&RawThemeConfig>, config_path: &Path) -> Result<ThemeConfig> {
    let mut config = ThemeConfig::default();
    let Some(theme) = raw_theme else {
        return Ok(config);
    };

    if let Some(name) = &theme.name {
        config.preset = ThemePreset::from_str(name)
            .map_err(|reason| config_error(config_path, "theme.name", &reason))?;
    }

    for (token_name, raw_style) in theme.styles.iter().flatten() {
        let key_path = format!("theme.styles.{token_name}");
        let token = ThemeToken::from_str(token_name)
            .map_err(|reason| config_error(config_path, &key_path, &reason))?;

        let color = |value: Option<&str>, field: &str| {
            value
                .map(HexColor::from_str)
                .transpose()
                .map_err(|reason| config_error(config_path, &format!("{key_path}.{field}"), &reason))
        };
        let fg = color(raw_style.fg.as_deref(), "fg")?;
        let bg = color(raw_style.bg.as_deref(), "bg")?;
        let modifiers = raw_style
            .modifiers
            .as_ref()
            .map(|values| {
                values
                    .iter()
                    .map(|value| ThemeModifier::from_str(value))
                    .collect::<std::result::Result<Vec<_>, _>>()
            })
            .transpose()
            .map_err(|reason| {
                config_error(config_path, &format!("{key_path}.modifiers"), &reason)
            })?;

        config.styles.insert(token, StyleOverride { fg, bg, modifiers });
    }

    Ok(config)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| non_empty(&value).map(ToOwned::to_owned))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::{
        AppConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, HexColor, ThemeConfig,
        ThemeModifier, ThemePreset, ThemeToken,
    };
    use crate::llm::GenerationConfig;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use std::path::Path;

    fn reset_vars() {
        unsafe {
            for key in [
                "GEMINI_API_KEY",
                "GOOGLE_API_KEY",
                "GEMINI_MODEL",
                "GEMINI_BASE_URL",
                "DS_TUTOR_MAX_HISTORY",
                "XDG_CONFIG_HOME",
            ] {
                env::remove_var(key);
            }
        }
    }

    fn with_cwd<T>(path: &Path, f: impl FnOnce() -> T) -> T {
        let cwd = env::current_dir().expect("current dir");
        env::set_current_dir(path).expect("set current dir");
        let result = f();
        env::set_current_dir(cwd).expect("restore current dir");
        result
    }

    /// Writes `config.toml` under `<tmp>/ds_tutor/` and points XDG_CONFIG_HOME at `<tmp>`.
    fn write_default_config(tmp: &Path, content: &str) {
        let config_dir = tmp.join("ds_tutor");
        fs::create_dir_all(&config_dir).expect("create config dir");
        let path = config_dir.join("config.toml");
        fs::write(&path, content).expect("write config");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp);
        }
    }

    fn load_in(tmp: &Path) -> anyhow::Result<AppConfig> {
        with_cwd(tmp, || AppConfig::load_with_path(None))
    }

    #[test]
    #[serial]
    fn load_uses_defaults_without_file_or_env() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.gemini_api_key, None);
        assert_eq!(cfg.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(cfg.gemini_base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(cfg.max_history, 20);
        assert_eq!(cfg.generation, GenerationConfig::default());
        assert_eq!(cfg.theme, ThemeConfig::default());
    }

    #[test]
    #[serial]
    fn load_env_overrides_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(
            tmp.path(),
            r#"
gemini_api_key = "file_key"
gemini_model = "file_model"
gemini_base_url = "https://example.com"
max_history = 7
"#,
        );
        unsafe {
            env::set_var("GEMINI_API_KEY", "os_key");
            env::set_var("GEMINI_MODEL", "os_model");
            env::set_var("DS_TUTOR_MAX_HISTORY", "3");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("os_key"));
        assert_eq!(cfg.gemini_model, "os_model");
        assert_eq!(cfg.gemini_base_url, "https://example.com");
        assert_eq!(cfg.max_history, 3);
    }

    #[test]
    #[serial]
    fn load_falls_back_to_google_api_key() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
            env::set_var("GOOGLE_API_KEY", "google_key");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("google_key"));

        unsafe {
            env::set_var("GEMINI_API_KEY", "gemini_key");
        }
        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("gemini_key"));
    }

    #[test]
    #[serial]
    fn load_reads_dotenv_without_overriding_real_env() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        fs::write(
            tmp.path().join(".env"),
            "GEMINI_API_KEY=dotenv_key\nGEMINI_MODEL=dotenv_model\n",
        )
        .expect("write env file");
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
            env::set_var("GEMINI_MODEL", "os_model");
        }

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.gemini_api_key.as_deref(), Some("dotenv_key"));
        assert_eq!(cfg.gemini_model, "os_model");
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_with_explicit_path_skips_discovery() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "   ");
        }
        let path = tmp.path().join("custom.toml");
        fs::write(&path, r#"gemini_model = "explicit""#).expect("write config");

        let cfg = with_cwd(tmp.path(), || AppConfig::load_with_path(Some(&path)))
            .expect("load config");
        assert_eq!(cfg.gemini_model, "explicit");
    }

    #[test]
    #[serial]
    fn load_with_missing_explicit_path_fails() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        let path = tmp.path().join("missing.toml");

        let err = AppConfig::load_with_path(Some(&path)).expect_err("load should fail");
        assert!(err.to_string().contains("file does not exist"));
    }

    #[test]
    #[serial]
    fn load_fails_when_xdg_config_home_is_empty() {
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "   ");
        }

        let err = AppConfig::load_with_path(None).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("Failed to resolve config path: XDG_CONFIG_HOME is set but empty")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_root_key() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(tmp.path(), "unknown_key = 1");

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("Failed to load config"));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    #[serial]
    fn load_rejects_zero_max_history() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(tmp.path(), "max_history = 0");

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("max_history: must be at least 1"));
    }

    #[test]
    #[serial]
    fn load_rejects_non_numeric_max_history_env() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        unsafe {
            env::set_var("XDG_CONFIG_HOME", tmp.path());
            env::set_var("DS_TUTOR_MAX_HISTORY", "lots");
        }

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(err.to_string().contains("Invalid DS_TUTOR_MAX_HISTORY 'lots'"));
        reset_vars();
    }

    #[test]
    #[serial]
    fn load_parses_generation_overrides() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(
            tmp.path(),
            r#"
[generation]
temperature = 0.7
top_k = 40
max_output_tokens = 512
"#,
        );

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(
            cfg.generation,
            GenerationConfig {
                temperature: 0.7,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 512,
            }
        );
    }

    #[test]
    #[serial]
    fn load_rejects_out_of_range_generation_values() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();

        for (content, needle) in [
            ("[generation]\ntemperature = 3.5", "generation.temperature"),
            ("[generation]\ntop_p = 0.0", "generation.top_p"),
            ("[generation]\ntop_k = 0", "generation.top_k"),
            ("[generation]\nmax_output_tokens = -5", "generation.max_output_tokens"),
        ] {
            write_default_config(tmp.path(), content);
            let err = load_in(tmp.path()).expect_err("load should fail");
            assert!(err.to_string().contains(needle), "{err} missing {needle}");
        }
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_style_token() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(
            tmp.path(),
            r##"
[theme.styles.sidebar]
fg = "#ffffff"
"##,
        );

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("theme.styles.sidebar: unknown token 'sidebar'")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_invalid_hex_color() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(
            tmp.path(),
            r#"
[theme.styles.tutor_text]
fg = "red"
"#,
        );

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("theme.styles.tutor_text.fg: invalid hex color")
        );
    }

    #[test]
    #[serial]
    fn load_fails_on_unknown_modifier() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(
            tmp.path(),
            r#"
[theme.styles.tutor_text]
modifiers = ["sparkly"]
"#,
        );

        let err = load_in(tmp.path()).expect_err("load should fail");
        assert!(
            err.to_string()
                .contains("theme.styles.tutor_text.modifiers: unknown modifier 'sparkly'")
        );
    }

    #[test]
    #[serial]
    fn load_parses_theme_config_with_strong_types() {
        let tmp = tempfile::tempdir().expect("tempdir");
        reset_vars();
        write_default_config(
            tmp.path(),
            r##"
[theme]
name = "light"

[theme.styles.tutor_label]
fg = "#A0B1C2"
modifiers = ["bold", "italic"]
"##,
        );

        let cfg = load_in(tmp.path()).expect("load config");
        assert_eq!(cfg.theme.preset, ThemePreset::Light);
        let style = cfg
            .theme
            .styles
            .get(&ThemeToken::TutorLabel)
            .expect("tutor_label style");
        assert_eq!(
            style.fg,
            Some(HexColor {
                r: 0xA0,
                g: 0xB1,
                b: 0xC2
            })
        );
        assert_eq!(style.bg, None);
        assert_eq!(
            style.modifiers,
            Some(vec![ThemeModifier::Bold, ThemeModifier::Italic])
        );
    }

    #[test]
    fn hex_color_rejects_malformed_values() {
        for value in ["", "#fff", "123456", "#12345g", "#ééé"] {
            assert!(value.parse::<HexColor>().is_err(), "accepted {value:?}");
        }
    }
}
