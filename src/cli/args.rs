use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "ds_tutor")]
#[command(
    about = "Data science tutor chat backed by Google Gemini",
    long_about = "Data science tutor chat backed by Google Gemini\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/ds_tutor/config.toml\n    2. ~/.config/ds_tutor/config.toml\n\nThe API key is read from GEMINI_API_KEY, GOOGLE_API_KEY, a .env file or the config file,\nand is prompted for when none is set."
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Gemini model to use, overriding config and GEMINI_MODEL.
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Number of past exchanges included in each prompt.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_history: Option<u16>,

    /// Dump redacted HTTP requests and responses to stderr.
    #[arg(long)]
    pub verbose: bool,

    /// Do not write a session trace file.
    #[arg(long)]
    pub no_trace: bool,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn parse_defaults() {
        let args = CliArgs::try_parse_from(["ds_tutor"]).expect("should parse");
        assert_eq!(args.config, None);
        assert_eq!(args.model, None);
        assert_eq!(args.max_history, None);
        assert!(!args.verbose);
        assert!(!args.no_trace);
    }

    #[test]
    fn parse_all_flags() {
        let args = CliArgs::try_parse_from([
            "ds_tutor",
            "--config",
            "/tmp/custom.toml",
            "--model",
            "gemini-2.0-flash",
            "--max-history",
            "5",
            "--verbose",
            "--no-trace",
        ])
        .expect("parse");
        assert_eq!(
            args.config.as_deref(),
            Some(std::path::Path::new("/tmp/custom.toml"))
        );
        assert_eq!(args.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(args.max_history, Some(5));
        assert!(args.verbose);
        assert!(args.no_trace);
    }

    #[test]
    fn parse_rejects_zero_max_history() {
        assert!(CliArgs::try_parse_from(["ds_tutor", "--max-history", "0"]).is_err());
    }
}
