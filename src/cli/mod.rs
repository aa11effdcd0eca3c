mod args;
mod commands;
mod repl;
mod secret;
pub(crate) mod theme;

pub use args::CliArgs;
pub use repl::{AppState, run_repl};
pub(crate) use secret::{KEY_MISSING, prompt_for_api_key};
pub use theme::Theme;
