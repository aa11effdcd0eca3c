use anyhow::{Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};

pub(crate) const KEY_PROMPT: &str = "Enter your Google API Key: ";
pub(crate) const KEY_MISSING: &str = "Please enter your Google API Key to use the application";

/// Outcome of feeding one key press to [`SecretInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SecretStep {
    Pending,
    Done(String),
    Cancelled,
}

/// Collects a secret from key presses without echoing it.
#[derive(Debug, Default)]
pub(crate) struct SecretInput {
    buffer: String,
}

impl SecretInput {
    pub(crate) fn feed(&mut self, key: KeyEvent) -> SecretStep {
        if key.kind == KeyEventKind::Release {
            return SecretStep::Pending;
        }

        match key.code {
            KeyCode::Enter => SecretStep::Done(std::mem::take(&mut self.buffer)),
            KeyCode::Esc => SecretStep::Cancelled,
            KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                SecretStep::Cancelled
            }
            KeyCode::Backspace => {
                self.buffer.pop();
                SecretStep::Pending
            }
            KeyCode::Char(ch) => {
                self.buffer.push(ch);
                SecretStep::Pending
            }
            _ => SecretStep::Pending,
        }
    }
}

/// Prompts for the API key on the terminal. The key stays in memory only.
pub(crate) fn prompt_for_api_key() -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{KEY_PROMPT}")?;
    stdout.flush()?;

    terminal::enable_raw_mode()?;
    let entered = read_secret();
    terminal::disable_raw_mode()?;
    writeln!(stdout)?;

    match entered? {
        Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => bail!(KEY_MISSING),
    }
}

fn read_secret() -> Result<Option<String>> {
    let mut input = SecretInput::default();
    loop {
        if let Event::Key(key) = event::read()? {
            match input.feed(key) {
                SecretStep::Pending => {}
                SecretStep::Done(secret) => return Ok(Some(secret)),
                SecretStep::Cancelled => return Ok(None),
            }
        }
    }
}
