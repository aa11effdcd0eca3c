use crate::cli::commands::{Command, HELP_TEXT, is_command_line, parse_command};
use crate::cli::theme::Theme;
use crate::config::ThemeToken;
use crate::llm::LlmProvider;
use crate::memory::ConversationMemory;
use crate::session::Session;
use crate::tutor::Tutor;
use anyhow::Result;
use crossterm::{cursor, queue, terminal};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};
use std::borrow::Cow;
use std::io::{self, Write};

pub const USER_PROMPT: &str = "you> ";
const TUTOR_LABEL: &str = "AI Tutor:";
const WAITING_TEXT: &str = "Thinking...";
const HISTORY_PREVIEW_CHARS: usize = 80;

const TOPICS: [&str; 6] = [
    "Machine Learning algorithms",
    "Statistical methods",
    "Python, R, SQL for data science",
    "Data visualization techniques",
    "Data cleaning and preprocessing",
    "And more data science related topics!",
];

pub struct AppState<P> {
    pub session: Session,
    pub tutor: Tutor<P>,
    pub theme: Theme,
    /// Whether a transient "Thinking..." line can be drawn and erased.
    pub interactive: bool,
}

/// Paints the `you> ` prompt with the `user_prompt` theme style.
struct PromptHelper {
    styled_prompt: String,
}

impl PromptHelper {
    fn new(theme: &Theme) -> Self {
        Self {
            styled_prompt: theme.paint(ThemeToken::UserPrompt, USER_PROMPT),
        }
    }
}

impl Highlighter for PromptHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default && prompt == USER_PROMPT {
            Cow::Borrowed(self.styled_prompt.as_str())
        } else {
            Cow::Borrowed(prompt)
        }
    }
}

impl Completer for PromptHelper {
    type Candidate = String;
}

impl Hinter for PromptHelper {
    type Hint = String;
}

impl Validator for PromptHelper {}

impl Helper for PromptHelper {}

pub async fn run_repl<P: LlmProvider>(state: &mut AppState<P>) -> Result<()> {
    let mut rl = Editor::<PromptHelper, DefaultHistory>::new()?;
    rl.set_helper(Some(PromptHelper::new(&state.theme)));
    let mut out = io::stdout();
    write_banner(state, &mut out)?;

    loop {
        match rl.readline(USER_PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);
                handle_line(state, line, &mut out).await?;
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}

pub(crate) async fn handle_line<P: LlmProvider, W: Write>(
    state: &mut AppState<P>,
    line: &str,
    out: &mut W,
) -> Result<()> {
    if is_command_line(line) {
        if let Some(trace) = state.session.trace() {
            trace.log_command(line);
        }
        return match parse_command(line) {
            Ok(command) => run_command(state, command, out),
            Err(err) => write_system(state, out, ThemeToken::SystemError, err.message()),
        };
    }

    if state.interactive {
        write!(
            out,
            "{}",
            state.theme.paint(ThemeToken::TutorWaiting, WAITING_TEXT)
        )?;
        out.flush()?;
    }

    let reply = state.session.ask(&state.tutor, line).await;

    if state.interactive {
        queue!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )?;
    }

    let body_token = if reply.failed {
        ThemeToken::TutorError
    } else {
        ThemeToken::TutorText
    };
    writeln!(out, "{}", state.theme.paint(ThemeToken::TutorLabel, TUTOR_LABEL))?;
    for text_line in reply.text.lines() {
        writeln!(out, "{}", state.theme.paint(body_token, text_line))?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn run_command<P: LlmProvider, W: Write>(
    state: &mut AppState<P>,
    command: Command,
    out: &mut W,
) -> Result<()> {
    match command {
        Command::Help => write_system(state, out, ThemeToken::SystemInfo, HELP_TEXT),
        Command::Clear => {
            state.session.clear();
            if state.interactive {
                queue!(
                    out,
                    terminal::Clear(terminal::ClearType::All),
                    cursor::MoveTo(0, 0)
                )?;
            }
            write_system(
                state,
                out,
                ThemeToken::SystemInfo,
                "Conversation cleared.",
            )
        }
        Command::History(last) => {
            let text = history_lines(state.session.memory(), last).join("\n");
            write_system(state, out, ThemeToken::SystemInfo, &text)
        }
        Command::About => {
            let text = about_text(state.tutor.model());
            write_system(state, out, ThemeToken::SystemInfo, &text)
        }
        Command::Trace => {
            let text = match state.session.trace() {
                Some(trace) => format!(
                    "Session {} trace file: {}",
                    state.session.id(),
                    trace.file_path().display()
                ),
                None => "Tracing is disabled for this session.".to_string(),
            };
            write_system(state, out, ThemeToken::SystemInfo, &text)
        }
    }
}

fn write_banner<P: LlmProvider, W: Write>(state: &AppState<P>, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "{}",
        state.theme.paint(ThemeToken::Banner, "Data Science AI Tutor")
    )?;
    writeln!(
        out,
        "{}",
        state.theme.paint(
            ThemeToken::SystemInfo,
            "This AI tutor is designed to help you with data science concepts, programming, statistics, and more.\nAsk any data science related question to get started! Type /help for commands."
        )
    )?;
    writeln!(out)?;
    for line in about_text(state.tutor.model()).lines() {
        writeln!(out, "{}", state.theme.paint(ThemeToken::SystemInfo, line))?;
    }
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn write_system<P, W: Write>(
    state: &AppState<P>,
    out: &mut W,
    token: ThemeToken,
    text: &str,
) -> Result<()> {
    if let Some(trace) = state.session.trace() {
        trace.log_system(text);
    }
    for line in text.lines() {
        writeln!(out, "{}", state.theme.paint(token, line))?;
    }
    out.flush()?;
    Ok(())
}

pub(crate) fn about_text(model: &str) -> String {
    let mut text = format!(
        "This Data Science Tutor uses {model} to answer your data science questions.\n\nTopics you can ask about:"
    );
    for topic in TOPICS {
        text.push_str("\n  - ");
        text.push_str(topic);
    }
    text
}

pub(crate) fn history_lines(memory: &ConversationMemory, last: Option<usize>) -> Vec<String> {
    let history = memory.history();
    if history.is_empty() {
        return vec!["No exchanges yet.".to_string()];
    }

    let skip = last.map_or(0, |n| history.len().saturating_sub(n));
    history
        .iter()
        .enumerate()
        .skip(skip)
        .flat_map(|(index, exchange)| {
            [
                format!("{}. Human: {}", index + 1, preview(&exchange.question)),
                format!("   AI Tutor: {}", preview(&exchange.answer)),
            ]
        })
        .collect()
}

fn preview(text: &str) -> String {
    let mut lines = text.lines();
    let first_line = lines.next().unwrap_or("");
    let truncated: String = first_line.chars().take(HISTORY_PREVIEW_CHARS).collect();
    let cut_short = first_line.chars().count() > HISTORY_PREVIEW_CHARS;
    let more_lines = lines.any(|line| !line.trim().is_empty());
    if cut_short || more_lines {
        format!("{truncated}...")
    } else {
        truncated
    }
}
