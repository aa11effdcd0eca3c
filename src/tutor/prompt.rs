use time::OffsetDateTime;
use time::macros::format_description;

pub const TUTOR_SYSTEM_PROMPT: &str = r#"You are a helpful and knowledgeable Data Science Tutor. Your purpose is to assist users with their data science related questions and problems.

Guidelines:
1. Only answer questions related to data science, statistics, machine learning, data analysis, programming for data science (Python, R, SQL), data visualization, or related fields.
2. If the user asks questions unrelated to data science, politely redirect them and mention that you're specifically designed to help with data science topics.
3. Provide clear, concise, and educational answers that help the user understand concepts.
4. When appropriate, include code examples to illustrate concepts or solutions.
5. If a concept is complex, break it down into simpler components.
6. Maintain the context of the conversation and refer back to previous questions when relevant.

Current date: {date}"#;

pub fn system_prompt(date: &str) -> String {
    TUTOR_SYSTEM_PROMPT.replace("{date}", date)
}

/// Assembles the single text blob sent to the model. The trailing `AI Tutor:`
/// leaves the model to continue the transcript.
pub fn build_prompt(history: &str, question: &str, date: &str) -> String {
    format!(
        "{}\n\nPrevious conversation:\n{history}\nHuman: {question}\nAI Tutor:",
        system_prompt(date)
    )
}

/// Today's date as `October 18, 2026`, local time when the offset is known.
pub fn current_date_label() -> String {
    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();
    let format = format_description!("[month repr:long] [day], [year]");
    today
        .format(&format)
        .unwrap_or_else(|_| today.to_string())
}
