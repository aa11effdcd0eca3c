use crate::llm::LlmProvider;
use crate::memory::ConversationMemory;
use crate::trace::SessionTrace;
use crate::tutor::{Reply, Tutor};
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything that lives for one chat session: created when the REPL starts,
/// dropped when it exits.
pub struct Session {
    id: String,
    memory: ConversationMemory,
    trace: Option<SessionTrace>,
}

impl Session {
    pub fn new(id: String, max_history: usize, trace: Option<SessionTrace>) -> Self {
        Self {
            id,
            memory: ConversationMemory::new(max_history),
            trace,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn trace(&self) -> Option<&SessionTrace> {
        self.trace.as_ref()
    }

    /// Runs one round-trip and records it. Failed generations are stored as
    /// the answer too, since that is what the user saw.
    pub async fn ask<P: LlmProvider>(&mut self, tutor: &Tutor<P>, question: &str) -> Reply {
        if let Some(trace) = &self.trace {
            trace.log_question(question);
        }

        let reply = tutor.reply(&self.memory, question).await;

        if let Some(trace) = &self.trace {
            if reply.failed {
                trace.log_generation_error(&reply.text);
            } else {
                trace.log_answer(&reply.text);
            }
        }

        self.memory.add_exchange(question, reply.text.clone());
        reply
    }

    pub fn clear(&mut self) {
        self.memory.clear();
    }
}

pub fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
