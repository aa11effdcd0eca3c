pub const DEFAULT_MAX_HISTORY: usize = 20;

/// One user question paired with the tutor's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Bounded log of the exchanges in the current session, oldest first.
///
/// Once the log holds `max_history` exchanges, each new one evicts the oldest.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    max_history: usize,
    exchanges: Vec<Exchange>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ConversationMemory {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            exchanges: Vec::with_capacity(max_history),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn add_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.exchanges.push(Exchange::new(question, answer));

        if self.exchanges.len() > self.max_history {
            let excess = self.exchanges.len() - self.max_history;
            self.exchanges.drain(..excess);
        }
    }

    pub fn history(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn format_for_prompt(&self) -> String {
        let mut formatted = String::new();
        for exchange in &self.exchanges {
            formatted.push_str("Human: ");
            formatted.push_str(&exchange.question);
            formatted.push('\n');
            formatted.push_str("AI Tutor: ");
            formatted.push_str(&exchange.answer);
            formatted.push_str("\n\n");
        }
        formatted
    }
}
