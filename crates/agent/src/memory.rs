use hindsight_core::budget::TextBudgeter;

use crate::llm::ChatMessage;

/// Token-bounded replay of the thread so far.
///
/// Messages append in thread order; once the total token count passes the
/// model budget, the oldest messages fall off. The newest message always
/// stays, even if it alone exceeds the budget.
pub struct ConversationMemory {
    budgeter: TextBudgeter,
    limit: usize,
    messages: Vec<ChatMessage>,
    token_counts: Vec<usize>,
}

impl ConversationMemory {
    pub fn new(budgeter: TextBudgeter) -> Self {
        let limit = budgeter.budget();
        Self { budgeter, limit, messages: Vec::new(), token_counts: Vec::new() }
    }

    pub fn add_user(&mut self, content: String) {
        self.push(ChatMessage::user(content));
    }

    pub fn add_assistant(&mut self, content: String) {
        self.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn push(&mut self, message: ChatMessage) {
        self.token_counts.push(self.budgeter.token_count(&message.content));
        self.messages.push(message);

        let mut total: usize = self.token_counts.iter().sum();
        while total > self.limit && self.messages.len() > 1 {
            total -= self.token_counts.remove(0);
            self.messages.remove(0);
        }
    }
}
