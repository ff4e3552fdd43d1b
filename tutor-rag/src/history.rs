//! Bounded conversation history for a chat session.

use std::collections::VecDeque;

use crate::model::ChatMessage;

/// The most recent user/assistant messages of a session.
///
/// Holds at most `capacity` messages; appending past the cap discards the
/// oldest ones. Lives only as long as the session.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(capacity: usize) -> Self {
        Self { messages: VecDeque::with_capacity(capacity), capacity }
    }

    /// Record one question and its answer.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.push_back(ChatMessage::user(question));
        self.messages.push_back(ChatMessage::assistant(answer));
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn keeps_most_recent_messages() {
        let mut history = ConversationHistory::new(4);
        for i in 0..3 {
            history.push_exchange(format!("q{i}"), format!("a{i}"));
        }

        let contents: Vec<&str> = history.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["q1", "a1", "q2", "a2"]);
        assert_eq!(history.messages().next().map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = ConversationHistory::new(0);
        history.push_exchange("q", "a");
        assert!(history.is_empty());
    }
}
