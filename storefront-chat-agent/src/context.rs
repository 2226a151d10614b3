//! Context builder for assembling completion payloads

use storefront_chat_core::session::{ConversationLog, Role};
use storefront_chat_providers::Message;

/// Builds the outbound message list for completion requests
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    /// Create a new context builder with the configured persona text
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// The system instruction sent ahead of every conversation
    pub fn build_system_prompt(&self) -> String {
        self.system_prompt.trim().to_string()
    }

    /// Build the complete message list for a completion call.
    ///
    /// The system instruction is synthesized here on every call and never
    /// stored; system-role entries found in the log are skipped.
    pub fn build_messages(&self, log: &ConversationLog) -> Vec<Message> {
        let mut messages = Vec::with_capacity(log.len() + 1);
        messages.push(Message::system(self.build_system_prompt()));

        for msg in log {
            if msg.role == Role::System {
                continue;
            }
            messages.push(Message::from(msg));
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_prepends_system_prompt() {
        let builder = ContextBuilder::new("You are the Fashion Store assistant.\n");
        let mut log = ConversationLog::new();
        log.add_message(Role::User, "Hello");
        log.add_message(Role::Assistant, "Hi!");
        log.add_message(Role::User, "Any jackets?");

        let messages = builder.build_messages(&log);

        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages[0],
            Message::system("You are the Fashion Store assistant.")
        );
        assert_eq!(messages[1], Message::user("Hello"));
        assert_eq!(messages[2], Message::assistant("Hi!"));
        assert_eq!(messages[3], Message::user("Any jackets?"));
    }

    #[test]
    fn test_build_messages_skips_stored_system_entries() {
        let builder = ContextBuilder::new("persona");
        let mut log = ConversationLog::new();
        log.add_message(Role::System, "stale persona");
        log.add_message(Role::User, "Hello");

        let messages = builder.build_messages(&log);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "persona");
        assert_eq!(messages[1].role, Role::User);
    }
}
