use chrono::{DateTime, Local};

pub const GREETING: &str = "Hi there! Ask me anything about the selected email.";
pub const APOLOGY: &str = "I'm sorry, I encountered an error while processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    /// Placeholder while a reply is outstanding.
    Typing,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
    pub at: DateTime<Local>,
}

/// Handle for an outstanding reply. Only valid within the transcript
/// generation that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReply {
    epoch: u64,
    slot: usize,
}

#[derive(Debug)]
pub struct ChatTranscript {
    entries: Vec<ChatEntry>,
    epoch: u64,
    pub follow_tail: bool,
}

impl Default for ChatTranscript {
    fn default() -> Self {
        let mut transcript = Self {
            entries: Vec::new(),
            epoch: 0,
            follow_tail: true,
        };
        transcript.reset();
        transcript
    }
}

impl ChatTranscript {
    /// Discards history and shows the greeting. Replies still in flight are dropped.
    pub fn reset(&mut self) {
        self.clear();
        self.push(ChatRole::Assistant, GREETING.to_string());
    }

    pub fn clear(&mut self) {
        self.epoch += 1;
        self.entries.clear();
        self.follow_tail = true;
    }

    fn push(&mut self, role: ChatRole, text: String) -> usize {
        self.entries.push(ChatEntry {
            role,
            text,
            at: Local::now(),
        });
        self.follow_tail = true;
        self.entries.len() - 1
    }

    pub fn push_user(&mut self, text: &str) {
        self.push(ChatRole::User, text.to_string());
    }

    pub fn push_pending(&mut self) -> PendingReply {
        let slot = self.push(ChatRole::Typing, "...".to_string());
        PendingReply {
            epoch: self.epoch,
            slot,
        }
    }

    /// Replaces the typing indicator. Returns false when the transcript was
    /// reset since the request went out.
    pub fn resolve(&mut self, pending: PendingReply, text: String) -> bool {
        if pending.epoch != self.epoch {
            return false;
        }
        match self.entries.get_mut(pending.slot) {
            Some(entry) if entry.role == ChatRole::Typing => {
                entry.role = ChatRole::Assistant;
                entry.text = text;
                entry.at = Local::now();
                self.follow_tail = true;
                true
            }
            _ => false,
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_greeting() {
        let chat = ChatTranscript::default();
        assert_eq!(chat.entries().len(), 1);
        assert_eq!(chat.entries()[0].text, GREETING);
        assert_eq!(chat.entries()[0].role, ChatRole::Assistant);
    }

    #[test]
    fn reply_replaces_typing_indicator() {
        let mut chat = ChatTranscript::default();
        chat.push_user("When is the deadline?");
        let pending = chat.push_pending();
        assert!(chat.resolve(pending, "March 31st.".into()));

        let texts: Vec<&str> = chat.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec![GREETING, "When is the deadline?", "March 31st."]);
        assert!(chat.entries().iter().all(|e| e.role != ChatRole::Typing));
    }

    #[test]
    fn reply_after_reset_is_dropped() {
        let mut chat = ChatTranscript::default();
        chat.push_user("hello");
        let pending = chat.push_pending();
        chat.reset();
        assert!(!chat.resolve(pending, "late".into()));
        assert_eq!(chat.entries().len(), 1);
    }

    #[test]
    fn concurrent_replies_land_in_their_own_slots() {
        let mut chat = ChatTranscript::default();
        chat.push_user("one");
        let first = chat.push_pending();
        chat.push_user("two");
        let second = chat.push_pending();

        assert!(chat.resolve(second, "reply two".into()));
        assert!(chat.resolve(first, "reply one".into()));
        assert!(!chat.resolve(first, "again".into()));

        let texts: Vec<&str> = chat.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec![GREETING, "one", "reply one", "two", "reply two"]);
    }
}
