use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::message::Message;

/// Greeting the assistant opens every session with
pub const DEFAULT_GREETING: &str =
    "Hi! I'm your assistant. Ask me about anything you need help with and I will try to help out.";

/// In-memory transcript for the active session.
///
/// Entries are append-only. Reads hand out owned copies, so history can only
/// grow through [`ConversationStore::append`]. Appends take `&self` so several
/// exchanges can share one store behind an `Arc`.
#[derive(Debug)]
pub struct ConversationStore {
    greeting: String,
    messages: Mutex<Vec<Message>>,
}

impl ConversationStore {
    /// Create a session seeded with a single assistant greeting
    pub fn new(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        let seeded = vec![Message::assistant(greeting.clone())];
        Self {
            greeting,
            messages: Mutex::new(seeded),
        }
    }

    /// Add a message to the end of the transcript
    pub fn append(&self, message: Message) {
        self.lock().push(message);
    }

    /// Owned copy of the transcript in display order
    pub fn snapshot(&self) -> Vec<Message> {
        self.lock().clone()
    }

    /// Drop everything and start over from the greeting
    pub fn reset(&self) {
        let mut messages = self.lock();
        messages.clear();
        messages.push(Message::assistant(self.greeting.clone()));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        // A poisoned lock still guards a whole Vec; pushes never leave it half-written.
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn starts_with_single_greeting() {
        let store = ConversationStore::default();
        let history = store.snapshot();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role(), Role::Assistant);
        assert_eq!(history[0].content(), DEFAULT_GREETING);
    }

    #[test]
    fn append_keeps_insertion_order() {
        let store = ConversationStore::new("hello");
        store.append(Message::user("one"));
        store.append(Message::assistant("two"));

        let contents: Vec<_> = store
            .snapshot()
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(contents, vec!["hello", "one", "two"]);
    }

    #[test]
    fn snapshot_is_detached_from_store() {
        let store = ConversationStore::default();
        let mut copy = store.snapshot();
        copy.push(Message::user("sneaky"));
        copy.clear();

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reset_restores_fresh_greeting() {
        let store = ConversationStore::new("welcome");
        let original_id = store.snapshot()[0].id().to_string();
        store.append(Message::user("hi"));
        store.reset();

        let history = store.snapshot();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content(), "welcome");
        assert_ne!(history[0].id(), original_id);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let store = std::sync::Arc::new(ConversationStore::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        store.append(Message::user(format!("{i}-{j}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1 + 8 * 25);
    }
}
