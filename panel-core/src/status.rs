//! Single-slot transient status messages.
//!
//! One message is visible at a time; a new one preempts whatever is showing
//! and restarts the dismissal clock. The messenger does not own a timer —
//! the view schedules dismissal after [`STATUS_DISMISS_MS`] and hands back
//! the token it was given, so a preempted message's timer cannot clear its
//! successor.

use std::sync::Mutex;

/// How long a message stays visible unless preempted, in milliseconds.
pub const STATUS_DISMISS_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

/// The message currently occupying the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub outcome: Outcome,
    pub text: String,
}

/// Names one occupancy of the slot. Stale tokens dismiss nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageToken(u64);

#[derive(Debug, Default)]
pub struct StatusMessenger {
    inner: Mutex<MessengerInner>,
}

#[derive(Debug, Default)]
struct MessengerInner {
    current: Option<StatusMessage>,
    generation: u64,
}

impl StatusMessenger {
    pub fn new() -> StatusMessenger {
        StatusMessenger::default()
    }

    /// Replace whatever is showing. Multiple texts are joined with single
    /// spaces for display.
    pub fn show<I, S>(&self, outcome: Outcome, texts: I) -> MessageToken
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let text = texts
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.current = Some(StatusMessage { outcome, text });
        MessageToken(inner.generation)
    }

    /// Clear the slot, but only if `token` still names the live message.
    /// Returns whether anything was cleared.
    pub fn dismiss(&self, token: MessageToken) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.generation == token.0 && inner.current.is_some() {
            inner.current = None;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<StatusMessage> {
        self.inner.lock().unwrap().current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texts_join_with_spaces() {
        let messenger = StatusMessenger::new();
        messenger.show(Outcome::Error, ["iso out of range", "awbMode invalid"]);
        assert_eq!(
            messenger.current().unwrap().text,
            "iso out of range awbMode invalid"
        );
    }

    #[test]
    fn test_new_message_preempts_old() {
        let messenger = StatusMessenger::new();
        let first = messenger.show(Outcome::Success, ["Preset applied"]);
        let second = messenger.show(Outcome::Error, ["Update failed"]);

        // The preempted message's timer fires against a stale token.
        assert!(!messenger.dismiss(first));
        assert_eq!(messenger.current().unwrap().text, "Update failed");

        assert!(messenger.dismiss(second));
        assert!(messenger.current().is_none());
    }

    #[test]
    fn test_dismiss_is_idempotent() {
        let messenger = StatusMessenger::new();
        let token = messenger.show(Outcome::Success, ["Camera updated."]);
        assert!(messenger.dismiss(token));
        assert!(!messenger.dismiss(token));
    }
}
