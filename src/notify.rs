use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long a notification stays on screen.
pub const DISPLAY_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub created: Instant,
}

/// Fire-and-forget feedback toasts; nothing reads them back except the renderer.
#[derive(Debug, Default)]
pub struct Notifications {
    items: VecDeque<Notification>,
}

impl Notifications {
    pub fn push(&mut self, message: impl Into<String>, kind: NotificationKind) {
        let message = message.into();
        tracing::debug!(?kind, "notify: {}", message);
        self.items.push_back(Notification {
            message,
            kind,
            created: Instant::now(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(message, NotificationKind::Success);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(message, NotificationKind::Info);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(message, NotificationKind::Warning);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(message, NotificationKind::Error);
    }

    pub fn prune_expired(&mut self, now: Instant) {
        self.items
            .retain(|n| now.duration_since(n.created) < DISPLAY_DURATION);
    }

    pub fn active(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.items.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_notifications_are_dropped() {
        let mut notes = Notifications::default();
        notes.warning("Category already exists");
        notes.success("Email deleted.");
        assert_eq!(notes.active().count(), 2);

        notes.prune_expired(Instant::now());
        assert_eq!(notes.active().count(), 2);

        notes.prune_expired(Instant::now() + DISPLAY_DURATION + Duration::from_millis(1));
        assert_eq!(notes.active().count(), 0);
    }

    #[test]
    fn latest_is_most_recent() {
        let mut notes = Notifications::default();
        notes.info("first");
        notes.error("second");
        let latest = notes.latest().unwrap();
        assert_eq!(latest.message, "second");
        assert_eq!(latest.kind, NotificationKind::Error);
    }
}
