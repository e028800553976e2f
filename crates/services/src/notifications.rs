use std::sync::Mutex;

use chrono::{DateTime, Utc};
use gurukul_core::notification::{Notification, NotificationDraft, NotificationId};

use crate::Clock;

/// Fire-and-forget notification channel.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, draft: NotificationDraft) -> NotificationId;
}

/// In-process sink that keeps notifications for display.
///
/// A notification counts as visible for five seconds after it was published, or
/// until it is dismissed. Publishing drops entries whose window has passed.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    clock: Clock,
    entries: Mutex<Vec<Notification>>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Notifications still on screen now.
    #[must_use]
    pub fn visible(&self) -> Vec<Notification> {
        self.visible_at(self.clock.now())
    }

    #[must_use]
    pub fn visible_at(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter(|n| n.is_visible(now))
            .cloned()
            .collect()
    }

    /// Everything published and not dismissed, expired or not.
    #[must_use]
    pub fn history(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    /// Remove a notification early. Returns whether it was present.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|n| n.id != id);
        entries.len() != before
    }

    /// Drop notifications whose display window has passed.
    pub fn prune_expired(&self, now: DateTime<Utc>) {
        self.lock().retain(|n| n.is_visible(now));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        // Poisoning is ignored: every mutation is a single push or retain.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl NotificationSink for NotificationCenter {
    fn notify(&self, draft: NotificationDraft) -> NotificationId {
        let notification = Notification::publish(draft, &self.clock);
        let id = notification.id;
        tracing::debug!(
            kind = ?notification.kind,
            title = %notification.title,
            "notification"
        );
        let mut entries = self.lock();
        entries.retain(|n| n.is_visible(notification.created_at));
        entries.push(notification);
        id
    }
}
