//! Assignment notifications.
//!
//! The create flow notifies every responsible employee other than the
//! creator. Delivery is a collaborator concern: the embedding chat client
//! decides how a notification actually reaches the user, so the core only
//! exposes a fire-and-forget [`Notifier`] trait plus two stock
//! implementations — one that logs, one that queues for the host to drain.

use parking_lot::Mutex;

/// A notification about a newly assigned task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Chat identity of the recipient.
    pub user_id: String,
    /// Rendered message text.
    pub message: String,
    /// Whether the task landed at the top of its group.
    pub urgent: bool,
}

/// Fire-and-forget notification sink.
///
/// Implementations must not block and must not fail the calling mutation:
/// a lost notification is acceptable, a broken create flow is not.
pub trait Notifier {
    /// Notifies a user that a task was assigned to them.
    fn task_assigned(&self, user_id: &str, task_name: &str, urgent: bool);
}

/// Renders the assignment message for a task.
#[must_use]
pub fn assignment_message(task_name: &str, urgent: bool) -> String {
    if urgent {
        format!("You have been assigned a new top-priority task: \u{201c}{task_name}\u{201d}")
    } else {
        format!("You have been assigned a new task: \u{201c}{task_name}\u{201d}")
    }
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn task_assigned(&self, user_id: &str, task_name: &str, urgent: bool) {
        tracing::info!(
            user_id,
            urgent,
            message = %assignment_message(task_name, urgent),
            "task assignment notification"
        );
    }
}

/// Notifier that queues notifications for the embedding host to drain and
/// deliver through its own messaging channel.
#[derive(Debug, Default)]
pub struct QueueNotifier {
    queue: Mutex<Vec<Notification>>,
}

impl QueueNotifier {
    /// Creates an empty queue notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all queued notifications, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.queue.lock())
    }
}

impl Notifier for QueueNotifier {
    fn task_assigned(&self, user_id: &str, task_name: &str, urgent: bool) {
        self.queue.lock().push(Notification {
            user_id: user_id.to_string(),
            message: assignment_message(task_name, urgent),
            urgent,
        });
    }
}
