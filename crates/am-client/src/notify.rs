//! User-facing notices.
//!
//! The client reports failures and the session reports successes through a
//! [`Notifier`]. [`TracingNotifier`] logs them; [`RecordingNotifier`] keeps
//! them in memory so a front end (or a test) can render them later.

use parking_lot::Mutex;
use tracing::{error, info, warn};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Operation completed.
    Success,
    /// Informational.
    Info,
    /// Something degraded but continued.
    Warning,
    /// Operation failed.
    Error,
}

/// A message meant for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Localized text.
    pub message: String,
}

impl Notice {
    /// Creates a success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    /// Creates an informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    /// Creates a warning notice.
    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    /// Creates an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Receives user-facing notices.
pub trait Notifier: Send + Sync {
    /// Delivers one notice.
    fn notify(&self, notice: Notice);
}

/// Writes notices to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => info!(notice = %notice.message),
            NoticeLevel::Warning => warn!(notice = %notice.message),
            NoticeLevel::Error => error!(notice = %notice.message),
        }
    }
}

/// Collects notices in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Returns the messages of notices at the given level.
    #[must_use]
    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }

    /// Removes and returns all notices.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_filters_by_level() {
        let recorder = RecordingNotifier::new();
        recorder.notify(Notice::success("Вход выполнен успешно"));
        recorder.notify(Notice::error("Нет соединения с сервером"));
        recorder.notify(Notice::warning("stale"));

        assert_eq!(recorder.notices().len(), 3);
        assert_eq!(recorder.messages(NoticeLevel::Error), vec!["Нет соединения с сервером"]);

        let drained = recorder.drain();
        assert_eq!(drained.len(), 3);
        assert!(recorder.notices().is_empty());
    }

    #[test]
    fn test_tracing_notifier_accepts_all_levels() {
        let notifier = TracingNotifier;
        notifier.notify(Notice::info("info"));
        notifier.notify(Notice::error("error"));
    }
}
