//! Event port towards the rest of the dashboard.

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Something failed.
    Error,
    /// Something degraded.
    Warning,
    /// Informational.
    Info,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Short title.
    pub title: String,
    /// Detail text.
    pub message: String,
}

impl Notification {
    /// Creates an error notification.
    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Which panels must re-run after a variable change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariablesChanged {
    /// Every panel must refresh.
    pub refresh_all: bool,
    /// Names of the variables whose value changed.
    pub variables: Vec<String>,
}

/// Sink for dashboard-level side effects.
pub trait DashboardEvents: Send + Sync {
    /// Asks the dashboard to re-run its queries.
    fn refresh_dashboard(&self, event: &VariablesChanged);

    /// Shows a notification.
    fn notify(&self, notification: Notification);

    /// Signals that a time-range refresh of variables finished.
    fn time_range_processed(&self, _variable_ids: &[String]) {}
}
