//! Dashboard events adapter that logs through `tracing`.

use parking_lot::Mutex;
use stencil_application::ports::{
    DashboardEvents, Notification, NotificationLevel, VariablesChanged,
};
use tracing::{debug, error, info, warn};

/// Logs dashboard side effects and keeps them for later inspection.
#[derive(Debug, Default)]
pub struct TracingEvents {
    refreshes: Mutex<Vec<VariablesChanged>>,
    notifications: Mutex<Vec<Notification>>,
}

impl TracingEvents {
    /// Creates an empty event sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dashboard refresh requests received so far.
    #[must_use]
    pub fn refreshes(&self) -> Vec<VariablesChanged> {
        self.refreshes.lock().clone()
    }

    /// Notifications received so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }
}

impl DashboardEvents for TracingEvents {
    fn refresh_dashboard(&self, event: &VariablesChanged) {
        info!(
            refresh_all = event.refresh_all,
            variables = ?event.variables,
            "dashboard refresh requested"
        );
        self.refreshes.lock().push(event.clone());
    }

    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                error!(title = %notification.title, "{}", notification.message);
            }
            NotificationLevel::Warning => {
                warn!(title = %notification.title, "{}", notification.message);
            }
            NotificationLevel::Info => {
                info!(title = %notification.title, "{}", notification.message);
            }
        }
        self.notifications.lock().push(notification);
    }

    fn time_range_processed(&self, variable_ids: &[String]) {
        debug!(variables = ?variable_ids, "time range processed");
    }
}
