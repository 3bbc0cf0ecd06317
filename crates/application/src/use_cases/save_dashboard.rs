//! Save dashboard use case

use stencil_domain::Dashboard;

use crate::ports::{DashboardError, DashboardRepository};
use crate::session::TemplatingSession;

/// Errors that can occur when saving a dashboard.
#[derive(Debug, thiserror::Error)]
pub enum SaveDashboardError {
    /// The session has no dashboard loaded.
    #[error("No dashboard loaded")]
    NothingLoaded,

    /// The repository failed.
    #[error(transparent)]
    Repository(#[from] DashboardError),
}

/// Writes the session's variables back into its dashboard.
pub struct SaveDashboard<R> {
    repository: R,
}

impl<R: DashboardRepository> SaveDashboard<R> {
    /// Creates a new `SaveDashboard` use case.
    pub const fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Executes the use case and returns the saved document.
    ///
    /// With `save_current_as_default` the current selections become the
    /// dashboard defaults.
    ///
    /// # Errors
    /// Returns an error if nothing is loaded or the repository fails.
    pub async fn execute(
        &self,
        session: &TemplatingSession,
        save_current_as_default: bool,
    ) -> Result<Dashboard, SaveDashboardError> {
        let mut dashboard = session
            .store()
            .read(|state| state.dashboard.clone())
            .ok_or(SaveDashboardError::NothingLoaded)?;
        dashboard.templating.list = session.get_save_models(save_current_as_default);
        self.repository.save(&dashboard).await?;
        Ok(dashboard)
    }
}
