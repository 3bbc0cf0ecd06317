//! Load dashboard use case

use stencil_domain::{LoadingState, OrgInfo, RawTimeRange, UserInfo};

use crate::error::ApplicationError;
use crate::ports::{DashboardError, DashboardRepository};
use crate::session::{InitOptions, TemplatingSession};

/// Errors that can occur when loading a dashboard.
#[derive(Debug, thiserror::Error)]
pub enum LoadDashboardError {
    /// Dashboard not found.
    #[error("Dashboard not found: {0}")]
    NotFound(String),

    /// Failed to read the dashboard.
    #[error("Failed to read dashboard: {0}")]
    Storage(String),

    /// Variables could not be initialized.
    #[error("Failed to initialize variables: {0}")]
    Init(#[from] ApplicationError),
}

impl From<DashboardError> for LoadDashboardError {
    fn from(error: DashboardError) -> Self {
        match error {
            DashboardError::NotFound(uid) => Self::NotFound(uid),
            DashboardError::Io(e) => Self::Storage(e.to_string()),
            DashboardError::Serialization(e) => Self::Storage(e),
        }
    }
}

/// Input for loading a dashboard.
#[derive(Debug, Clone, Default)]
pub struct LoadDashboardInput {
    /// Dashboard uid.
    pub uid: String,
    /// Overrides the dashboard's time range.
    pub time_range: Option<RawTimeRange>,
    /// The signed-in user.
    pub user: Option<UserInfo>,
    /// The current organization.
    pub org: Option<OrgInfo>,
}

/// Summary of a loaded dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadDashboardOutput {
    /// Dashboard uid.
    pub uid: String,
    /// Number of variables loaded.
    pub variables: usize,
    /// Names of variables whose options could not be refreshed.
    pub failed: Vec<String>,
}

/// Reads a dashboard and loads its variables into a session.
pub struct LoadDashboard<R> {
    repository: R,
}

impl<R: DashboardRepository> LoadDashboard<R> {
    /// Creates a new `LoadDashboard` use case.
    pub const fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Executes the use case.
    ///
    /// # Errors
    /// Returns an error if the dashboard cannot be read or its time range is invalid.
    pub async fn execute(
        &self,
        session: &TemplatingSession,
        input: LoadDashboardInput,
    ) -> Result<LoadDashboardOutput, LoadDashboardError> {
        let dashboard = self.repository.load(&input.uid).await?;
        session
            .init(InitOptions {
                dashboard,
                time_range: input.time_range,
                user: input.user,
                org: input.org,
            })
            .await?;

        let variables = session.variables();
        Ok(LoadDashboardOutput {
            uid: input.uid,
            failed: variables
                .iter()
                .filter(|v| v.state == LoadingState::Error)
                .map(|v| v.name.clone())
                .collect(),
            variables: variables.len(),
        })
    }
}
