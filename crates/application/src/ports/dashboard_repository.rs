//! Dashboard repository port
//!
//! Defines the interface for dashboard persistence.

use async_trait::async_trait;
use stencil_domain::Dashboard;

/// Errors that can occur during dashboard operations.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Dashboard not found.
    #[error("Dashboard not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Repository trait for dashboard persistence.
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Loads a dashboard by uid.
    ///
    /// # Errors
    /// Returns `DashboardError::NotFound` if the dashboard doesn't exist.
    async fn load(&self, uid: &str) -> Result<Dashboard, DashboardError>;

    /// Saves a dashboard under its uid.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    async fn save(&self, dashboard: &Dashboard) -> Result<(), DashboardError>;

    /// Lists the uids of stored dashboards.
    async fn list(&self) -> Result<Vec<String>, DashboardError>;
}
