//! File-based persistence for dashboards and engine settings.

mod dashboard_repository;
mod settings_repository;

pub use dashboard_repository::FileDashboardRepository;
pub use settings_repository::{SettingsError, SettingsRepository, apply_env_overrides};
