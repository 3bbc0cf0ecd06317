//! File-based dashboard repository.
//!
//! Dashboards are stored one per file, named after their uid:
//! ```text
//! dashboards/
//!   hosts.json
//!   k8s-overview.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stencil_application::ports::{DashboardError, DashboardRepository};
use stencil_domain::Dashboard;
use tokio::fs;
use tracing::debug;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Dashboard repository over a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileDashboardRepository {
    dir: PathBuf,
}

impl FileDashboardRepository {
    /// Creates a repository rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory dashboards are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn dashboard_path(&self, uid: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(uid)))
    }
}

/// Maps a uid to a file stem, replacing anything outside `[A-Za-z0-9_-]`.
fn file_stem(uid: &str) -> String {
    uid.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl DashboardRepository for FileDashboardRepository {
    async fn load(&self, uid: &str) -> Result<Dashboard, DashboardError> {
        let path = self.dashboard_path(uid);
        if !fs::try_exists(&path).await? {
            return Err(DashboardError::NotFound(uid.to_string()));
        }

        debug!(path = %path.display(), "loading dashboard");
        let content = fs::read(&path).await?;
        from_json_bytes(&content).map_err(|e| DashboardError::Serialization(e.to_string()))
    }

    async fn save(&self, dashboard: &Dashboard) -> Result<(), DashboardError> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.dashboard_path(&dashboard.uid);
        let content = to_json_stable_bytes(dashboard)
            .map_err(|e| DashboardError::Serialization(e.to_string()))?;
        fs::write(&path, content).await?;
        debug!(path = %path.display(), "saved dashboard");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, DashboardError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut uids = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                uids.push(stem.to_string());
            }
        }
        uids.sort();
        Ok(uids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_domain::{CustomVariable, PersistedVariable, VariableKind, VariableModel};
    use tempfile::TempDir;

    fn dashboard(uid: &str) -> Dashboard {
        let mut dashboard = Dashboard::new(uid, "Hosts");
        let custom = CustomVariable {
            query: "prod,dev".to_string(),
            ..CustomVariable::default()
        };
        let env = VariableModel::new("env", VariableKind::Custom(custom));
        dashboard.templating.list.push(PersistedVariable::from(&env));
        dashboard
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let repo = FileDashboardRepository::new(temp.path().join("dashboards"));

        repo.save(&dashboard("hosts")).await.unwrap();
        let loaded = repo.load("hosts").await.unwrap();

        assert_eq!(loaded, dashboard("hosts"));
        assert!(temp.path().join("dashboards/hosts.json").exists());
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let repo = FileDashboardRepository::new(temp.path());

        let err = repo.load("nope").await.unwrap_err();
        assert!(matches!(err, DashboardError::NotFound(uid) if uid == "nope"));
    }

    #[tokio::test]
    async fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.json"), "{not json").unwrap();
        let repo = FileDashboardRepository::new(temp.path());

        let err = repo.load("bad").await.unwrap_err();
        assert!(matches!(err, DashboardError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_list_sorted_json_only() {
        let temp = TempDir::new().unwrap();
        let repo = FileDashboardRepository::new(temp.path());
        repo.save(&dashboard("b")).await.unwrap();
        repo.save(&dashboard("a")).await.unwrap();
        std::fs::write(temp.path().join("notes.txt"), "x").unwrap();

        assert_eq!(repo.list().await.unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_uid_cannot_escape_directory() {
        let repo = FileDashboardRepository::new("/data");
        assert_eq!(
            repo.dashboard_path("../etc/passwd"),
            PathBuf::from("/data/___etc_passwd.json")
        );
    }
}
