//! In-memory data source registry.

use std::sync::Arc;

use async_trait::async_trait;
use stencil_application::ports::{DataSource, DataSourceError, DataSourceRegistry};
use stencil_domain::{DEFAULT_DATASOURCE_NAME, DataSourceInstanceSettings, DataSourceRef};

/// Registry over a fixed list of data sources.
///
/// The default data source is the one flagged `isDefault`, else the first.
#[derive(Clone, Default)]
pub struct InMemoryDataSourceRegistry {
    sources: Vec<Arc<dyn DataSource>>,
}

impl std::fmt::Debug for InMemoryDataSourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataSourceRegistry")
            .field("sources", &self.get_list())
            .finish()
    }
}

impl InMemoryDataSourceRegistry {
    /// Creates a registry over `sources`.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn DataSource>>) -> Self {
        Self { sources }
    }

    /// Adds a data source.
    pub fn register(&mut self, source: Arc<dyn DataSource>) {
        self.sources.push(source);
    }

    fn default_source(&self) -> Option<&Arc<dyn DataSource>> {
        self.sources
            .iter()
            .find(|s| s.settings().is_default)
            .or_else(|| self.sources.first())
    }

    fn find(&self, name_or_uid: Option<&str>) -> Option<&Arc<dyn DataSource>> {
        match name_or_uid {
            None | Some(DEFAULT_DATASOURCE_NAME) => self.default_source(),
            Some(key) => self.sources.iter().find(|s| {
                let settings = s.settings();
                settings.uid == key || settings.name == key
            }),
        }
    }
}

#[async_trait]
impl DataSourceRegistry for InMemoryDataSourceRegistry {
    fn get_instance_settings(
        &self,
        name_or_uid: Option<&str>,
    ) -> Option<DataSourceInstanceSettings> {
        self.find(name_or_uid).map(|s| s.settings().clone())
    }

    fn get_list(&self) -> Vec<DataSourceInstanceSettings> {
        self.sources.iter().map(|s| s.settings().clone()).collect()
    }

    async fn get(
        &self,
        reference: Option<&DataSourceRef>,
    ) -> Result<Arc<dyn DataSource>, DataSourceError> {
        let source = match reference {
            Some(DataSourceRef { uid: Some(uid), .. }) => self.find(Some(uid)),
            Some(DataSourceRef {
                uid: None,
                plugin_type: Some(plugin),
            }) => self
                .sources
                .iter()
                .find(|s| s.settings().plugin_id == *plugin),
            _ => self.find(None),
        };
        source.cloned().ok_or_else(|| {
            let key = reference
                .and_then(|r| r.uid.clone().or_else(|| r.plugin_type.clone()))
                .unwrap_or_else(|| DEFAULT_DATASOURCE_NAME.to_string());
            DataSourceError::NotFound(key)
        })
    }
}
