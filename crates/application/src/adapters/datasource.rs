//! Data source variables: a choice among data sources of one plugin type.

use async_trait::async_trait;
use stencil_domain::{
    DEFAULT_DATASOURCE_NAME, DataSourceInstanceSettings, DataSourceVariable, PersistedVariable,
    VariableKind, VariableModel, VariableOption, VariableType, VariableValue,
};

use super::{
    OptionRegex, OptionsUpdate, UpdateContext, VariableAdapter, url_value_for_options,
    with_all_option,
};
use crate::error::{ApplicationError, ApplicationResult};
use crate::variable_resolver::{FormatId, ReplaceFormat, contains_variable};

/// Text of the option shown when no data source qualifies.
pub const NO_DATASOURCES_TEXT: &str = "No data sources found";

/// Lists the data sources of the variable's plugin type whose name passes `regex`.
///
/// The default data source also contributes a `default` option when `default`
/// passes the regex.
#[must_use]
pub fn create_datasource_options(
    variable: &DataSourceVariable,
    sources: &[DataSourceInstanceSettings],
    regex: Option<&OptionRegex>,
) -> Vec<VariableOption> {
    let passes = |name: &str| regex.is_none_or(|r| r.is_match(name));
    let mut options = Vec::new();
    for source in sources.iter().filter(|s| s.plugin_id == variable.query) {
        if passes(&source.name) {
            options.push(VariableOption::same(source.name.clone()));
        }
        if source.is_default && passes(DEFAULT_DATASOURCE_NAME) {
            options.push(VariableOption::same(DEFAULT_DATASOURCE_NAME));
        }
    }
    if options.is_empty() {
        options.push(VariableOption::new(NO_DATASOURCES_TEXT, ""));
    }
    options
}

/// Adapter for `datasource` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSourceVariableAdapter;

#[async_trait]
impl VariableAdapter for DataSourceVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::DataSource
    }

    fn name(&self) -> &'static str {
        "Data source"
    }

    fn description(&self) -> &'static str {
        "Enables you to dynamically switch the data source for multiple panels"
    }

    fn depends_on(&self, variable: &VariableModel, candidate: &VariableModel) -> bool {
        match &variable.kind {
            VariableKind::DataSource(ds) if !ds.regex.is_empty() => {
                contains_variable(&[ds.regex.as_str()], &candidate.name)
            }
            _ => false,
        }
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        let VariableKind::DataSource(ds) = &variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "datasource options",
            });
        };
        let regex = if ds.regex.is_empty() {
            None
        } else {
            let templated = ctx.interpolator().replace(
                Some(&ds.regex),
                None,
                Some(&ReplaceFormat::from(FormatId::Regex)),
            );
            Some(OptionRegex::parse(&templated)?)
        };
        let sources = ctx.datasources.get_list();
        let options = with_all_option(
            variable,
            create_datasource_options(ds, &sources, regex.as_ref()),
        );
        Ok(OptionsUpdate::validated(options))
    }

    fn get_save_model(&self, variable: &VariableModel, _save_current_as_default: bool) -> PersistedVariable {
        PersistedVariable {
            options: Vec::new(),
            ..PersistedVariable::from(variable)
        }
    }

    fn get_value_for_url(&self, variable: &VariableModel) -> VariableValue {
        url_value_for_options(variable)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source(name: &str, plugin_id: &str, is_default: bool) -> DataSourceInstanceSettings {
        DataSourceInstanceSettings {
            uid: name.to_lowercase(),
            name: name.to_string(),
            plugin_id: plugin_id.to_string(),
            is_default,
        }
    }

    fn sources() -> Vec<DataSourceInstanceSettings> {
        vec![
            source("influx", "influxdb", true),
            source("influx-eu", "influxdb", false),
            source("prom", "prometheus", false),
        ]
    }

    fn variable() -> DataSourceVariable {
        DataSourceVariable {
            query: "influxdb".to_string(),
            ..DataSourceVariable::default()
        }
    }

    #[test]
    fn test_filters_by_plugin_and_adds_default() {
        let options = create_datasource_options(&variable(), &sources(), None);
        assert_eq!(
            options,
            vec![
                VariableOption::same("influx"),
                VariableOption::same("default"),
                VariableOption::same("influx-eu"),
            ]
        );
    }

    #[test]
    fn test_regex_filters_names() {
        let regex = OptionRegex::parse("/-eu$/").unwrap();
        let options = create_datasource_options(&variable(), &sources(), Some(&regex));
        assert_eq!(options, vec![VariableOption::same("influx-eu")]);
    }

    #[test]
    fn test_empty_result_sentinel() {
        let mut loki = variable();
        loki.query = "loki".to_string();
        let options = create_datasource_options(&loki, &sources(), None);
        assert_eq!(options, vec![VariableOption::new(NO_DATASOURCES_TEXT, "")]);
    }

    #[test]
    fn test_depends_on_regex_only() {
        let mut ds = variable();
        ds.regex = "/$env-.*/".to_string();
        let model = VariableModel::new("ds", VariableKind::DataSource(ds));
        let env = VariableModel::new("env", VariableKind::DataSource(variable()));
        assert!(DataSourceVariableAdapter.depends_on(&model, &env));
        let plain = VariableModel::new("ds", VariableKind::DataSource(variable()));
        assert!(!DataSourceVariableAdapter.depends_on(&plain, &env));
    }
}
