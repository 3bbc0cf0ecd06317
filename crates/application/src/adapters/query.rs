//! Query variables: options come from a data source.

use async_trait::async_trait;
use serde_json::Value;
use stencil_domain::{
    DataSourceRef, PersistedVariable, VariableKind, VariableModel, VariableOption,
    VariableRefresh, VariableType, VariableValue, generate_id,
};
use tracing::debug;

use super::{
    OptionRegex, OptionsUpdate, UpdateContext, VariableAdapter, metric_names_to_variable_values,
    url_value_for_options, with_all_option,
};
use crate::error::{ApplicationError, ApplicationResult};
use crate::query_runner::{QueryRunner, RunnerArgs, to_metric_find_values};
use crate::variable_resolver::{FormatId, ReplaceFormat, contains_variable};

/// Adapter for `query` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryVariableAdapter;

/// The query as text: strings as-is, structured queries as JSON.
pub(crate) fn query_text(query: &Value) -> String {
    match query {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VariableAdapter for QueryVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::Query
    }

    fn name(&self) -> &'static str {
        "Query"
    }

    fn description(&self) -> &'static str {
        "Variable values are fetched from a datasource query"
    }

    fn depends_on(&self, variable: &VariableModel, candidate: &VariableModel) -> bool {
        let VariableKind::Query(query) = &variable.kind else {
            return false;
        };
        let text = query_text(&query.query);
        let uid = query
            .datasource
            .as_ref()
            .and_then(|d| d.uid.as_deref())
            .unwrap_or_default();
        contains_variable(&[text.as_str(), uid, query.regex.as_str()], &candidate.name)
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        let VariableKind::Query(query) = &variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "query options",
            });
        };
        let interpolator = ctx.interpolator();

        let reference = query.datasource.as_ref().map(|d| DataSourceRef {
            uid: d
                .uid
                .as_deref()
                .map(|uid| interpolator.replace(Some(uid), None, None)),
            plugin_type: d.plugin_type.clone(),
        });
        let datasource = ctx.datasources.get(reference.as_ref()).await?;
        let runner = QueryRunner::select(datasource.as_ref())?;

        let range = match query.refresh {
            VariableRefresh::OnDashboardLoad | VariableRefresh::OnTimeRangeChanged => {
                ctx.time_range().cloned()
            }
            VariableRefresh::Never => None,
        };
        let args = RunnerArgs {
            variable,
            query,
            interpolated_query: interpolator.replace(Some(&query_text(&query.query)), None, None),
            range,
            search_filter: ctx.search_filter.clone(),
            scoped_vars: stencil_domain::ScopedVars::new(),
            request_id: generate_id(),
        };
        let data = runner.run(datasource.as_ref(), args).await?;
        let values = to_metric_find_values(&data.series)?;

        let regex = if query.regex.is_empty() {
            None
        } else {
            let templated = interpolator.replace(
                Some(&query.regex),
                None,
                Some(&ReplaceFormat::from(FormatId::Regex)),
            );
            Some(OptionRegex::parse(&templated)?)
        };
        let mut options = with_all_option(
            variable,
            metric_names_to_variable_values(regex.as_ref(), query.sort, &values),
        );
        if options.is_empty() {
            options.push(VariableOption::none());
        }
        debug!(variable = %variable.name, count = options.len(), "query options derived");
        Ok(OptionsUpdate::validated(options))
    }

    fn get_save_model(&self, variable: &VariableModel, _save_current_as_default: bool) -> PersistedVariable {
        let mut model = PersistedVariable::from(variable);
        if variable.refresh() != Some(VariableRefresh::Never) {
            model.options = Vec::new();
        }
        model
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
    use serde_json::json;
    use stencil_domain::{ConstantVariable, QueryVariable};

    fn query_variable(query: Value, uid: Option<&str>, regex: &str) -> VariableModel {
        VariableModel::new(
            "q",
            VariableKind::Query(QueryVariable {
                query,
                datasource: uid.map(DataSourceRef::uid),
                regex: regex.to_string(),
                ..QueryVariable::default()
            }),
        )
    }

    fn named(name: &str) -> VariableModel {
        VariableModel::new(name, VariableKind::Constant(ConstantVariable::default()))
    }

    #[test]
    fn test_depends_on_scans_query_datasource_and_regex() {
        let adapter = QueryVariableAdapter;
        assert!(adapter.depends_on(&query_variable(json!("up{job=\"$job\"}"), None, ""), &named("job")));
        assert!(adapter.depends_on(&query_variable(json!("up"), Some("${ds}"), ""), &named("ds")));
        assert!(adapter.depends_on(&query_variable(json!("up"), None, "/[[prefix]].*/"), &named("prefix")));
        assert!(adapter.depends_on(
            &query_variable(json!({"expr": "rate($metric[5m])"}), None, ""),
            &named("metric")
        ));
        assert!(!adapter.depends_on(&query_variable(json!("up"), None, ""), &named("job")));
    }

    #[test]
    fn test_save_model_drops_refreshable_options() {
        let adapter = QueryVariableAdapter;
        let variable = query_variable(json!("up"), None, "")
            .with_options(vec![VariableOption::same("a")]);
        assert!(adapter.get_save_model(&variable, false).options.is_empty());

        let mut never = variable;
        if let VariableKind::Query(q) = &mut never.kind {
            q.refresh = VariableRefresh::Never;
        }
        assert_eq!(adapter.get_save_model(&never, false).options.len(), 1);
    }
}
