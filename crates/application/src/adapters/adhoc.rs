//! Ad-hoc filter variables.

use async_trait::async_trait;
use stencil_domain::{AdHocFilter, VariableKind, VariableModel, VariableType, VariableValue};
use tracing::warn;

use super::{OptionsUpdate, SelectionPolicy, UpdateContext, UrlValueChange, VariableAdapter, VariableEvent};
use crate::error::{ApplicationError, ApplicationResult};

/// Adapter for `adhoc` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdHocVariableAdapter;

#[async_trait]
impl VariableAdapter for AdHocVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::AdHoc
    }

    fn name(&self) -> &'static str {
        "Ad hoc filters"
    }

    fn description(&self) -> &'static str {
        "Add key/value filters on the fly"
    }

    fn reduce(&self, variable: &mut VariableModel, event: VariableEvent) -> ApplicationResult<()> {
        let VariableKind::AdHoc(adhoc) = &mut variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "filters",
            });
        };
        match event {
            VariableEvent::AddFilter(filter) => adhoc.filters.push(filter),
            VariableEvent::RemoveFilter(index) => {
                if index < adhoc.filters.len() {
                    adhoc.filters.remove(index);
                }
            }
            VariableEvent::ChangeFilter { index, filter } => {
                if let Some(slot) = adhoc.filters.get_mut(index) {
                    *slot = filter;
                }
            }
            VariableEvent::SetFilters(filters) => adhoc.filters = filters,
        }
        Ok(())
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        _ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        Ok(OptionsUpdate {
            options: variable.options.clone(),
            selection: SelectionPolicy::Keep,
            auto_interval: None,
        })
    }

    fn value_from_url(&self, variable: &VariableModel, url_value: &VariableValue) -> UrlValueChange {
        let filters = url_value
            .values()
            .into_iter()
            .filter(|raw| !raw.is_empty())
            .filter_map(|raw| {
                let filter = AdHocFilter::from_url_value(raw);
                if filter.is_none() {
                    warn!(variable = %variable.name, value = raw, "skipping malformed ad-hoc filter");
                }
                filter
            })
            .collect();
        UrlValueChange::Filters(filters)
    }

    fn get_value_for_url(&self, variable: &VariableModel) -> VariableValue {
        match &variable.kind {
            VariableKind::AdHoc(adhoc) => VariableValue::Multi(
                adhoc.filters.iter().map(AdHocFilter::to_url_value).collect(),
            ),
            _ => VariableValue::Multi(Vec::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_domain::AdHocVariable;

    fn filters_of(variable: &VariableModel) -> Vec<AdHocFilter> {
        match &variable.kind {
            VariableKind::AdHoc(adhoc) => adhoc.filters.clone(),
            _ => panic!("expected adhoc"),
        }
    }

    #[test]
    fn test_filter_events() {
        let mut variable = VariableModel::new("f", VariableKind::AdHoc(AdHocVariable::default()));
        let adapter = AdHocVariableAdapter;
        adapter
            .reduce(&mut variable, VariableEvent::AddFilter(AdHocFilter::new("a", "=", "1")))
            .unwrap();
        adapter
            .reduce(&mut variable, VariableEvent::AddFilter(AdHocFilter::new("b", "=", "2")))
            .unwrap();
        adapter
            .reduce(
                &mut variable,
                VariableEvent::ChangeFilter {
                    index: 0,
                    filter: AdHocFilter::new("a", "!=", "1"),
                },
            )
            .unwrap();
        adapter.reduce(&mut variable, VariableEvent::RemoveFilter(1)).unwrap();
        adapter.reduce(&mut variable, VariableEvent::RemoveFilter(9)).unwrap();
        assert_eq!(filters_of(&variable), vec![AdHocFilter::new("a", "!=", "1")]);
        assert_eq!(
            adapter.get_value_for_url(&variable),
            VariableValue::from(vec!["a|!=|1"])
        );
    }

    #[test]
    fn test_url_value_skips_malformed_entries() {
        let variable = VariableModel::new("f", VariableKind::AdHoc(AdHocVariable::default()));
        let change = AdHocVariableAdapter.value_from_url(
            &variable,
            &VariableValue::from(vec!["host|=|web", "broken", "path|=~|/a|b"]),
        );
        assert_eq!(
            change,
            UrlValueChange::Filters(vec![
                AdHocFilter::new("host", "=", "web"),
                AdHocFilter::new("path", "=~", "/a|b"),
            ])
        );
    }
}
