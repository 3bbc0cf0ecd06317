//! Interval variables: a list of time spans, optionally with `auto`.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use stencil_domain::{
    AUTO_INTERVAL_PREFIX, IntervalVariable, PersistedVariable, VariableKind, VariableModel,
    VariableOption, VariableRefresh, VariableType, calculate_interval,
};
use tracing::debug;

use super::{OptionsUpdate, UpdateContext, VariableAdapter};
use crate::error::{ApplicationError, ApplicationResult};

#[allow(clippy::expect_used)]
static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|\w+"#).expect("valid regex"));

/// Builds the options of an interval variable.
///
/// Tokens are words or quoted strings. With `auto`, an `auto` option whose value
/// is the `$__auto_interval_<name>` token comes first.
#[must_use]
pub fn create_interval_options(name: &str, interval: &IntervalVariable) -> Vec<VariableOption> {
    let mut options: Vec<VariableOption> = TOKEN
        .captures_iter(&interval.query)
        .map(|caps| {
            let token = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(0))
                .map_or("", |m| m.as_str());
            VariableOption::same(token.trim())
        })
        .collect();
    if interval.auto {
        options.insert(
            0,
            VariableOption::new("auto", format!("{AUTO_INTERVAL_PREFIX}{name}")),
        );
    }
    options
}

/// Adapter for `interval` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalVariableAdapter;

#[async_trait]
impl VariableAdapter for IntervalVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::Interval
    }

    fn name(&self) -> &'static str {
        "Interval"
    }

    fn description(&self) -> &'static str {
        "Define a timespan interval (ex 1m, 1h, 1d)"
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        let VariableKind::Interval(interval) = &variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "interval options",
            });
        };
        let mut update = OptionsUpdate::validated(create_interval_options(&variable.name, interval));
        if interval.auto
            && let Some(range) = ctx.time_range()
        {
            let auto = calculate_interval(range, interval.auto_count, Some(&interval.auto_min))?;
            debug!(variable = %variable.name, interval = %auto.interval, "auto interval computed");
            update.auto_interval = Some(auto.interval);
        }
        Ok(update)
    }

    fn get_save_model(&self, variable: &VariableModel, _save_current_as_default: bool) -> PersistedVariable {
        let mut model = PersistedVariable::from(variable);
        if variable.refresh() != Some(VariableRefresh::Never) {
            model.options = Vec::new();
        }
        model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_domain::VariableValue;

    #[test]
    fn test_tokens_and_auto_option() {
        let interval = IntervalVariable {
            query: r#"1m, "10 m",'1h' ,1d"#.to_string(),
            auto: true,
            ..IntervalVariable::default()
        };
        let options = create_interval_options("step", &interval);
        let values: Vec<VariableValue> = options.iter().map(|o| o.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                VariableValue::from("$__auto_interval_step"),
                VariableValue::from("1m"),
                VariableValue::from("10 m"),
                VariableValue::from("1h"),
                VariableValue::from("1d"),
            ]
        );
        assert_eq!(options[0].text, VariableValue::from("auto"));
    }
}
