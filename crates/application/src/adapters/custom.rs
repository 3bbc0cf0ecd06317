//! Custom variables: options come from a comma-separated list.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use stencil_domain::{VariableKind, VariableModel, VariableOption, VariableType, VariableValue};

use super::{OptionsUpdate, UpdateContext, VariableAdapter, url_value_for_options, with_all_option};
use crate::error::{ApplicationError, ApplicationResult};

#[allow(clippy::expect_used)]
static ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:\\,|[^,])+").expect("valid regex"));

#[allow(clippy::expect_used)]
static TEXT_VALUE_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\s:\s(.+)$").expect("valid regex"));

/// Splits a custom query into options.
///
/// Items are separated by unescaped commas; `\,` stands for a literal comma.
/// An item of the form `text : value` yields distinct text and value.
#[must_use]
pub fn create_custom_options(query: &str) -> Vec<VariableOption> {
    ITEM.find_iter(query)
        .map(|item| {
            let item = item.as_str().replace(r"\,", ",");
            match TEXT_VALUE_PAIR.captures(&item) {
                Some(caps) => VariableOption::new(caps[1].trim(), caps[2].trim()),
                None => VariableOption::same(item.trim()),
            }
        })
        .collect()
}

/// Adapter for `custom` variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomVariableAdapter;

#[async_trait]
impl VariableAdapter for CustomVariableAdapter {
    fn variable_type(&self) -> VariableType {
        VariableType::Custom
    }

    fn name(&self) -> &'static str {
        "Custom"
    }

    fn description(&self) -> &'static str {
        "Define variable values manually"
    }

    async fn update_options(
        &self,
        variable: &VariableModel,
        _ctx: &UpdateContext,
    ) -> ApplicationResult<OptionsUpdate> {
        let VariableKind::Custom(custom) = &variable.kind else {
            return Err(ApplicationError::Unsupported {
                kind: variable.variable_type().as_str(),
                operation: "custom options",
            });
        };
        let options = with_all_option(variable, create_custom_options(&custom.query));
        Ok(OptionsUpdate::validated(options))
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

    #[test]
    fn test_plain_list() {
        assert_eq!(
            create_custom_options("a, b ,c"),
            vec![
                VariableOption::same("a"),
                VariableOption::same("b"),
                VariableOption::same("c")
            ]
        );
    }

    #[test]
    fn test_escaped_commas_and_pairs() {
        assert_eq!(
            create_custom_options(r"Production : prod,one\, two"),
            vec![
                VariableOption::new("Production", "prod"),
                VariableOption::same("one, two")
            ]
        );
    }

    #[test]
    fn test_pair_needs_spaces_around_colon() {
        assert_eq!(
            create_custom_options("http://x:80"),
            vec![VariableOption::same("http://x:80")]
        );
    }
}
