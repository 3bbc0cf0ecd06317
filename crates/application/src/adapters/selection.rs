//! Choosing the current value of option-list variables.

use stencil_domain::{ALL_VARIABLE_TEXT, ALL_VARIABLE_VALUE, VariableModel, VariableOption, VariableValue};

/// Sets `current` and flags the options it selects.
pub fn set_current_variable_value(variable: &mut VariableModel, current: VariableOption) {
    for option in &mut variable.options {
        option.selected = match &current.value {
            VariableValue::Multi(values) => values.iter().any(|v| option.value.as_single() == Some(v)),
            single @ VariableValue::Single(_) => option.value == *single,
        };
    }
    variable.current = VariableOption {
        selected: true,
        ..current
    };
}

/// Picks the current value after the options changed.
///
/// A multi-value selection keeps the subset still offered, or falls back to the
/// first option. A single value is looked up by its text, then by
/// `default_value`, then the first option is taken; without options the result
/// is empty.
#[must_use]
pub fn validate_variable_selection_state(
    variable: &VariableModel,
    default_value: Option<&VariableValue>,
) -> VariableOption {
    if let VariableValue::Multi(values) = &variable.current.value {
        let selected: Vec<&VariableOption> = variable
            .options
            .iter()
            .filter(|o| o.value.as_single().is_some_and(|v| values.iter().any(|c| c == v)))
            .collect();
        if selected.is_empty() {
            return variable.options.first().cloned().unwrap_or_default();
        }
        return VariableOption::new(
            VariableValue::Multi(selected.iter().flat_map(|o| o.text.values()).map(str::to_string).collect()),
            VariableValue::Multi(selected.iter().flat_map(|o| o.value.values()).map(str::to_string).collect()),
        )
        .selected();
    }

    let by_text = variable.options.iter().find(|o| o.text == variable.current.text);
    let by_default = || {
        default_value.and_then(|default| variable.options.iter().find(|o| o.text == *default))
    };
    by_text
        .or_else(by_default)
        .or_else(|| variable.options.first())
        .cloned()
        .unwrap_or_else(|| VariableOption::new("", ""))
}

/// Resolves a URL value to the option to select.
///
/// Options are matched by text or value. For multi-value variables the custom
/// all value maps to the "All" option, and the result is always a list.
#[must_use]
pub fn option_from_url(variable: &VariableModel, url_value: &VariableValue) -> VariableOption {
    let mut option = match url_value {
        VariableValue::Single(_) => variable
            .options
            .iter()
            .find(|o| o.text == *url_value || o.value == *url_value)
            .cloned(),
        VariableValue::Multi(_) => None,
    };

    if option.is_none()
        && variable.is_multi()
        && variable.all_value().is_some_and(|all| url_value.as_single() == Some(all))
    {
        option = Some(VariableOption::new(ALL_VARIABLE_TEXT, ALL_VARIABLE_VALUE));
    }

    let mut option = option.unwrap_or_else(|| {
        let text = match url_value {
            VariableValue::Multi(values) => VariableValue::Multi(
                values
                    .iter()
                    .filter_map(|v| variable.options.iter().find(|o| o.value.as_single() == Some(v)))
                    .flat_map(|o| o.text.values())
                    .map(str::to_string)
                    .collect(),
            ),
            single @ VariableValue::Single(_) => single.clone(),
        };
        VariableOption::new(text, url_value.clone())
    });

    if variable.is_multi() {
        option.value = option.value.into_multi();
        option.text = option.text.into_multi();
    }
    option.selected = false;
    option
}

/// Repairs the `selected` flags of loaded options.
///
/// When nothing matches the current value, the first option becomes current.
pub fn fix_selected_inconsistency(variable: &mut VariableModel) {
    if variable.options.is_empty() {
        return;
    }
    let current = variable.current.value.clone();
    let mut found = false;
    for option in &mut variable.options {
        option.selected = option.value.values().iter().any(|v| current.contains(v));
        found |= option.selected;
    }
    if found {
        return;
    }
    let first = &mut variable.options[0];
    first.selected = true;
    let mut current = first.clone();
    if variable.current.value.is_multi() {
        current.text = current.text.into_multi();
        current.value = current.value.into_multi();
    }
    variable.current = current;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stencil_domain::{CustomVariable, SelectionOptions, VariableKind};

    fn custom(multi: bool, all_value: Option<&str>, values: &[&str]) -> VariableModel {
        VariableModel::new(
            "v",
            VariableKind::Custom(CustomVariable {
                query: values.join(","),
                selection: SelectionOptions {
                    multi,
                    include_all: all_value.is_some(),
                    all_value: all_value.map(str::to_string),
                },
            }),
        )
        .with_options(values.iter().map(|v| VariableOption::same(*v)).collect())
    }

    #[test]
    fn test_validation_keeps_present_single_value() {
        let variable = custom(false, None, &["a", "b"]).with_current(VariableOption::same("b"));
        assert_eq!(
            validate_variable_selection_state(&variable, None),
            VariableOption::same("b")
        );
    }

    #[test]
    fn test_validation_falls_back_to_default_then_first() {
        let variable = custom(false, None, &["a", "b"]).with_current(VariableOption::same("gone"));
        let default = VariableValue::from("b");
        assert_eq!(
            validate_variable_selection_state(&variable, Some(&default)).value,
            VariableValue::from("b")
        );
        assert_eq!(
            validate_variable_selection_state(&variable, None).value,
            VariableValue::from("a")
        );
    }

    #[test]
    fn test_validation_without_options_is_empty() {
        let variable = custom(false, None, &[]).with_current(VariableOption::same("x"));
        assert_eq!(
            validate_variable_selection_state(&variable, None),
            VariableOption::new("", "")
        );
    }

    #[test]
    fn test_validation_keeps_multi_subset() {
        let variable = custom(true, None, &["a", "b", "c"])
            .with_current(VariableOption::new(vec!["c", "gone", "a"], vec!["c", "gone", "a"]));
        let option = validate_variable_selection_state(&variable, None);
        assert_eq!(option.value, VariableValue::from(vec!["a", "c"]));
        assert_eq!(option.text, VariableValue::from(vec!["a", "c"]));
    }

    #[test]
    fn test_set_current_flags_options() {
        let mut variable = custom(true, None, &["a", "b", "c"]);
        set_current_variable_value(&mut variable, VariableOption::new(vec!["a", "c"], vec!["a", "c"]));
        let flags: Vec<bool> = variable.options.iter().map(|o| o.selected).collect();
        assert_eq!(flags, vec![true, false, true]);
    }

    #[test]
    fn test_url_value_matches_text_or_value() {
        let mut variable = custom(false, None, &[]);
        variable.options = vec![VariableOption::new("Production", "prod")];
        assert_eq!(
            option_from_url(&variable, &VariableValue::from("Production")).value,
            VariableValue::from("prod")
        );
        assert_eq!(
            option_from_url(&variable, &VariableValue::from("prod")).text,
            VariableValue::from("Production")
        );
    }

    #[test]
    fn test_url_value_unknown_builds_option() {
        let variable = custom(true, None, &["a", "b"]);
        let option = option_from_url(&variable, &VariableValue::from(vec!["b", "zzz"]));
        assert_eq!(option.value, VariableValue::from(vec!["b", "zzz"]));
        assert_eq!(option.text, VariableValue::from(vec!["b"]));

        let single = option_from_url(&variable, &VariableValue::from("zzz"));
        assert_eq!(single.value, VariableValue::from(vec!["zzz"]));
    }

    #[test]
    fn test_url_custom_all_value_selects_all() {
        let variable = custom(true, Some(".*"), &["a"]);
        let option = option_from_url(&variable, &VariableValue::from(".*"));
        assert_eq!(option.value, VariableValue::from(vec![ALL_VARIABLE_VALUE]));
    }

    #[test]
    fn test_fix_selected_inconsistency() {
        let mut variable = custom(false, None, &["a", "b"]).with_current(VariableOption::same("b"));
        fix_selected_inconsistency(&mut variable);
        assert!(variable.options[1].selected);

        let mut stale = custom(false, None, &["a", "b"]).with_current(VariableOption::same("x"));
        fix_selected_inconsistency(&mut stale);
        assert_eq!(stale.current.value, VariableValue::from("a"));
        assert!(stale.options[0].selected);
    }
}
