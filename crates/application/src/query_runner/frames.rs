//! Conversion between data frames and metric find values.

use serde_json::Value;
use stencil_domain::{DataFrame, Field, MetricFindValue};

use super::RunnerError;
use crate::variable_resolver::formats::scalar_text;

/// Packs metric find values into a frame with `text` and `value` fields.
#[must_use]
pub fn metric_find_values_to_frame(values: &[MetricFindValue]) -> DataFrame {
    DataFrame {
        name: None,
        ref_id: None,
        fields: vec![
            Field::strings("text", values.iter().map(|v| v.text.clone())),
            Field::strings("value", values.iter().map(|v| v.value_or_text().to_string())),
            Field {
                name: "expandable".to_string(),
                values: values.iter().map(|v| Value::Bool(v.expandable)).collect(),
            },
        ],
    }
}

fn is_string_field(field: &Field) -> bool {
    field
        .values
        .iter()
        .find(|v| !v.is_null())
        .is_some_and(Value::is_string)
}

/// Reads metric find values out of query result frames.
///
/// Fields named `text` and `value` are used when present, one standing in for
/// the other; otherwise the first string field provides both.
///
/// # Errors
///
/// Returns [`RunnerError::NoStringField`] if a frame has no string field.
pub fn to_metric_find_values(series: &[DataFrame]) -> Result<Vec<MetricFindValue>, RunnerError> {
    let mut metrics = Vec::new();
    for frame in series {
        let position = |name: &str| {
            frame
                .fields
                .iter()
                .position(|f| f.name.eq_ignore_ascii_case(name) && is_string_field(f))
        };
        let string_index = frame
            .fields
            .iter()
            .position(is_string_field)
            .ok_or(RunnerError::NoStringField)?;
        let (text_index, value_index) = match (position("text"), position("value")) {
            (None, None) => (string_index, string_index),
            (Some(text), None) => (text, text),
            (None, Some(value)) => (value, value),
            (Some(text), Some(value)) => (text, value),
        };
        let expandable_index = frame
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case("expandable"));

        let cell = |index: usize, row: usize| {
            frame.fields[index]
                .values
                .get(row)
                .map(scalar_text)
                .unwrap_or_default()
        };
        for row in 0..frame.len() {
            let expandable = expandable_index
                .and_then(|i| frame.fields[i].values.get(row))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            metrics.push(MetricFindValue {
                text: cell(text_index, row),
                value: Some(cell(value_index, row)),
                expandable,
            });
        }
    }
    Ok(metrics)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_text_and_value_fields() {
        let frame = DataFrame {
            fields: vec![
                Field {
                    name: "time".to_string(),
                    values: vec![json!(1), json!(2)],
                },
                Field::strings("Value", ["v1", "v2"]),
                Field::strings("text", ["T1", "T2"]),
            ],
            ..DataFrame::default()
        };
        let values = to_metric_find_values(&[frame]).unwrap();
        assert_eq!(
            values,
            vec![
                MetricFindValue::with_value("T1", "v1"),
                MetricFindValue::with_value("T2", "v2")
            ]
        );
    }

    #[test]
    fn test_first_string_field_fallback() {
        let frame = DataFrame {
            fields: vec![
                Field {
                    name: "count".to_string(),
                    values: vec![json!(3)],
                },
                Field::strings("host", ["web-1"]),
            ],
            ..DataFrame::default()
        };
        let values = to_metric_find_values(&[frame]).unwrap();
        assert_eq!(values, vec![MetricFindValue::with_value("web-1", "web-1")]);
    }

    #[test]
    fn test_frame_without_strings_fails() {
        let frame = DataFrame {
            fields: vec![Field {
                name: "count".to_string(),
                values: vec![json!(3)],
            }],
            ..DataFrame::default()
        };
        assert_eq!(
            to_metric_find_values(&[frame]),
            Err(RunnerError::NoStringField)
        );
    }

    #[test]
    fn test_values_survive_frame_packing() {
        let values = vec![
            MetricFindValue::with_value("A", "a"),
            MetricFindValue::text("b"),
        ];
        let back = to_metric_find_values(&[metric_find_values_to_frame(&values)]).unwrap();
        assert_eq!(back[0], MetricFindValue::with_value("A", "a"));
        assert_eq!(back[1], MetricFindValue::with_value("b", "b"));
    }
}
