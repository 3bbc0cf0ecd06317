//! Ordering of derived options.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use super::kind::VariableSort;
use super::value::VariableOption;

#[allow(clippy::expect_used)]
static FIRST_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// Extracts the first integer in `text`, or -1 when there is none.
fn first_number(text: &str) -> i64 {
    FIRST_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(-1)
}

/// Sorts options by their text according to `sort`.
///
/// Sorting is stable; `Disabled` leaves the order untouched.
pub fn sort_variable_values(options: &mut [VariableOption], sort: VariableSort) {
    let text = |o: &VariableOption| o.text.join(",");
    let compare: fn(&str, &str) -> Ordering = match sort {
        VariableSort::Disabled => return,
        VariableSort::AlphabeticalAsc => |a, b| a.cmp(b),
        VariableSort::AlphabeticalDesc => |a, b| b.cmp(a),
        VariableSort::NumericalAsc => |a, b| first_number(a).cmp(&first_number(b)),
        VariableSort::NumericalDesc => |a, b| first_number(b).cmp(&first_number(a)),
        VariableSort::AlphabeticalCaseInsensitiveAsc => {
            |a, b| a.to_lowercase().cmp(&b.to_lowercase())
        }
        VariableSort::AlphabeticalCaseInsensitiveDesc => {
            |a, b| b.to_lowercase().cmp(&a.to_lowercase())
        }
    };
    options.sort_by(|a, b| compare(&text(a), &text(b)));
}
