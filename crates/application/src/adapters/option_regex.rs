//! Regex filtering of query results.
//!
//! A pattern is either `/body/flags` or a bare pattern that must match the whole
//! value. Supported flags are `g` (every match), `i`, `m` and `s`.

use regex::{Regex, RegexBuilder};
use stencil_domain::{
    DomainError, MetricFindValue, VariableOption, VariableSort, sort_variable_values,
};

/// A compiled option filter.
#[derive(Debug, Clone)]
pub struct OptionRegex {
    regex: Regex,
    global: bool,
}

struct Match {
    group1: Option<String>,
    has_groups: bool,
    text: Option<String>,
    value: Option<String>,
}

impl OptionRegex {
    /// Compiles `/body/flags` or a bare pattern anchored with `^…$`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidRegex`] if the pattern is malformed.
    pub fn parse(pattern: &str) -> Result<Self, DomainError> {
        let invalid = |reason: String| DomainError::InvalidRegex(format!("{pattern}: {reason}"));
        let Some(rest) = pattern.strip_prefix('/') else {
            let regex = Regex::new(&format!("^{pattern}$")).map_err(|e| invalid(e.to_string()))?;
            return Ok(Self {
                regex,
                global: false,
            });
        };
        let Some(end) = rest.rfind('/') else {
            return Err(invalid("missing closing '/'".to_string()));
        };
        let (body, flags) = (&rest[..end], &rest[end + 1..]);
        let mut builder = RegexBuilder::new(body);
        let mut global = false;
        for flag in flags.chars() {
            match flag {
                'g' => global = true,
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'y' | 'u' => {}
                other => return Err(invalid(format!("unsupported flag '{other}'"))),
            }
        }
        let regex = builder.build().map_err(|e| invalid(e.to_string()))?;
        Ok(Self { regex, global })
    }

    /// Returns true if the pattern matches anywhere in `input`.
    #[must_use]
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }

    fn matches(&self, input: &str) -> Vec<Match> {
        let has_groups = self.regex.captures_len() > 1;
        let to_match = |caps: regex::Captures<'_>| Match {
            group1: caps.get(1).map(|m| m.as_str().to_string()),
            has_groups,
            text: caps.name("text").map(|m| m.as_str().to_string()),
            value: caps.name("value").map(|m| m.as_str().to_string()),
        };
        if self.global {
            self.regex.captures_iter(input).map(to_match).collect()
        } else {
            self.regex.captures(input).map(to_match).into_iter().collect()
        }
    }
}

/// Turns query results into options.
///
/// With a regex, values that do not match are dropped. Named `text`/`value`
/// groups take precedence; otherwise capture group 1 is used, once per match
/// when a global pattern matched several times. Options are then de-duplicated
/// by value and sorted.
#[must_use]
pub fn metric_names_to_variable_values(
    regex: Option<&OptionRegex>,
    sort: VariableSort,
    metric_names: &[MetricFindValue],
) -> Vec<VariableOption> {
    let mut options: Vec<VariableOption> = Vec::new();
    for item in metric_names {
        let mut text = item.text.clone();
        let mut value = item.value_or_text().to_string();

        if let Some(regex) = regex {
            let matches = regex.matches(&value);
            if matches.is_empty() {
                continue;
            }
            let value_group = matches.iter().find_map(|m| m.value.clone());
            let text_group = matches.iter().find_map(|m| m.text.clone());
            let first_match = matches.iter().find(|m| m.has_groups);

            if value_group.is_some() || text_group.is_some() {
                value = value_group.clone().or_else(|| text_group.clone()).unwrap_or_default();
                text = text_group.or(value_group).unwrap_or_default();
            } else if let Some(first) = first_match {
                if matches.len() > 1 {
                    for m in &matches {
                        options.push(VariableOption::same(m.group1.clone().unwrap_or_default()));
                    }
                    continue;
                }
                let captured = first.group1.clone().unwrap_or_default();
                text.clone_from(&captured);
                value = captured;
            }
        }
        options.push(VariableOption::new(text, value));
    }

    let mut seen = std::collections::HashSet::new();
    options.retain(|o| seen.insert(o.value.clone()));
    sort_variable_values(&mut options, sort);
    options
}
