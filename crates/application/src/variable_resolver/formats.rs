//! Format registry
//!
//! Named formatters that turn a resolved value into text. A format is written as
//! `name` or `name:arg1:arg2`, e.g. `date:seconds`.

use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Registered formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatId {
    /// Default. Scalars pass through; lists become an escaped regex alternation.
    Glob,
    /// Regex-escaped, lists as `(a|b)`.
    Regex,
    /// The display text; lists joined with ` + `.
    Text,
    /// `var-name=value` pairs joined with `&`.
    QueryParam,
    /// Lucene-escaped, lists as `("a" OR "b")`.
    Lucene,
    /// Unmodified; lists joined with `,`.
    Raw,
    /// Lists joined with `|`.
    Pipe,
    /// `a,name=b,name=c`.
    Distributed,
    /// Lists joined with `,`.
    Csv,
    /// HTML-escaped; lists joined with `, `.
    Html,
    /// JSON encoded.
    Json,
    /// Strict URI component encoding; lists as `{a,b}` before encoding.
    PercentEncode,
    /// Single-quoted, comma separated.
    SingleQuote,
    /// Double-quoted, comma separated.
    DoubleQuote,
    /// SQL string literals, comma separated.
    SqlString,
    /// Epoch milliseconds rendered as `ms`, `seconds`, `iso` or a strftime pattern.
    Date,
}

impl FormatId {
    /// Every registered format.
    pub const ALL: [Self; 16] = [
        Self::Glob,
        Self::Regex,
        Self::Text,
        Self::QueryParam,
        Self::Lucene,
        Self::Raw,
        Self::Pipe,
        Self::Distributed,
        Self::Csv,
        Self::Html,
        Self::Json,
        Self::PercentEncode,
        Self::SingleQuote,
        Self::DoubleQuote,
        Self::SqlString,
        Self::Date,
    ];

    /// Returns the registry name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Glob => "glob",
            Self::Regex => "regex",
            Self::Text => "text",
            Self::QueryParam => "queryparam",
            Self::Lucene => "lucene",
            Self::Raw => "raw",
            Self::Pipe => "pipe",
            Self::Distributed => "distributed",
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Json => "json",
            Self::PercentEncode => "percentencode",
            Self::SingleQuote => "singlequote",
            Self::DoubleQuote => "doublequote",
            Self::SqlString => "sqlstring",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unregistered format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for FormatId {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// A format name split from its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec<'a> {
    /// Format name.
    pub name: &'a str,
    /// Arguments after the name.
    pub args: Vec<&'a str>,
}

impl<'a> FormatSpec<'a> {
    /// Splits `name:arg1:arg2`.
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        let mut parts = raw.split(':');
        let name = parts.next().unwrap_or_default();
        Self {
            name,
            args: parts.collect(),
        }
    }
}

/// Inputs of one formatter call.
#[derive(Debug, Clone, Copy)]
pub struct FormatInput<'a> {
    /// Resolved value.
    pub value: &'a Value,
    /// Display text of the value.
    pub text: &'a Value,
    /// Format arguments.
    pub args: &'a [&'a str],
    /// Variable name, used by `queryparam` and `distributed`.
    pub name: &'a str,
    /// URL parameter prefix, used by `queryparam`.
    pub url_param_prefix: &'a str,
    /// `utc` or `browser`, used by `date`.
    pub timezone: &'a str,
}

enum Shape {
    Scalar(String),
    List(Vec<String>),
}

/// Renders a scalar JSON value as plain text.
#[must_use]
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn shape(value: &Value) -> Shape {
    match value {
        Value::Array(items) => Shape::List(items.iter().map(scalar_text).collect()),
        other => Shape::Scalar(scalar_text(other)),
    }
}

/// Escapes regex metacharacters.
#[must_use]
pub fn regex_escape(value: &str) -> String {
    escape_chars(value, |c| r"\^$*+?.()|[]{}/".contains(c))
}

/// Escapes Lucene query syntax characters and whitespace.
#[must_use]
pub fn lucene_escape(value: &str) -> String {
    escape_chars(value, |c| c.is_whitespace() || r#"!*+-=<>&|()[]{}^~?:\/""#.contains(c))
}

fn escape_chars(value: &str, needs_escape: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if needs_escape(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Percent-encodes everything except unreserved characters.
#[must_use]
pub fn encode_uri_component_strict(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn regex_alternation(values: &[String]) -> String {
    let escaped: Vec<String> = values.iter().map(|v| regex_escape(v)).collect();
    match escaped.as_slice() {
        [single] => single.clone(),
        many => format!("({})", many.join("|")),
    }
}

fn quote_each(values: Vec<String>, quote: impl Fn(&str) -> String) -> String {
    values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",")
}

fn into_list(shape: Shape) -> Vec<String> {
    match shape {
        Shape::Scalar(s) => vec![s],
        Shape::List(values) => values,
    }
}

/// Formats `input` with `format`.
#[must_use]
pub fn format_value(format: FormatId, input: &FormatInput<'_>) -> String {
    match format {
        FormatId::Glob => match shape(input.value) {
            Shape::Scalar(s) => s,
            Shape::List(values) if values.is_empty() => String::new(),
            Shape::List(values) => regex_alternation(&values),
        },
        FormatId::Regex => match shape(input.value) {
            Shape::Scalar(s) => regex_escape(&s),
            Shape::List(values) => regex_alternation(&values),
        },
        FormatId::Text => match shape(input.text) {
            Shape::Scalar(s) => s,
            Shape::List(values) => values.join(" + "),
        },
        FormatId::QueryParam => into_list(shape(input.value))
            .iter()
            .map(|v| {
                format!(
                    "{}{}={}",
                    input.url_param_prefix,
                    input.name,
                    encode_uri_component_strict(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&"),
        FormatId::Lucene => match shape(input.value) {
            Shape::Scalar(s) => lucene_escape(&s),
            Shape::List(values) if values.is_empty() => "__empty__".to_string(),
            Shape::List(values) => {
                let quoted: Vec<String> = values
                    .iter()
                    .map(|v| format!("\"{}\"", lucene_escape(v)))
                    .collect();
                format!("({})", quoted.join(" OR "))
            }
        },
        FormatId::Raw | FormatId::Csv => into_list(shape(input.value)).join(","),
        FormatId::Pipe => into_list(shape(input.value)).join("|"),
        FormatId::Distributed => match shape(input.value) {
            Shape::Scalar(s) => s,
            Shape::List(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    if i == 0 {
                        v.clone()
                    } else {
                        format!("{}={v}", input.name)
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
        },
        FormatId::Html => match shape(input.value) {
            Shape::Scalar(s) => html_escape(&s),
            Shape::List(values) => values
                .iter()
                .map(|v| html_escape(v))
                .collect::<Vec<_>>()
                .join(", "),
        },
        FormatId::Json => serde_json::to_string(input.value).unwrap_or_default(),
        FormatId::PercentEncode => match shape(input.value) {
            Shape::Scalar(s) => encode_uri_component_strict(&s),
            Shape::List(values) => {
                encode_uri_component_strict(&format!("{{{}}}", values.join(",")))
            }
        },
        FormatId::SingleQuote => quote_each(into_list(shape(input.value)), |v| {
            format!("'{}'", v.replace('\'', "\\'"))
        }),
        FormatId::DoubleQuote => quote_each(into_list(shape(input.value)), |v| {
            format!("\"{}\"", v.replace('"', "\\\""))
        }),
        FormatId::SqlString => quote_each(into_list(shape(input.value)), |v| {
            format!("'{}'", v.replace('\'', "''"))
        }),
        FormatId::Date => format_date(input),
    }
}

fn format_date(input: &FormatInput<'_>) -> String {
    let raw = scalar_text(input.value);
    let Ok(ms) = raw.trim().parse::<i64>() else {
        return raw;
    };
    let arg = input.args.first().copied().unwrap_or("iso");
    match arg {
        "ms" => ms.to_string(),
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        "seconds" => ((ms as f64) / 1000.0).round().to_string(),
        _ => {
            let Some(utc) = Utc.timestamp_millis_opt(ms).single() else {
                return raw;
            };
            if arg == "iso" {
                return utc.to_rfc3339_opts(SecondsFormat::Millis, true);
            }
            // The pattern may contain ':' which the format spec split on.
            let pattern = input.args.join(":");
            let items: Vec<Item<'_>> = StrftimeItems::new(&pattern).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return raw;
            }
            if input.timezone == "browser" {
                let local: DateTime<Local> = utc.with_timezone(&Local);
                local.format_with_items(items.into_iter()).to_string()
            } else {
                utc.format_with_items(items.into_iter()).to_string()
            }
        }
    }
}
