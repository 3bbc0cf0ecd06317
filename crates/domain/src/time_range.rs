//! Time ranges and interval arithmetic.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// The unparsed `from`/`to` expressions of a range, such as `now-6h` and `now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimeRange {
    /// Start expression.
    pub from: String,
    /// End expression.
    pub to: String,
}

impl Default for RawTimeRange {
    fn default() -> Self {
        Self {
            from: "now-6h".to_string(),
            to: "now".to_string(),
        }
    }
}

/// An absolute time range with the expressions it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start instant.
    pub from: DateTime<Utc>,
    /// End instant.
    pub to: DateTime<Utc>,
    /// Source expressions.
    pub raw: RawTimeRange,
}

impl TimeRange {
    /// Resolves `raw` relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTimeRange`] if either bound does not parse or
    /// `from` is after `to`.
    pub fn parse(raw: RawTimeRange, now: DateTime<Utc>) -> DomainResult<Self> {
        let from = parse_time_expression(&raw.from, now)?;
        let to = parse_time_expression(&raw.to, now)?;
        if from > to {
            return Err(DomainError::InvalidTimeRange(format!(
                "{} is after {}",
                raw.from, raw.to
            )));
        }
        Ok(Self { from, to, raw })
    }

    /// Creates a range from absolute instants.
    #[must_use]
    pub fn absolute(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let raw = RawTimeRange {
            from: from.timestamp_millis().to_string(),
            to: to.timestamp_millis().to_string(),
        };
        Self { from, to, raw }
    }

    /// Length of the range in milliseconds.
    #[must_use]
    pub fn span_ms(&self) -> i64 {
        (self.to - self.from).num_milliseconds()
    }
}

#[allow(clippy::expect_used)]
static RELATIVE_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])(\d+)(ms|[smhdwMy])").expect("valid regex"));

#[allow(clippy::expect_used)]
static INTERVAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(ms|[Mwdhmsy])$").expect("valid regex"));

fn invalid_range(expr: &str) -> DomainError {
    DomainError::InvalidTimeRange(expr.to_string())
}

/// Parses `now`, `now-6h`, `now-1d+2h`, epoch milliseconds or RFC 3339.
///
/// # Errors
///
/// Returns [`DomainError::InvalidTimeRange`] for anything else.
pub fn parse_time_expression(expr: &str, now: DateTime<Utc>) -> DomainResult<DateTime<Utc>> {
    let expr = expr.trim();
    if let Some(mut rest) = expr.strip_prefix("now") {
        let mut instant = now;
        while !rest.is_empty() {
            let caps = RELATIVE_PART.captures(rest).ok_or_else(|| invalid_range(expr))?;
            let amount: i64 = caps[2].parse().map_err(|_| invalid_range(expr))?;
            let unit_ms = unit_to_ms(&caps[3]).ok_or_else(|| invalid_range(expr))?;
            let delta = Duration::milliseconds(amount.saturating_mul(unit_ms));
            instant = if &caps[1] == "-" {
                instant - delta
            } else {
                instant + delta
            };
            rest = &rest[caps[0].len()..];
        }
        return Ok(instant);
    }
    if let Ok(ms) = expr.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| invalid_range(expr));
    }
    DateTime::parse_from_rfc3339(expr)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid_range(expr))
}

const fn unit_to_ms(unit: &str) -> Option<i64> {
    Some(match unit.as_bytes() {
        b"ms" => 1,
        b"s" => 1_000,
        b"m" => 60_000,
        b"h" => 3_600_000,
        b"d" => 86_400_000,
        b"w" => 604_800_000,
        b"M" => 2_592_000_000,
        b"y" => 31_536_000_000,
        _ => return None,
    })
}

/// Converts an interval such as `10s` or `1.5h` to milliseconds.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInterval`] if the string is not `<number><unit>`.
pub fn interval_to_ms(interval: &str) -> DomainResult<i64> {
    let invalid = || DomainError::InvalidInterval(interval.to_string());
    let caps = INTERVAL.captures(interval.trim()).ok_or_else(invalid)?;
    let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
    let unit_ms = unit_to_ms(&caps[2]).ok_or_else(invalid)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    Ok((amount * unit_ms as f64) as i64)
}

/// Rounds a raw interval to a "nice" value.
#[must_use]
pub const fn round_interval(interval_ms: i64) -> i64 {
    match interval_ms {
        i64::MIN..10 => 1,
        10..15 => 10,
        15..35 => 20,
        35..75 => 50,
        75..150 => 100,
        150..350 => 200,
        350..750 => 500,
        750..1_500 => 1_000,
        1_500..3_500 => 2_000,
        3_500..7_500 => 5_000,
        7_500..12_500 => 10_000,
        12_500..17_500 => 15_000,
        17_500..25_000 => 20_000,
        25_000..45_000 => 30_000,
        45_000..90_000 => 60_000,
        90_000..210_000 => 120_000,
        210_000..450_000 => 300_000,
        450_000..750_000 => 600_000,
        750_000..1_050_000 => 900_000,
        1_050_000..1_500_000 => 1_200_000,
        1_500_000..2_700_000 => 1_800_000,
        2_700_000..5_400_000 => 3_600_000,
        5_400_000..9_000_000 => 7_200_000,
        9_000_000..16_200_000 => 10_800_000,
        16_200_000..32_400_000 => 21_600_000,
        32_400_000..86_400_000 => 43_200_000,
        86_400_000..604_800_000 => 86_400_000,
        604_800_000..1_814_400_000 => 604_800_000,
        1_814_400_000..3_628_800_000 => 2_592_000_000,
        _ => 31_536_000_000,
    }
}

/// Renders milliseconds with the largest whole unit, e.g. `5m`, `1d`, `200ms`.
#[must_use]
pub fn ms_to_interval(ms: i64) -> String {
    if ms <= 0 {
        return "0ms".to_string();
    }
    for (unit, size) in [
        ("y", 31_536_000_000),
        ("d", 86_400_000),
        ("h", 3_600_000),
        ("m", 60_000),
        ("s", 1_000),
    ] {
        if ms >= size {
            return format!("{}{unit}", ms / size);
        }
    }
    format!("{ms}ms")
}

/// A computed interval in text and milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    /// Text form such as `30s`.
    pub interval: String,
    /// Milliseconds.
    pub interval_ms: i64,
}

/// Divides `range` into `resolution` steps, rounds, and clamps to `low_limit`.
///
/// # Errors
///
/// Returns [`DomainError::InvalidInterval`] if `low_limit` does not parse.
pub fn calculate_interval(
    range: &TimeRange,
    resolution: u32,
    low_limit: Option<&str>,
) -> DomainResult<Interval> {
    let low_limit_ms = match low_limit.filter(|l| !l.is_empty()) {
        Some(limit) => interval_to_ms(limit)?,
        None => 1,
    };
    let interval_ms = round_interval(range.span_ms() / i64::from(resolution.max(1))).max(low_limit_ms);
    Ok(Interval {
        interval: ms_to_interval(interval_ms),
        interval_ms,
    })
}
