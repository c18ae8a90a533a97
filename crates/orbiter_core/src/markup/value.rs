//! Typed key-value payloads.
//!
//! # Responsibility
//! - Infer integer/float/date/string values from their textual spelling.
//! - Encode values back to a spelling the decoder accepts again.
//!
//! # Invariants
//! - `KvValue::infer(&v.encode()) == v` for every value `encode` produces,
//!   except floats, which are encoded with exactly one decimal digit.
//! - Dates always encode as `YYYY-MM-DD`, whichever spelling they came from.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
const LONG_DATE_FORMAT: &str = "%B %d, %Y";

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0|[1-9]\d*)$").expect("valid int regex"));
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0|[1-9]\d*)\.\d+$").expect("valid float regex"));
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));
static DAY_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(st|nd|rd|th)\b").expect("valid day suffix regex"));

/// Raised when a value spelling matches none of the typed forms.
///
/// Callers that only need a value use [`KvValue::infer`], which falls back to
/// [`KvValue::Text`] instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDecodeError {
    pub raw: String,
}

impl Display for ValueDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "value `{}` is not an integer, float or date",
            self.raw
        )
    }
}

impl Error for ValueDecodeError {}

/// Value half of a key-value tag.
#[derive(Debug, Clone, PartialEq)]
pub enum KvValue {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl KvValue {
    /// Decodes a typed value, failing when the spelling is plain text.
    ///
    /// Precedence is integer, float, ISO date, long-form date. Dates may be
    /// wrapped in a page reference (`[[August 8th, 2020]]`).
    pub fn decode(raw: &str) -> Result<Self, ValueDecodeError> {
        if INT_RE.is_match(raw) {
            if let Ok(value) = raw.parse::<i64>() {
                return Ok(Self::Int(value));
            }
        }
        if FLOAT_RE.is_match(raw) {
            if let Ok(value) = raw.parse::<f64>() {
                return Ok(Self::Float(value));
            }
        }
        if let Some(date) = parse_date(unwrap_reference(raw)) {
            return Ok(Self::Date(date));
        }
        Err(ValueDecodeError {
            raw: raw.to_string(),
        })
    }

    /// Decodes a value, keeping unrecognised spellings as text.
    pub fn infer(raw: &str) -> Self {
        Self::decode(raw).unwrap_or_else(|err| Self::Text(err.raw))
    }

    /// Canonical spelling of this value.
    pub fn encode(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Float(value) => format!("{value:.1}"),
            Self::Date(date) => date.format(ISO_DATE_FORMAT).to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view; integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Short type label used in field errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Date(_) => "date",
            Self::Text(_) => "string",
        }
    }
}

impl Display for KvValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<i64> for KvValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for KvValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<NaiveDate> for KvValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<&str> for KvValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KvValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Parses `YYYY-MM-DD` or `Month Day[suffix], Year`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    if ISO_DATE_RE.is_match(raw) {
        return NaiveDate::parse_from_str(raw, ISO_DATE_FORMAT).ok();
    }
    parse_long_date(raw)
}

/// Parses `August 8th, 2020` style dates; the ordinal suffix is optional.
pub fn parse_long_date(raw: &str) -> Option<NaiveDate> {
    let without_suffix = DAY_SUFFIX_RE.replace_all(raw, "$1");
    NaiveDate::parse_from_str(&without_suffix, LONG_DATE_FORMAT).ok()
}

/// Formats a date as `August 8th, 2020`.
pub fn format_long_date(date: NaiveDate) -> String {
    let day = date.day();
    format!(
        "{} {}{}, {}",
        date.format("%B"),
        day,
        day_suffix(day),
        date.year()
    )
}

/// English ordinal suffix for a day of month; 11 to 13 always take `th`.
pub fn day_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

fn unwrap_reference(raw: &str) -> &str {
    raw.strip_prefix("[[")
        .and_then(|inner| inner.strip_suffix("]]"))
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::{day_suffix, format_long_date, parse_long_date, KvValue};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn infer_follows_type_precedence() {
        assert_eq!(KvValue::infer("42"), KvValue::Int(42));
        assert_eq!(KvValue::infer("0"), KvValue::Int(0));
        assert_eq!(KvValue::infer("3.5"), KvValue::Float(3.5));
        assert_eq!(KvValue::infer("2020-08-31"), KvValue::Date(date(2020, 8, 31)));
        assert_eq!(
            KvValue::infer("August 8th, 2020"),
            KvValue::Date(date(2020, 8, 8))
        );
        assert_eq!(
            KvValue::infer("[[August 8th, 2020]]"),
            KvValue::Date(date(2020, 8, 8))
        );
        assert_eq!(KvValue::infer("ToReview"), KvValue::Text("ToReview".into()));
    }

    #[test]
    fn leading_zeros_and_bad_dates_stay_text() {
        assert_eq!(KvValue::infer("007"), KvValue::Text("007".into()));
        assert_eq!(KvValue::infer("2020-13-45"), KvValue::Text("2020-13-45".into()));
        assert_eq!(KvValue::infer(".5"), KvValue::Text(".5".into()));
    }

    #[test]
    fn decode_reports_plain_text() {
        let err = KvValue::decode("ExpDefault").unwrap_err();
        assert_eq!(err.raw, "ExpDefault");
        assert!(err.to_string().contains("ExpDefault"));
    }

    #[test]
    fn encode_uses_canonical_spellings() {
        assert_eq!(KvValue::Int(1200).encode(), "1200");
        assert_eq!(KvValue::Float(3.0).encode(), "3.0");
        assert_eq!(KvValue::Float(3.26).encode(), "3.3");
        assert_eq!(KvValue::Date(date(2020, 8, 8)).encode(), "2020-08-08");
    }

    #[test]
    fn day_suffix_handles_teens() {
        assert_eq!(day_suffix(1), "st");
        assert_eq!(day_suffix(2), "nd");
        assert_eq!(day_suffix(3), "rd");
        assert_eq!(day_suffix(11), "th");
        assert_eq!(day_suffix(12), "th");
        assert_eq!(day_suffix(13), "th");
        assert_eq!(day_suffix(21), "st");
        assert_eq!(day_suffix(22), "nd");
    }

    #[test]
    fn long_dates_format_and_parse_back() {
        let original = date(2020, 8, 22);
        let formatted = format_long_date(original);
        assert_eq!(formatted, "August 22nd, 2020");
        assert_eq!(parse_long_date(&formatted), Some(original));
        assert_eq!(format_long_date(date(2021, 3, 11)), "March 11th, 2021");
    }
}
