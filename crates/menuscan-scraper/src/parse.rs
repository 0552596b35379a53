//! Text helpers shared by the extractors and the normalizer.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?|\.\d+").expect("valid regex"));
static DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s?(\d[\d,]*(?:\.\d{1,2})?)").expect("valid regex"));
static THC_AFTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(%)?\s*THC\b").expect("valid regex")
});
static THC_BEFORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTHC\s*:?\s*(\d+(?:\.\d+)?)\s*(%)?").expect("valid regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]").expect("valid regex"));

/// Coerces free-form price text (`"45"`, `"$1,045.5"`, `"USD 12.99 each"`) to
/// `$N.NN`. Returns `None` when no number is present.
#[must_use]
pub fn coerce_price(text: &str) -> Option<String> {
    let m = NUMBER_RE.find(text)?;
    let value = m.as_str().replace(',', "").parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(format!("${value:.2}"))
}

/// A `$` amount inside a line of text. `range` covers the whole match,
/// including the dollar sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DollarMatch {
    pub range: Range<usize>,
    pub amount: String,
}

#[must_use]
pub fn find_dollar_price(text: &str) -> Option<DollarMatch> {
    let caps = DOLLAR_RE.captures(text)?;
    let whole = caps.get(0)?;
    let amount = caps.get(1)?.as_str().to_owned();
    Some(DollarMatch {
        range: whole.range(),
        amount,
    })
}

/// A THC reading inside a line of text, e.g. `"24.1% THC"` or `"THC: 18%"`.
/// `value` keeps the `%` when the source had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThcMatch {
    pub range: Range<usize>,
    pub value: String,
}

#[must_use]
pub fn find_thc(text: &str) -> Option<ThcMatch> {
    let caps = THC_AFTER_RE
        .captures(text)
        .or_else(|| THC_BEFORE_RE.captures(text))?;
    let whole = caps.get(0)?;
    let number = caps.get(1)?.as_str();
    let value = if caps.get(2).is_some() {
        format!("{number}%")
    } else {
        number.to_owned()
    };
    Some(ThcMatch {
        range: whole.range(),
        value,
    })
}

/// Trims and collapses internal runs of whitespace to single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

#[must_use]
pub fn has_letters(text: &str) -> bool {
    LETTER_RE.is_match(text)
}

/// Renders a JSON scalar as text. Integral floats drop the `.0`.
#[must_use]
pub fn json_scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{f:.0}")
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
