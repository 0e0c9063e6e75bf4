//! The comparison rules shared by sorting, deduplication and range checks.
//!
//! Ordering is tiered so it stays a total order over mixed data: missing
//! values first, then values that read as finite numbers (JSON numbers or
//! numeric strings) in numeric order, then everything else as text in folded
//! order with the raw text breaking ties.
//!
//! Range membership uses the looser pairwise rule: numeric when both sides
//! read as numbers, text otherwise.

use super::fold::fold;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Sort position of a single value.
enum Rank<'a> {
    Missing,
    Number(f64),
    Text(Cow<'a, str>),
}

impl<'a> Rank<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Rank::Missing,
            Some(v) => match as_number(Some(v)) {
                Some(n) => Rank::Number(n),
                None => Rank::Text(value_text(Some(v))),
            },
        }
    }

    fn tier(&self) -> u8 {
        match self {
            Rank::Missing => 0,
            Rank::Number(_) => 1,
            Rank::Text(_) => 2,
        }
    }
}

/// Total order over possibly missing field values.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (Rank::of(a), Rank::of(b)) {
        (Rank::Number(x), Rank::Number(y)) => x.total_cmp(&y),
        (Rank::Text(x), Rank::Text(y)) => compare_text(&x, &y),
        (x, y) => x.tier().cmp(&y.tier()),
    }
}

/// Pairwise comparison used for range bounds.
///
/// Not transitive over mixed numeric and text values, so never sort with it.
pub(crate) fn compare_bound(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => compare_text(&value_text(a), &value_text(b)),
    }
}

/// Folded text order, raw text order on ties.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

/// Text form of a value as seen by matching and string comparison.
pub(crate) fn value_text(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s),
        Some(other) => Cow::Owned(other.to_string()),
    }
}
