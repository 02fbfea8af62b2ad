use std::cmp::Ordering;

use crate::layer::AttrValue;

/// A comparable precedence value.
///
/// Numbers (and text that parses as a number) compare numerically, other text
/// lexicographically, so ISO-8601 dates sort chronologically. A number and a
/// non-numeric text are incomparable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Precedence {
    Number(f64),
    Text(String),
}

impl Precedence {
    /// `None` for missing, blank, boolean or non-finite values.
    pub(crate) fn of(value: Option<&AttrValue>) -> Option<Self> {
        match value? {
            AttrValue::Number(n) if n.is_finite() => Some(Self::Number(*n)),
            AttrValue::Text(text) => {
                let text = text.trim();
                if text.is_empty() { return None }
                match text.parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(Self::Number(n)),
                    _ => Some(Self::Text(text.to_string())),
                }
            }
            _ => None,
        }
    }

    /// Partial order used for erosion decisions.
    pub(crate) fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used only for sorting: numbers before text.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

/// Whether a feature with precedence `a` must win over one with precedence `b`.
/// Equal, incomparable and missing values never win.
pub(crate) fn outranks(a: Option<&Precedence>, b: Option<&Precedence>, newest_first: bool) -> bool {
    let (Some(a), Some(b)) = (a, b) else { return false };
    match a.compare(b) {
        Some(Ordering::Greater) => newest_first,
        Some(Ordering::Less) => !newest_first,
        _ => false,
    }
}

/// Sort order: winners first, features without a precedence value last.
pub(crate) fn rank_cmp(a: Option<&Precedence>, b: Option<&Precedence>, newest_first: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if newest_first => b.sort_cmp(a),
        (Some(a), Some(b)) => a.sort_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
