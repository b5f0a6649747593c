//! Feature extraction for material similarity analysis.
//!
//! Provides pure functions used by the scorers:
//! - Value parsing (`"≤0.15%"`, `"0.1~0.3"`, `"balance"`) into `ParsedRange`
//! - Overlap-over-wider-span range comparison
//! - Numeric extraction and relative-difference similarity
//! - Token sets and Jaccard similarity

use priorart_model::RawValue;
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::LazyLock;

/// Upper end assumed for a lower-bounded percentage (`≥N` means `N..100`).
pub const PERCENT_CEILING: f64 = 100.0;

/// Factor used to close a lower-bounded open quantity (`≥N` means `N..N*1.5`).
pub const LOWER_BOUND_EXTENSION: f64 = 1.5;

/// Tokens that mean "remainder of the composition" besides anything containing "balance".
const BALANCE_SYNONYMS: &[&str] = &["bal", "bal.", "remainder", "rest", "잔부"];

// A unit word may trail the number: wt, MPa, HV, μm, kgf/mm², 중량 ...
static INEQUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(<=|>=|≤|≥|<|>)(-?\d+(?:\.\d+)?)[\p{L}°/²·]*$").expect("valid inequality pattern")
});

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)-(-?\d+(?:\.\d+)?)[\p{L}°/²·]*$").expect("valid range pattern")
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)[\p{L}°/²·]*$").expect("valid number pattern")
});

static NUMBER_SCAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid number scan pattern"));

/// How a lower-bounded value (`≥N`) is closed into an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerBoundPolicy {
    /// Percentage scale: `N..100`
    PercentCeiling,
    /// Open numeric scale: `N..N*1.5`
    Extension,
}

impl LowerBoundPolicy {
    /// Close `≥min` into an interval. A negative bound runs up to zero.
    fn close_lower(self, min: f64) -> ParsedRange {
        match self {
            Self::PercentCeiling => ParsedRange::bounded(min, min.max(PERCENT_CEILING)),
            Self::Extension if min < 0.0 => ParsedRange::bounded(min, 0.0),
            Self::Extension => ParsedRange::bounded(min, min * LOWER_BOUND_EXTENSION),
        }
    }
}

/// Close `≤max` into an interval: `0..max`, or `1.5*max..max` below zero.
fn close_upper(max: f64) -> ParsedRange {
    if max < 0.0 {
        ParsedRange::bounded(max * LOWER_BOUND_EXTENSION, max)
    } else {
        ParsedRange::bounded(0.0, max)
    }
}

/// A value token normalized for comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedRange {
    /// A single value
    Exact { value: f64 },
    /// A closed interval, `min <= max`
    Bounded { min: f64, max: f64 },
    /// Remainder of the composition
    Balance,
    /// Nothing usable in the token
    Unparseable,
}

impl ParsedRange {
    pub fn exact(value: f64) -> Self {
        Self::Exact { value }
    }

    /// Closed interval between `a` and `b`, in either order.
    pub fn bounded(a: f64, b: f64) -> Self {
        Self::Bounded {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The value as a closed interval; exact values degenerate to `[v, v]`.
    pub fn interval(&self) -> Option<(f64, f64)> {
        match *self {
            Self::Exact { value } => Some((value, value)),
            Self::Bounded { min, max } => Some((min, max)),
            Self::Balance | Self::Unparseable => None,
        }
    }

    pub fn is_parseable(&self) -> bool {
        !matches!(self, Self::Unparseable)
    }

    /// `Unparseable` when an endpoint or the width overflows `f64`.
    fn finite_or_unparseable(self) -> Self {
        match self.interval() {
            Some((min, max)) if !(max - min).is_finite() => Self::Unparseable,
            _ => self,
        }
    }
}

/// Normalize separators and strip whitespace and percent signs.
pub fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '%' && *c != '％')
        .map(|c| match c {
            '，' => ',',
            '．' => '.',
            '~' | '～' | '–' | '−' => '-',
            '＜' => '<',
            '＞' => '>',
            '≦' => '≤',
            '≧' => '≥',
            other => other,
        })
        .collect()
}

fn is_balance(token: &str) -> bool {
    let lowered = token.trim().to_lowercase();
    lowered.contains("balance") || BALANCE_SYNONYMS.contains(&lowered.as_str())
}

/// Parse a raw text token into a `ParsedRange`. Never fails.
pub fn parse_value(token: &str, policy: LowerBoundPolicy) -> ParsedRange {
    if is_balance(token) {
        return ParsedRange::Balance;
    }
    parse_quantity(token, policy)
}

/// Parse an inequality, range or bare number, without the balance sentinel.
///
/// Used for property values, where "balance" is ordinary prose.
pub fn parse_quantity(token: &str, policy: LowerBoundPolicy) -> ParsedRange {
    parse_normalized(&normalize_token(token), policy).finite_or_unparseable()
}

fn parse_normalized(normalized: &str, policy: LowerBoundPolicy) -> ParsedRange {
    if let Some(caps) = INEQUALITY_RE.captures(normalized) {
        let Ok(value) = caps[2].parse::<f64>() else {
            return ParsedRange::Unparseable;
        };
        return match &caps[1] {
            "<=" | "≤" | "<" => close_upper(value),
            _ => policy.close_lower(value),
        };
    }

    if let Some(caps) = RANGE_RE.captures(normalized) {
        return match (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
            (Ok(a), Ok(b)) => ParsedRange::bounded(a, b),
            _ => ParsedRange::Unparseable,
        };
    }

    if let Some(caps) = NUMBER_RE.captures(normalized) {
        if let Ok(value) = caps[1].parse::<f64>() {
            return ParsedRange::exact(value);
        }
    }

    ParsedRange::Unparseable
}

/// Parse a raw value (text or number) into a `ParsedRange`.
pub fn parse_raw(value: &RawValue, policy: LowerBoundPolicy) -> ParsedRange {
    match value {
        RawValue::Number(n) if n.is_finite() => ParsedRange::exact(*n),
        RawValue::Number(_) => ParsedRange::Unparseable,
        RawValue::Text(s) => parse_value(s, policy),
    }
}

/// Similarity of two parsed ranges in `[0, 100]`.
///
/// Overlap divided by the wider of the two widths: a narrow range nested
/// inside a wide one scores by how much of the wide range it covers.
pub fn compare_ranges(a: &ParsedRange, b: &ParsedRange) -> f64 {
    use ParsedRange::*;

    match (a, b) {
        (Unparseable, _) | (_, Unparseable) => 0.0,
        (Balance, Balance) => 100.0,
        (Balance, _) | (_, Balance) => 0.0,
        (Exact { value: x }, Exact { value: y }) => {
            if x == y {
                100.0
            } else {
                0.0
            }
        }
        _ => match (a.interval(), b.interval()) {
            (Some(i1), Some(i2)) => interval_similarity(i1, i2),
            _ => 0.0,
        },
    }
}

/// Overlap-over-wider-span similarity of two closed intervals, in `[0, 100]`.
pub fn interval_similarity((min1, max1): (f64, f64), (min2, max2): (f64, f64)) -> f64 {
    let overlap = (max1.min(max2) - min1.max(min2)).max(0.0);
    let span = (max1 - min1).max(max2 - min2);

    if span <= 0.0 || !span.is_finite() {
        return if min1 == min2 && max1 == max2 { 100.0 } else { 0.0 };
    }

    (overlap / span * 100.0).clamp(0.0, 100.0)
}

/// Extract every number literal from free text.
///
/// A `-` directly after a digit is a range separator, not a sign.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    NUMBER_SCAN_RE
        .find_iter(text)
        .filter_map(|m| {
            let literal = m.as_str();
            let after_digit = text[..m.start()]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit());
            let literal = match literal.strip_prefix('-') {
                Some(unsigned) if after_digit => unsigned,
                _ => literal,
            };
            literal.parse::<f64>().ok()
        })
        .filter(|value| value.is_finite())
        .collect()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// `max(0, 1 - |a - b| / max(a, b)) * 100`.
pub fn relative_similarity(a: f64, b: f64) -> f64 {
    let larger = a.max(b);
    if larger <= 0.0 {
        return if a == b { 100.0 } else { 0.0 };
    }
    (1.0 - (a - b).abs() / larger).max(0.0) * 100.0
}

/// Average the numbers found in each text and compare them by relative difference.
///
/// Zero when either text contains no number.
pub fn numeric_text_similarity(text1: &str, text2: &str) -> f64 {
    match (mean(&extract_numbers(text1)), mean(&extract_numbers(text2))) {
        (Some(a), Some(b)) => relative_similarity(a, b),
        _ => 0.0,
    }
}

/// Jaccard similarity `|A ∩ B| / |A ∪ B| * 100`; zero for two empty sets.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64 * 100.0
}

/// Lowercased whitespace-separated words.
pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// Token-set Jaccard similarity of two free-text values.
pub fn text_similarity(text1: &str, text2: &str) -> f64 {
    jaccard(&word_set(text1), &word_set(text2))
}

/// Normalize a property or phase name for lookup: lowercase, alphanumerics only.
///
/// `"Tensile Strength"`, `"tensile_strength"` and `"tensileStrength"` coincide.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PCT: LowerBoundPolicy = LowerBoundPolicy::PercentCeiling;

    #[test]
    fn test_parse_range_forms() {
        assert_eq!(parse_value("0.05-0.15%", PCT), ParsedRange::bounded(0.05, 0.15));
        assert_eq!(parse_value("0.1 ~ 0.3 %", PCT), ParsedRange::bounded(0.1, 0.3));
        assert_eq!(parse_value("0.3-0.1", PCT), ParsedRange::bounded(0.1, 0.3));
        assert_eq!(parse_value("18～22％", PCT), ParsedRange::bounded(18.0, 22.0));
    }

    #[test]
    fn test_parse_inequalities() {
        assert_eq!(parse_value("≤0.1", PCT), ParsedRange::bounded(0.0, 0.1));
        assert_eq!(parse_value("<= 0.03%", PCT), ParsedRange::bounded(0.0, 0.03));
        assert_eq!(parse_value("≦0.5", PCT), ParsedRange::bounded(0.0, 0.5));
        assert_eq!(parse_value("≥10.5%", PCT), ParsedRange::bounded(10.5, 100.0));
        assert_eq!(
            parse_value(">400", LowerBoundPolicy::Extension),
            ParsedRange::bounded(400.0, 600.0)
        );
    }

    #[test]
    fn test_parse_negative_bounds() {
        let ext = LowerBoundPolicy::Extension;
        assert_eq!(parse_value("≤-40", ext), ParsedRange::bounded(-60.0, -40.0));
        assert_eq!(parse_value("≥-40", ext), ParsedRange::bounded(-40.0, 0.0));
        assert_eq!(parse_quantity("≤ -40 °C", ext), ParsedRange::bounded(-60.0, -40.0));
        assert_eq!(parse_value("≥-5", PCT), ParsedRange::bounded(-5.0, 100.0));
    }

    #[test]
    fn test_parse_full_width_and_dashes() {
        assert_eq!(parse_value("0．15", PCT), ParsedRange::exact(0.15));
        assert_eq!(parse_value("0．1–0．3", PCT), ParsedRange::bounded(0.1, 0.3));
        assert_eq!(parse_value("1−2", PCT), ParsedRange::bounded(1.0, 2.0));
        assert_eq!(parse_value("＜0.5", PCT), ParsedRange::bounded(0.0, 0.5));
        assert_eq!(parse_value("＞20", PCT), ParsedRange::bounded(20.0, 100.0));
        assert_eq!(parse_value("≧30", PCT), ParsedRange::bounded(30.0, 100.0));
        assert_eq!(normalize_token("1，2"), "1,2");
        assert_eq!(extract_numbers(&normalize_token("1，2")), vec![1.0, 2.0]);
    }

    #[test]
    fn test_parse_overflowing_numbers() {
        let huge = format!("1{}", "0".repeat(400));
        assert_eq!(parse_value(&format!("≤{huge}"), PCT), ParsedRange::Unparseable);
        assert_eq!(parse_value(&format!("≥{huge}"), PCT), ParsedRange::Unparseable);
        assert_eq!(parse_value(&format!("1-{huge}"), PCT), ParsedRange::Unparseable);
        assert_eq!(parse_value(&huge, PCT), ParsedRange::Unparseable);
        assert_eq!(
            parse_value(&format!("≥1{}", "0".repeat(308)), LowerBoundPolicy::Extension),
            ParsedRange::Unparseable
        );
        assert!(extract_numbers(&huge).is_empty());
    }

    #[test]
    fn test_interval_similarity_wide_span() {
        let wide = (-f64::MAX, f64::MAX);
        assert_eq!(interval_similarity(wide, wide), 100.0);
        assert_eq!(interval_similarity(wide, (0.0, 1.0)), 0.0);
    }

    #[test]
    fn test_parse_balance_and_exact() {
        assert_eq!(parse_value("balance", PCT), ParsedRange::Balance);
        assert_eq!(parse_value("Fe Balance", PCT), ParsedRange::Balance);
        assert_eq!(parse_value("bal.", PCT), ParsedRange::Balance);
        assert_eq!(parse_value("잔부", PCT), ParsedRange::Balance);
        assert_eq!(parse_value("0.5%", PCT), ParsedRange::exact(0.5));
        assert_eq!(parse_value("0.2wt%", PCT), ParsedRange::exact(0.2));
        assert_eq!(parse_value("-3", PCT), ParsedRange::exact(-3.0));
    }

    #[test]
    fn test_parse_quantity_ignores_balance() {
        assert_eq!(
            parse_quantity("good balance of strength", PCT),
            ParsedRange::Unparseable
        );
        assert_eq!(
            parse_quantity("≥ 500 MPa", LowerBoundPolicy::Extension),
            ParsedRange::bounded(500.0, 750.0)
        );
    }

    #[test]
    fn test_parse_unparseable() {
        assert_eq!(parse_value("garbage", PCT), ParsedRange::Unparseable);
        assert_eq!(parse_value("", PCT), ParsedRange::Unparseable);
        assert_eq!(parse_value("0.1-0.2-0.3", PCT), ParsedRange::Unparseable);
        assert_eq!(parse_raw(&RawValue::Number(f64::NAN), PCT), ParsedRange::Unparseable);
        assert_eq!(parse_raw(&RawValue::Number(1.5), PCT), ParsedRange::exact(1.5));
    }

    #[test]
    fn test_compare_special_variants() {
        let r = ParsedRange::bounded(1.0, 2.0);
        assert_eq!(compare_ranges(&ParsedRange::Unparseable, &r), 0.0);
        assert_eq!(compare_ranges(&ParsedRange::Unparseable, &ParsedRange::Unparseable), 0.0);
        assert_eq!(compare_ranges(&ParsedRange::Balance, &ParsedRange::Balance), 100.0);
        assert_eq!(compare_ranges(&ParsedRange::Balance, &r), 0.0);
        assert_eq!(compare_ranges(&ParsedRange::exact(0.3), &ParsedRange::exact(0.3)), 100.0);
        assert_eq!(compare_ranges(&ParsedRange::exact(0.3), &ParsedRange::exact(0.4)), 0.0);
    }

    #[test]
    fn test_compare_disjoint_and_nested() {
        let disjoint = compare_ranges(&ParsedRange::bounded(0.0, 1.0), &ParsedRange::bounded(5.0, 6.0));
        assert_eq!(disjoint, 0.0);

        // Nested: overlap 20 over the wider span 100.
        let nested = compare_ranges(&ParsedRange::bounded(0.0, 100.0), &ParsedRange::bounded(40.0, 60.0));
        assert!((nested - 20.0).abs() < 1e-9);

        // Staggered: overlap 1 over the wider span 2, not over the union 3.
        let half = compare_ranges(&ParsedRange::bounded(0.0, 2.0), &ParsedRange::bounded(1.0, 3.0));
        assert!((half - 50.0).abs() < 1e-9);

        let inside = compare_ranges(&ParsedRange::bounded(0.0, 1.0), &ParsedRange::bounded(0.2, 0.9));
        assert!((inside - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_compare_zero_span() {
        assert_eq!(
            compare_ranges(&ParsedRange::bounded(0.1, 0.1), &ParsedRange::exact(0.1)),
            100.0
        );
        assert_eq!(
            compare_ranges(&ParsedRange::bounded(0.1, 0.1), &ParsedRange::exact(0.2)),
            0.0
        );
    }

    #[test]
    fn test_extract_numbers() {
        assert_eq!(extract_numbers("0.1-0.3%"), vec![0.1, 0.3]);
        assert_eq!(extract_numbers("10 to 20 um"), vec![10.0, 20.0]);
        assert_eq!(extract_numbers("-40 C impact"), vec![-40.0]);
        assert!(extract_numbers("fine grains").is_empty());
    }

    #[test]
    fn test_relative_similarity() {
        assert_eq!(relative_similarity(10.0, 10.0), 100.0);
        assert!((relative_similarity(8.0, 10.0) - 80.0).abs() < 1e-9);
        assert_eq!(relative_similarity(0.0, 0.0), 100.0);
        assert_eq!(numeric_text_similarity("10-20 um", "15 um"), 100.0);
        assert_eq!(numeric_text_similarity("fine", "15 um"), 0.0);
    }

    #[test]
    fn test_jaccard() {
        let a: HashSet<&str> = ["tic", "nbc"].into_iter().collect();
        let b: HashSet<&str> = ["tic"].into_iter().collect();
        assert_eq!(jaccard(&a, &b), 50.0);
        assert_eq!(jaccard::<&str>(&HashSet::new(), &HashSet::new()), 0.0);
        assert!((text_similarity("Excellent weldability", "excellent formability") - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Tensile Strength"), "tensilestrength");
        assert_eq!(normalize_key("tensile_strength"), "tensilestrength");
        assert_eq!(normalize_key("tensileStrength"), "tensilestrength");
    }
}
