use crate::{normalized_weight, CategoryScore, FeatureKind, FeatureScore};
use priorart_features::{
    extract_numbers, interval_similarity, normalize_key, parse_quantity, text_similarity,
    LowerBoundPolicy, ParsedRange,
};
use priorart_model::{RawValue, WeightTable};
use std::collections::{BTreeMap, HashMap};

/// Relative half-width given to a single numeric property value (±5 %).
pub const PROPERTY_POINT_TOLERANCE: f64 = 0.05;

/// How a property value is compared.
#[derive(Debug, Clone, PartialEq)]
enum PropertyValue<'a> {
    Numeric(f64, f64),
    Text(&'a str),
}

fn point(value: f64) -> PropertyValue<'static> {
    let delta = value.abs() * PROPERTY_POINT_TOLERANCE;
    PropertyValue::Numeric(value - delta, value + delta)
}

/// Classify a property value as a numeric interval or free text.
///
/// Inequalities and ranges parse as in composition, with lower bounds closed
/// by the 1.5x extension. Other text falls back to the numbers it contains:
/// one number becomes a point, several become their min..max.
fn classify(value: &RawValue) -> PropertyValue<'_> {
    let text = match value {
        RawValue::Number(n) => return point(*n),
        RawValue::Text(text) => text,
    };

    match parse_quantity(text, LowerBoundPolicy::Extension) {
        ParsedRange::Bounded { min, max } => PropertyValue::Numeric(min, max),
        ParsedRange::Exact { value } => point(value),
        ParsedRange::Balance | ParsedRange::Unparseable => {
            let numbers = extract_numbers(text);
            match numbers.as_slice() {
                [] => PropertyValue::Text(text),
                [single] => point(*single),
                _ => {
                    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    PropertyValue::Numeric(min, max)
                }
            }
        }
    }
}

/// Weighted similarity over the properties named on both sides.
///
/// Names match ignoring case and separators. A numeric value compared with a
/// text value scores 0 but still counts its weight.
pub fn score_properties(
    target: &BTreeMap<String, RawValue>,
    candidate: &BTreeMap<String, RawValue>,
    weights: &WeightTable,
) -> CategoryScore {
    let candidate_by_key: HashMap<String, &RawValue> = candidate
        .iter()
        .filter(|(_, value)| !value.is_blank())
        .map(|(name, value)| (normalize_key(name), value))
        .collect();

    let mut features = Vec::new();

    for (name, target_value) in target {
        if target_value.is_blank() {
            continue;
        }
        let Some(candidate_value) = candidate_by_key.get(&normalize_key(name)) else {
            continue;
        };

        let (kind, similarity) = match (classify(target_value), classify(candidate_value)) {
            (PropertyValue::Numeric(min1, max1), PropertyValue::Numeric(min2, max2)) => (
                FeatureKind::NumericProperty,
                interval_similarity((min1, max1), (min2, max2)),
            ),
            (PropertyValue::Text(a), PropertyValue::Text(b)) => {
                (FeatureKind::TextProperty, text_similarity(a, b))
            }
            _ => (FeatureKind::MismatchedProperty, 0.0),
        };
        let weight = normalized_weight(weights, name);
        tracing::trace!(property = %name, ?kind, similarity, weight, "Compared property");

        features.push(FeatureScore {
            key: name.clone(),
            kind,
            similarity,
            weight,
        });
    }

    CategoryScore::from_features(features)
}
