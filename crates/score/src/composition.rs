use crate::{CategoryScore, FeatureKind, FeatureScore};
use priorart_features::{compare_ranges, parse_raw, LowerBoundPolicy};
use priorart_model::{RawValue, WeightTable};
use std::collections::{BTreeMap, BTreeSet};

/// Weighted range similarity over the elements specified on both sides.
///
/// Elements present on one side only are ignored, as are tokens that do not
/// parse. Zero when no element can be compared.
pub fn score_composition(
    target: &BTreeMap<String, RawValue>,
    candidate: &BTreeMap<String, RawValue>,
    weights: &WeightTable,
) -> CategoryScore {
    let elements: BTreeSet<&String> = target.keys().chain(candidate.keys()).collect();
    let mut features = Vec::new();

    for element in elements {
        let (Some(target_value), Some(candidate_value)) = (target.get(element), candidate.get(element))
        else {
            continue;
        };
        if target_value.is_blank() || candidate_value.is_blank() {
            continue;
        }

        let target_range = parse_raw(target_value, LowerBoundPolicy::PercentCeiling);
        let candidate_range = parse_raw(candidate_value, LowerBoundPolicy::PercentCeiling);
        if !target_range.is_parseable() || !candidate_range.is_parseable() {
            tracing::trace!(
                element = %element,
                target = %target_value,
                candidate = %candidate_value,
                "Skipping unparseable element"
            );
            continue;
        }

        let similarity = compare_ranges(&target_range, &candidate_range);
        let weight = weights.weight_of(element.trim());
        tracing::trace!(element = %element, similarity, weight, "Compared element");

        features.push(FeatureScore {
            key: element.clone(),
            kind: FeatureKind::Element,
            similarity,
            weight,
        });
    }

    CategoryScore::from_features(features)
}
