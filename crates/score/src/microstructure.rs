use crate::{normalized_weight, weighted_mean, CategoryScore, FeatureKind, FeatureScore};
use priorart_features::{jaccard, normalize_key, numeric_text_similarity};
use priorart_model::{Microstructure, RawValue, WeightTable};
use std::collections::{HashMap, HashSet};

/// Share of the phase-fraction facet when every facet is comparable.
pub const PHASE_FACET_WEIGHT: f64 = 70.0;
/// Share of the grain-size facet when every facet is comparable.
pub const GRAIN_SIZE_FACET_WEIGHT: f64 = 15.0;
/// Share of the precipitate facet when every facet is comparable.
pub const PRECIPITATE_FACET_WEIGHT: f64 = 15.0;

/// Terms looked for in free-text descriptions, matched as lowercase substrings.
pub const MICROSTRUCTURE_VOCABULARY: &[&str] = &[
    "ferrite",
    "austenite",
    "pearlite",
    "martensite",
    "bainite",
    "페라이트",
    "오스테나이트",
    "펄라이트",
    "마르텐사이트",
    "베이나이트",
    "grain boundary",
    "precipitate",
    "inclusion",
    "intragranular",
    "결정립",
    "석출물",
    "개재물",
    "입계",
    "입내",
];

/// Microstructure similarity.
///
/// Uses the structured facets when both sides have at least one, otherwise
/// falls back to keyword presence in the descriptions.
pub fn score_microstructure(
    target: &Microstructure,
    candidate: &Microstructure,
    phase_weights: &WeightTable,
) -> CategoryScore {
    if target.is_structured() && candidate.is_structured() {
        score_structured(target, candidate, phase_weights)
    } else {
        score_keywords(&target.description, &candidate.description)
    }
}

fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.trim().is_empty())
}

fn precipitate_set(precipitates: &[String]) -> HashSet<String> {
    precipitates
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Weighted phase, grain-size and precipitate facets, renormalized over the
/// facets present on both sides.
fn score_structured(
    target: &Microstructure,
    candidate: &Microstructure,
    phase_weights: &WeightTable,
) -> CategoryScore {
    let mut features = Vec::new();
    let mut facets: Vec<(f64, f64)> = Vec::new();

    let candidate_phases: HashMap<String, &RawValue> = candidate
        .phases
        .iter()
        .filter(|(_, fraction)| !fraction.is_blank())
        .map(|(phase, fraction)| (normalize_key(phase), fraction))
        .collect();

    let mut phase_scores = Vec::new();
    for (phase, fraction) in &target.phases {
        if fraction.is_blank() {
            continue;
        }
        let Some(other) = candidate_phases.get(&normalize_key(phase)) else {
            continue;
        };

        let similarity = numeric_text_similarity(&fraction.as_text(), &other.as_text());
        let weight = normalized_weight(phase_weights, phase);
        tracing::trace!(phase = %phase, similarity, weight, "Compared phase");

        phase_scores.push((similarity, weight));
        features.push(FeatureScore {
            key: phase.clone(),
            kind: FeatureKind::Phase,
            similarity,
            weight,
        });
    }
    if phase_scores.iter().any(|(_, weight)| *weight > 0.0) {
        facets.push((weighted_mean(phase_scores), PHASE_FACET_WEIGHT));
    }

    if let (Some(a), Some(b)) = (non_blank(&target.grain_size), non_blank(&candidate.grain_size)) {
        let similarity = numeric_text_similarity(a, b);
        facets.push((similarity, GRAIN_SIZE_FACET_WEIGHT));
        features.push(FeatureScore {
            key: "grain size".to_string(),
            kind: FeatureKind::GrainSize,
            similarity,
            weight: GRAIN_SIZE_FACET_WEIGHT,
        });
    }

    let target_precipitates = precipitate_set(&target.precipitates);
    let candidate_precipitates = precipitate_set(&candidate.precipitates);
    if !target_precipitates.is_empty() && !candidate_precipitates.is_empty() {
        let similarity = jaccard(&target_precipitates, &candidate_precipitates);
        facets.push((similarity, PRECIPITATE_FACET_WEIGHT));
        features.push(FeatureScore {
            key: "precipitates".to_string(),
            kind: FeatureKind::Precipitates,
            similarity,
            weight: PRECIPITATE_FACET_WEIGHT,
        });
    }

    CategoryScore {
        score: weighted_mean(facets),
        features,
    }
}

fn normalize_description(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Fraction of vocabulary terms found in either text that appear in both.
fn score_keywords(target: &str, candidate: &str) -> CategoryScore {
    let target = normalize_description(target);
    let candidate = normalize_description(candidate);

    let features = MICROSTRUCTURE_VOCABULARY
        .iter()
        .filter_map(|term| {
            let in_target = target.contains(term);
            let in_candidate = candidate.contains(term);
            (in_target || in_candidate).then(|| FeatureScore {
                key: term.to_string(),
                kind: FeatureKind::Keyword,
                similarity: if in_target && in_candidate { 100.0 } else { 0.0 },
                weight: 1.0,
            })
        })
        .collect();

    CategoryScore::from_features(features)
}
