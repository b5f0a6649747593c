//! Similarity scoring between a target patent and a prior-art candidate.
//!
//! Each category has its own scorer:
//! - composition: per-element range overlap, weighted by element importance
//! - microstructure: phase fractions, grain size and precipitates, or
//!   keyword presence when only free text is available
//! - properties: numeric range overlap or word-set similarity per property
//!
//! The aggregator folds the category scores into one overall score using
//! category weights renormalized over the selected scope.

mod aggregate;
mod composition;
mod microstructure;
mod properties;
pub mod tables;

pub use aggregate::{combine, effective_weights};
pub use composition::score_composition;
pub use microstructure::{
    score_microstructure, GRAIN_SIZE_FACET_WEIGHT, MICROSTRUCTURE_VOCABULARY, PHASE_FACET_WEIGHT,
    PRECIPITATE_FACET_WEIGHT,
};
pub use properties::{score_properties, PROPERTY_POINT_TOLERANCE};

use priorart_features::normalize_key;
use priorart_model::{
    CategoryWeights, PatentMaterialData, ScopeSelection, ScoreError, SimilarityScoreRecord,
    WeightTable,
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// What a single comparison inside a category was about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Element,
    Phase,
    GrainSize,
    Precipitates,
    Keyword,
    NumericProperty,
    TextProperty,
    /// Numeric on one side, text on the other
    MismatchedProperty,
}

/// One comparison made by a scorer, kept for explanations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScore {
    /// Element symbol, phase, facet, keyword or property name
    pub key: String,
    pub kind: FeatureKind,
    /// Similarity in `[0, 100]`
    pub similarity: f64,
    pub weight: f64,
}

/// Score of one category plus the comparisons behind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryScore {
    /// Score in `[0, 100]`; zero when nothing was comparable
    pub score: f64,
    pub features: Vec<FeatureScore>,
}

impl CategoryScore {
    /// Weighted average of the collected features, zero if their total weight is zero.
    fn from_features(features: Vec<FeatureScore>) -> Self {
        let score = weighted_mean(features.iter().map(|f| (f.similarity, f.weight)));
        Self { score, features }
    }
}

/// Weighted mean of `(score, weight)` pairs, zero when the total weight is zero.
///
/// Accumulates offsets from the lowest weighted score, so equal scores come
/// back unchanged whatever the weights are.
fn weighted_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let pairs: Vec<(f64, f64)> = pairs.into_iter().filter(|(_, weight)| *weight > 0.0).collect();
    let total: f64 = pairs.iter().map(|(_, weight)| weight).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let base = pairs
        .iter()
        .map(|(score, _)| *score)
        .fold(f64::INFINITY, f64::min);
    let offset: f64 = pairs.iter().map(|(score, weight)| (score - base) * weight).sum();
    base + offset / total
}

/// Table lookup ignoring case and separators on both sides.
fn normalized_weight(table: &WeightTable, key: &str) -> f64 {
    let key = normalize_key(key);
    table
        .weights
        .iter()
        .find(|(name, _)| normalize_key(name) == key)
        .map(|(_, weight)| *weight)
        .unwrap_or(table.default)
}

/// A score record together with the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedScore {
    pub record: SimilarityScoreRecord,
    /// Category weights after renormalization over the scope (sum to 100)
    pub weights: CategoryWeights,
    pub composition: CategoryScore,
    pub microstructure: CategoryScore,
    pub properties: CategoryScore,
}

/// Weights used by the scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub category_weights: CategoryWeights,
    /// Keyed by element symbol
    pub element_weights: WeightTable,
    /// Keyed by phase name, matched case-insensitively
    pub phase_weights: WeightTable,
    /// Keyed by property name, matched ignoring case and separators
    pub property_weights: WeightTable,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            category_weights: CategoryWeights::default(),
            element_weights: tables::element_weights(),
            phase_weights: tables::phase_weights(),
            property_weights: tables::property_weights(),
        }
    }
}

/// Scores (target, candidate) pairs with a fixed configuration.
///
/// Holds no mutable state; one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

static DEFAULT_SCORER: LazyLock<Scorer> = LazyLock::new(Scorer::default);

/// Score a candidate against a target with the default weight tables.
///
/// `weights` overrides the default 40/30/30 category weights.
pub fn score(
    target: &PatentMaterialData,
    candidate: &PatentMaterialData,
    scope: ScopeSelection,
    weights: Option<&CategoryWeights>,
) -> Result<SimilarityScoreRecord, ScoreError> {
    let scorer = &*DEFAULT_SCORER;
    let weights = weights.unwrap_or(&scorer.config.category_weights);
    scorer
        .score_detailed_with(target, candidate, scope, weights)
        .map(|detailed| detailed.record)
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a pair, returning only the record.
    pub fn score(
        &self,
        target: &PatentMaterialData,
        candidate: &PatentMaterialData,
        scope: ScopeSelection,
    ) -> Result<SimilarityScoreRecord, ScoreError> {
        self.score_detailed(target, candidate, scope)
            .map(|detailed| detailed.record)
    }

    /// Score a pair, keeping every comparison made along the way.
    pub fn score_detailed(
        &self,
        target: &PatentMaterialData,
        candidate: &PatentMaterialData,
        scope: ScopeSelection,
    ) -> Result<DetailedScore, ScoreError> {
        self.score_detailed_with(target, candidate, scope, &self.config.category_weights)
    }

    fn score_detailed_with(
        &self,
        target: &PatentMaterialData,
        candidate: &PatentMaterialData,
        scope: ScopeSelection,
        category_weights: &CategoryWeights,
    ) -> Result<DetailedScore, ScoreError> {
        let weights = effective_weights(category_weights, scope)?;

        let composition = if scope.composition {
            score_composition(
                &target.composition,
                &candidate.composition,
                &self.config.element_weights,
            )
        } else {
            CategoryScore::default()
        };

        let microstructure = if scope.microstructure {
            score_microstructure(
                &target.microstructure,
                &candidate.microstructure,
                &self.config.phase_weights,
            )
        } else {
            CategoryScore::default()
        };

        let properties = if scope.properties {
            score_properties(
                &target.properties,
                &candidate.properties,
                &self.config.property_weights,
            )
        } else {
            CategoryScore::default()
        };

        let record = combine(
            &weights,
            composition.score,
            microstructure.score,
            properties.score,
        );

        tracing::debug!(
            target_id = %target.id,
            candidate_id = %candidate.id,
            overall = record.overall,
            composition = record.composition,
            microstructure = record.microstructure,
            properties = record.properties,
            "Scored pair"
        );

        Ok(DetailedScore {
            record,
            weights,
            composition,
            microstructure,
            properties,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priorart_model::{Category, Microstructure};

    fn stainless(id: &str) -> PatentMaterialData {
        PatentMaterialData::new(id)
            .with_element("C", "≤0.08%")
            .with_element("Cr", "18-20%")
            .with_element("Ni", "8-10.5%")
            .with_element("Fe", "balance")
            .with_microstructure(
                Microstructure::from_text("austenite matrix with fine grain boundary carbides")
                    .with_phase("austenite", "95%")
                    .with_phase("ferrite", "≤5%")
                    .with_grain_size("20-40 um")
                    .with_precipitates(["TiC", "NbC"]),
            )
            .with_property("tensileStrength", "520-720 MPa")
            .with_property("elongation", 40.0)
            .with_property("corrosionResistance", "excellent in chloride media")
    }

    #[test]
    fn test_self_comparison_is_full_match() {
        let patent = stainless("KR-1");
        let record = score(&patent, &patent, ScopeSelection::all(), None).unwrap();
        assert_eq!(record.composition, 100.0);
        assert_eq!(record.microstructure, 100.0);
        assert_eq!(record.properties, 100.0);
        assert_eq!(record.overall, 100.0);
    }

    #[test]
    fn test_partial_composition_overlap() {
        let target = PatentMaterialData::new("T")
            .with_element("C", "0.05-0.15%")
            .with_element("Cr", "18-22%");
        let candidate = PatentMaterialData::new("P")
            .with_element("C", "0.08-0.12%")
            .with_element("Cr", "19-21%");

        let detailed = Scorer::default()
            .score_detailed(&target, &candidate, ScopeSelection::all())
            .unwrap();

        assert_eq!(detailed.composition.features.len(), 2);
        for feature in &detailed.composition.features {
            assert!(feature.similarity > 0.0 && feature.similarity < 100.0, "{feature:?}");
        }
        let composition = detailed.record.composition;
        assert!(composition > 0.0 && composition < 100.0);
    }

    #[test]
    fn test_all_categories_disabled_is_rejected() {
        let patent = stainless("KR-1");
        let scope = ScopeSelection {
            composition: false,
            microstructure: false,
            properties: false,
        };
        assert_eq!(
            score(&patent, &patent, scope, None),
            Err(ScoreError::InvalidScope)
        );
    }

    #[test]
    fn test_excluded_categories_are_not_scored() {
        let patent = stainless("KR-1");
        let detailed = Scorer::default()
            .score_detailed(&patent, &patent, ScopeSelection::only(Category::Composition))
            .unwrap();

        assert_eq!(detailed.weights.composition, 100.0);
        assert_eq!(detailed.record.microstructure, 0.0);
        assert_eq!(detailed.record.properties, 0.0);
        assert!(detailed.microstructure.features.is_empty());
        assert_eq!(detailed.record.overall, 100.0);
    }

    #[test]
    fn test_weight_override() {
        let target = stainless("T");
        let mut candidate = stainless("P");
        candidate.properties.clear();

        let default = score(&target, &candidate, ScopeSelection::all(), None).unwrap();
        let heavy = CategoryWeights::new(50.0, 30.0, 20.0);
        let overridden = score(&target, &candidate, ScopeSelection::all(), Some(&heavy)).unwrap();

        assert!((default.overall - 70.0).abs() < 1e-9);
        assert!((overridden.overall - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_self_comparison_exact_with_fractional_weights() {
        let patent = stainless("KR-1");
        let weights = CategoryWeights::new(0.1, 0.2, 0.3);
        let record = score(&patent, &patent, ScopeSelection::all(), Some(&weights)).unwrap();
        assert_eq!(record.overall, 100.0);
    }

    #[test]
    fn test_overflowing_value_keeps_scores_finite() {
        let patent = PatentMaterialData::new("KR-9")
            .with_element("C", "0.1%")
            .with_element("N", format!("≤1{}", "0".repeat(400)));
        let record = score(&patent, &patent, ScopeSelection::only(Category::Composition), None).unwrap();
        assert_eq!(record.composition, 100.0);
        assert_eq!(record.overall, 100.0);
    }

    #[test]
    fn test_weighted_mean() {
        assert_eq!(weighted_mean([(100.0, 0.1), (100.0, 0.2), (100.0, 0.7)]), 100.0);
        assert_eq!(weighted_mean([(0.0, 1.0), (80.0, 3.0)]), 60.0);
        assert_eq!(weighted_mean([(50.0, 0.0), (70.0, 2.0)]), 70.0);
        assert_eq!(weighted_mean(std::iter::empty::<(f64, f64)>()), 0.0);
    }

    #[test]
    fn test_config_deserializes_partially() {
        let config: ScoringConfig =
            serde_json::from_str(r#"{"category_weights": {"composition": 50, "microstructure": 30, "properties": 20}}"#)
                .unwrap();
        assert_eq!(config.category_weights, CategoryWeights::new(50.0, 30.0, 20.0));
        assert_eq!(config.element_weights, tables::element_weights());
    }
}
