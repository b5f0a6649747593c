//! Explanation generation for similarity scores.
//!
//! Converts a detailed score into human-readable explanations suitable for
//! a report or the command line.

use priorart_model::{Category, ScopeSelection, SimilarityScoreRecord};
use priorart_score::{CategoryScore, DetailedScore, FeatureKind, FeatureScore};
use serde::{Deserialize, Serialize};

/// A structured explanation for one category score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub category: Category,

    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation (1-2 sentences)
    pub detail: String,

    /// Category score (0 - 100)
    pub score: f64,

    /// Share of the overall score (0 - 100)
    pub weight: f64,

    /// Evidence items supporting this explanation
    pub evidence: Vec<EvidenceItem>,
}

/// A single comparison behind a category score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Type of evidence
    pub kind: String,

    /// The element, phase, keyword or property compared
    pub value: String,

    /// Optional context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Coarse level of an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchLevel {
    High,
    Moderate,
    Low,
}

impl MatchLevel {
    pub fn from_score(overall: f64) -> Self {
        if overall >= 80.0 {
            Self::High
        } else if overall >= 50.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "HIGH SIMILARITY",
            Self::Moderate => "MODERATE SIMILARITY",
            Self::Low => "LOW SIMILARITY",
        }
    }
}

/// Generate explanations for every category in scope.
pub fn explain_score(detailed: &DetailedScore, scope: ScopeSelection) -> Vec<Explanation> {
    Category::ALL
        .iter()
        .filter(|category| scope.includes(**category))
        .map(|category| {
            let score = match category {
                Category::Composition => &detailed.composition,
                Category::Microstructure => &detailed.microstructure,
                Category::Properties => &detailed.properties,
            };
            explain_category(*category, score, detailed.weights.get(*category))
        })
        .collect()
}

fn subject(category: Category) -> &'static str {
    match category {
        Category::Composition => "element",
        Category::Microstructure => "microstructure feature",
        Category::Properties => "property",
    }
}

/// Generate the explanation for a single category.
pub fn explain_category(category: Category, score: &CategoryScore, weight: f64) -> Explanation {
    let compared = score.features.len();
    let summary = if compared == 0 {
        format!("{}: nothing comparable", category.label())
    } else {
        format!(
            "{}: {:.0}% similar over {} {}(s)",
            category.label(),
            score.score,
            compared,
            subject(category)
        )
    };

    let mut ranked: Vec<&FeatureScore> = score.features.iter().collect();
    ranked.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    let detail = match (ranked.first(), ranked.last()) {
        (Some(best), Some(worst)) if compared > 1 => format!(
            "Closest match is {} at {:.0}%, weakest is {} at {:.0}%. \
             This category contributes {:.0}% of the overall score.",
            best.key, best.similarity, worst.key, worst.similarity, weight
        ),
        (Some(only), _) => format!(
            "Only {} could be compared ({:.0}% similar). \
             This category contributes {:.0}% of the overall score.",
            only.key, only.similarity, weight
        ),
        _ => format!(
            "Neither patent gives a {} that both sides share, so this category scores 0.",
            subject(category)
        ),
    };

    Explanation {
        category,
        summary,
        detail,
        score: score.score,
        weight,
        evidence: score.features.iter().map(explain_feature).collect(),
    }
}

/// Turn one comparison into an evidence item.
pub fn explain_feature(feature: &FeatureScore) -> EvidenceItem {
    let (kind, context) = match feature.kind {
        FeatureKind::Element => ("element", format!("{:.0}% range overlap", feature.similarity)),
        FeatureKind::Phase => ("phase", format!("{:.0}% fraction similarity", feature.similarity)),
        FeatureKind::GrainSize => ("grain_size", format!("{:.0}% size similarity", feature.similarity)),
        FeatureKind::Precipitates => (
            "precipitates",
            format!("{:.0}% of precipitate types shared", feature.similarity),
        ),
        FeatureKind::Keyword => (
            "keyword",
            if feature.similarity > 0.0 {
                "mentioned by both".to_string()
            } else {
                "mentioned by one side only".to_string()
            },
        ),
        FeatureKind::NumericProperty => (
            "numeric_property",
            format!("{:.0}% range overlap", feature.similarity),
        ),
        FeatureKind::TextProperty => (
            "text_property",
            format!("{:.0}% of words shared", feature.similarity),
        ),
        FeatureKind::MismatchedProperty => (
            "mismatched_property",
            "numeric on one side, descriptive on the other".to_string(),
        ),
    };

    EvidenceItem {
        kind: kind.to_string(),
        value: feature.key.clone(),
        context: Some(format!("{} (weight {})", context, feature.weight)),
    }
}

/// One-line summary of a score record.
pub fn summarize_match(record: &SimilarityScoreRecord) -> String {
    format!(
        "{}: {:.1}% overall (composition {:.1}%, microstructure {:.1}%, properties {:.1}%)",
        MatchLevel::from_score(record.overall).label(),
        record.overall,
        record.composition,
        record.microstructure,
        record.properties
    )
}
