//! Core domain model for prior-art similarity analysis.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `PatentMaterialData`: composition, microstructure and properties of a patent
//! - `RawValue`: an unparsed value token (text or number)
//! - `ScopeSelection`: which categories take part in a comparison
//! - `CategoryWeights` / `WeightTable`: importance configuration
//! - `SimilarityScoreRecord`: the per-pair score consumed by ranking

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors surfaced to callers of the scoring engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("At least one analysis category must be selected")]
    InvalidScope,
    #[error("Invalid category weights: {0}")]
    InvalidWeights(String),
}

/// A raw value token as it appears in a patent (e.g. `"0.05-0.15%"`, `"balance"`, `520`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Whether the token carries no information at all (empty text).
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(_) => false,
            Self::Text(s) => s.trim().is_empty(),
        }
    }

    /// Text form of the token.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Microstructure of a material.
///
/// Either a free-text description, or a structured breakdown into phases
/// (phase name to volume/fraction text), grain size and precipitates.
/// Deserializes from a plain JSON string as well as from an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MicrostructureRepr")]
pub struct Microstructure {
    /// Free-text description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Phase name to volume fraction text (e.g. `"austenite": "90-95%"`)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub phases: BTreeMap<String, RawValue>,

    /// Grain size text (e.g. `"10-20 μm"`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_size: Option<String>,

    /// Precipitate names (e.g. `["TiC", "NbC"]`)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub precipitates: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MicrostructureRepr {
    Text(String),
    Structured {
        #[serde(default)]
        description: String,
        #[serde(default)]
        phases: BTreeMap<String, RawValue>,
        #[serde(default, alias = "grainSize")]
        grain_size: Option<String>,
        #[serde(default)]
        precipitates: Vec<String>,
    },
}

impl From<MicrostructureRepr> for Microstructure {
    fn from(repr: MicrostructureRepr) -> Self {
        match repr {
            MicrostructureRepr::Text(description) => Self::from_text(description),
            MicrostructureRepr::Structured {
                description,
                phases,
                grain_size,
                precipitates,
            } => Self {
                description,
                phases,
                grain_size,
                precipitates,
            },
        }
    }
}

impl Microstructure {
    /// A description-only microstructure.
    pub fn from_text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>, fraction: impl Into<RawValue>) -> Self {
        self.phases.insert(phase.into(), fraction.into());
        self
    }

    pub fn with_grain_size(mut self, grain_size: impl Into<String>) -> Self {
        self.grain_size = Some(grain_size.into());
        self
    }

    pub fn with_precipitates<I, S>(mut self, precipitates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precipitates = precipitates.into_iter().map(Into::into).collect();
        self
    }

    /// Whether any structured facet (phases, grain size, precipitates) is filled in.
    pub fn is_structured(&self) -> bool {
        !self.phases.is_empty()
            || self.grain_size.as_deref().is_some_and(|g| !g.trim().is_empty())
            || !self.precipitates.is_empty()
    }
}

/// Material data of a single patent, as handed to the scoring engine.
///
/// Immutable for scoring purposes; produced by persistence or by text extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatentMaterialData {
    /// Patent identifier (publication or application number)
    #[serde(alias = "patent_number")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Element symbol to raw value token
    #[serde(default)]
    pub composition: BTreeMap<String, RawValue>,

    #[serde(default)]
    pub microstructure: Microstructure,

    /// Property name to raw value token
    #[serde(default)]
    pub properties: BTreeMap<String, RawValue>,

    /// Publication date (ISO format)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,

    /// Jurisdiction code (e.g. "KR", "JP", "US")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
}

impl PatentMaterialData {
    /// Create an empty record with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_element(mut self, symbol: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.composition.insert(symbol.into(), value.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_microstructure(mut self, microstructure: Microstructure) -> Self {
        self.microstructure = microstructure;
        self
    }

    pub fn with_publication_date(mut self, date: impl Into<String>) -> Self {
        self.publication_date = Some(date.into());
        self
    }
}

/// The three scored categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Composition,
    Microstructure,
    Properties,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Composition, Self::Microstructure, Self::Properties];

    /// Get a human-readable label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Composition => "Chemical Composition",
            Self::Microstructure => "Microstructure",
            Self::Properties => "Mechanical Properties",
        }
    }
}

/// Which categories take part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSelection {
    #[serde(default)]
    pub composition: bool,
    #[serde(default)]
    pub microstructure: bool,
    #[serde(default)]
    pub properties: bool,
}

impl Default for ScopeSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl ScopeSelection {
    pub fn all() -> Self {
        Self {
            composition: true,
            microstructure: true,
            properties: true,
        }
    }

    /// Scope containing a single category.
    pub fn only(category: Category) -> Self {
        let mut scope = Self {
            composition: false,
            microstructure: false,
            properties: false,
        };
        scope.set(category, true);
        scope
    }

    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Composition => self.composition,
            Category::Microstructure => self.microstructure,
            Category::Properties => self.properties,
        }
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        match category {
            Category::Composition => self.composition = enabled,
            Category::Microstructure => self.microstructure = enabled,
            Category::Properties => self.properties = enabled,
        }
    }

    /// Reject a scope with every category disabled.
    pub fn validate(&self) -> Result<(), ScoreError> {
        if Category::ALL.iter().any(|c| self.includes(*c)) {
            Ok(())
        } else {
            Err(ScoreError::InvalidScope)
        }
    }
}

/// Relative importance of the three categories in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub composition: f64,
    pub microstructure: f64,
    pub properties: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            composition: 40.0,
            microstructure: 30.0,
            properties: 30.0,
        }
    }
}

impl CategoryWeights {
    pub fn new(composition: f64, microstructure: f64, properties: f64) -> Self {
        Self {
            composition,
            microstructure,
            properties,
        }
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Composition => self.composition,
            Category::Microstructure => self.microstructure,
            Category::Properties => self.properties,
        }
    }
}

/// Importance weights keyed by element, phase or property name, with a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    pub default: f64,
}

impl WeightTable {
    pub fn new(default: f64) -> Self {
        Self {
            weights: BTreeMap::new(),
            default,
        }
    }

    pub fn with(mut self, key: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(key.into(), weight);
        self
    }

    /// Weight for `key`, or the default weight for unlisted keys.
    pub fn weight_of(&self, key: &str) -> f64 {
        self.weights.get(key).copied().unwrap_or(self.default)
    }
}

/// Similarity of a candidate to a target, each score in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScoreRecord {
    pub overall: f64,
    pub composition: f64,
    pub microstructure: f64,
    pub properties: f64,
}

impl SimilarityScoreRecord {
    pub fn category(&self, category: Category) -> f64 {
        match category {
            Category::Composition => self.composition,
            Category::Microstructure => self.microstructure,
            Category::Properties => self.properties,
        }
    }
}
