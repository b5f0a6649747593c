use crate::weighted_mean;
use priorart_model::{Category, CategoryWeights, ScopeSelection, ScoreError, SimilarityScoreRecord};

/// Zero the weights of excluded categories and rescale the rest to sum to 100.
///
/// Fails with `InvalidScope` when no category is selected, and with
/// `InvalidWeights` for negative or non-finite weights or when the selected
/// categories carry no weight at all.
pub fn effective_weights(
    weights: &CategoryWeights,
    scope: ScopeSelection,
) -> Result<CategoryWeights, ScoreError> {
    scope.validate()?;

    for category in Category::ALL {
        let weight = weights.get(category);
        if !weight.is_finite() || weight < 0.0 {
            return Err(ScoreError::InvalidWeights(format!(
                "{} weight must be a non-negative number, got {}",
                category.label(),
                weight
            )));
        }
    }

    let total: f64 = Category::ALL
        .iter()
        .filter(|c| scope.includes(**c))
        .map(|c| weights.get(*c))
        .sum();

    if total <= 0.0 {
        return Err(ScoreError::InvalidWeights(
            "selected categories have a total weight of zero".to_string(),
        ));
    }

    let share = |category: Category| {
        if scope.includes(category) {
            weights.get(category) / total * 100.0
        } else {
            0.0
        }
    };

    Ok(CategoryWeights::new(
        share(Category::Composition),
        share(Category::Microstructure),
        share(Category::Properties),
    ))
}

/// Fold category scores into a record using the effective category weights.
pub fn combine(
    weights: &CategoryWeights,
    composition: f64,
    microstructure: f64,
    properties: f64,
) -> SimilarityScoreRecord {
    let overall = weighted_mean([
        (composition, weights.composition),
        (microstructure, weights.microstructure),
        (properties, weights.properties),
    ]);

    SimilarityScoreRecord {
        overall: overall.clamp(0.0, 100.0),
        composition,
        microstructure,
        properties,
    }
}
