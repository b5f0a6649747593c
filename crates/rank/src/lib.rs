//! Ranking of prior-art candidates.
//!
//! Takes a target patent and a corpus, scores every eligible candidate and
//! keeps the best matches above a minimum overall similarity.

use priorart_model::{PatentMaterialData, ScopeSelection, ScoreError, SimilarityScoreRecord};
use priorart_score::{effective_weights, Scorer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Configuration for the ranking step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// Minimum overall similarity (0-100) a candidate needs to be kept
    pub min_overall: f64,
    /// Number of matches kept; `None` keeps all of them
    pub top_k: Option<usize>,
    /// Score candidates on the rayon thread pool
    pub parallel: bool,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            min_overall: 0.0,
            top_k: Some(3),
            parallel: true,
        }
    }
}

/// A candidate that made it into the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    /// 1-based position in the ranking
    pub rank: usize,
    pub patent: PatentMaterialData,
    pub scores: SimilarityScoreRecord,
}

/// Candidates eligible as prior art for `target`.
///
/// Drops the target itself and anything published on or after the target's
/// publication date. ISO dates compare as strings; a candidate is kept when
/// either date is unknown.
pub fn select_prior_art(
    target: &PatentMaterialData,
    corpus: Vec<PatentMaterialData>,
) -> Vec<PatentMaterialData> {
    corpus
        .into_iter()
        .filter(|candidate| candidate.id != target.id)
        .filter(|candidate| {
            match (&candidate.publication_date, &target.publication_date) {
                (Some(candidate_date), Some(target_date)) => {
                    candidate_date.as_str() < target_date.as_str()
                }
                _ => true,
            }
        })
        .collect()
}

/// Score every candidate against `target`, preserving candidate order.
pub fn score_candidates(
    scorer: &Scorer,
    target: &PatentMaterialData,
    candidates: &[PatentMaterialData],
    scope: ScopeSelection,
    parallel: bool,
) -> Result<Vec<SimilarityScoreRecord>, ScoreError> {
    // Reject a bad scope even when there is nothing to score.
    effective_weights(&scorer.config().category_weights, scope)?;

    if parallel {
        candidates
            .par_iter()
            .map(|candidate| scorer.score(target, candidate, scope))
            .collect()
    } else {
        candidates
            .iter()
            .map(|candidate| scorer.score(target, candidate, scope))
            .collect()
    }
}

/// Rank candidates by similarity to `target`.
///
/// Order is overall score descending, then composition score descending, then
/// corpus order.
pub fn rank(
    scorer: &Scorer,
    target: &PatentMaterialData,
    candidates: Vec<PatentMaterialData>,
    scope: ScopeSelection,
    config: &RankConfig,
) -> Result<Vec<RankedMatch>, ScoreError> {
    let records = score_candidates(scorer, target, &candidates, scope, config.parallel)?;
    let total = candidates.len();

    let mut hits: Vec<RankedMatch> = candidates
        .into_iter()
        .zip(records)
        .filter(|(_, scores)| scores.overall >= config.min_overall)
        .map(|(patent, scores)| RankedMatch {
            rank: 0,
            patent,
            scores,
        })
        .collect();
    let above_threshold = hits.len();

    // sort_by is stable, so equal scores keep corpus order
    hits.sort_by(|a, b| compare_matches(&a.scores, &b.scores));

    if let Some(top_k) = config.top_k {
        hits.truncate(top_k);
    }
    for (i, hit) in hits.iter_mut().enumerate() {
        hit.rank = i + 1;
    }

    tracing::debug!(
        target_id = %target.id,
        candidates = total,
        above_threshold,
        kept = hits.len(),
        min_overall = config.min_overall,
        "Ranked candidates"
    );

    Ok(hits)
}

fn compare_matches(a: &SimilarityScoreRecord, b: &SimilarityScoreRecord) -> Ordering {
    b.overall
        .total_cmp(&a.overall)
        .then_with(|| b.composition.total_cmp(&a.composition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_patent(id: &str, carbon: &str, date: &str) -> PatentMaterialData {
        PatentMaterialData::new(id)
            .with_element("C", carbon)
            .with_property("tensileStrength", "500-600 MPa")
            .with_publication_date(date)
    }

    fn target() -> PatentMaterialData {
        make_patent("TARGET", "0.10-0.20%", "2020-01-01")
    }

    fn ids(hits: &[RankedMatch]) -> Vec<&str> {
        hits.iter().map(|h| h.patent.id.as_str()).collect()
    }

    #[test]
    fn test_select_prior_art() {
        let corpus = vec![
            target(),
            make_patent("OLDER", "0.1%", "2018-06-30"),
            make_patent("NEWER", "0.1%", "2021-03-01"),
            make_patent("SAME-DAY", "0.1%", "2020-01-01"),
            PatentMaterialData::new("UNDATED"),
        ];
        let selected = select_prior_art(&target(), corpus);
        let selected_ids: Vec<_> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(selected_ids, vec!["OLDER", "UNDATED"]);
    }

    #[test]
    fn test_rank_orders_by_overall() {
        let candidates = vec![
            make_patent("FAR", "0.50-0.60%", "2010-01-01"),
            make_patent("EXACT", "0.10-0.20%", "2011-01-01"),
            make_patent("HALF", "0.15-0.25%", "2012-01-01"),
        ];
        let hits = rank(
            &Scorer::default(),
            &target(),
            candidates,
            ScopeSelection::all(),
            &RankConfig::default(),
        )
        .unwrap();

        assert_eq!(ids(&hits), vec!["EXACT", "HALF", "FAR"]);
        assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_threshold_and_top_k() {
        let candidates = vec![
            make_patent("A", "0.10-0.20%", "2010-01-01"),
            make_patent("B", "0.50-0.60%", "2010-01-01"),
            make_patent("C", "0.10-0.20%", "2010-01-01"),
            make_patent("D", "0.12-0.22%", "2010-01-01"),
            make_patent("E", "0.10-0.20%", "2010-01-01"),
        ];
        let config = RankConfig {
            min_overall: 60.0,
            top_k: Some(3),
            parallel: false,
        };
        let hits = rank(&Scorer::default(), &target(), candidates, ScopeSelection::all(), &config).unwrap();

        // Ties keep corpus order; B falls below the threshold and D is cut by top-k.
        assert_eq!(ids(&hits), vec!["A", "C", "E"]);
        assert!(hits.iter().all(|h| h.scores.overall >= 60.0));
    }

    #[test]
    fn test_ties_broken_by_composition() {
        // Composition-heavy candidate vs property-heavy candidate with equal overall.
        let target = PatentMaterialData::new("T")
            .with_element("C", "0-1")
            .with_property("hardness", "0-1");
        let by_properties = PatentMaterialData::new("PROPS")
            .with_element("C", "0.5-1.5")
            .with_property("hardness", "0-1");
        let by_composition = PatentMaterialData::new("COMP")
            .with_element("C", "0-1")
            .with_property("hardness", "0.5-1.5");

        let weights = priorart_model::CategoryWeights::new(50.0, 0.0, 50.0);
        let scorer = Scorer::new(priorart_score::ScoringConfig {
            category_weights: weights,
            ..Default::default()
        });
        let config = RankConfig {
            top_k: None,
            ..Default::default()
        };
        let hits = rank(
            &scorer,
            &target,
            vec![by_properties, by_composition],
            ScopeSelection::all(),
            &config,
        )
        .unwrap();

        assert_eq!(hits[0].scores.overall, hits[1].scores.overall);
        assert_eq!(ids(&hits), vec!["COMP", "PROPS"]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let candidates: Vec<_> = (0..50)
            .map(|i| make_patent(&format!("P{i}"), &format!("0.{:02}-0.{:02}%", i, i + 10), "2000-01-01"))
            .collect();
        let scorer = Scorer::default();
        let sequential =
            score_candidates(&scorer, &target(), &candidates, ScopeSelection::all(), false).unwrap();
        let parallel =
            score_candidates(&scorer, &target(), &candidates, ScopeSelection::all(), true).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_invalid_scope_with_empty_corpus() {
        let scope = ScopeSelection {
            composition: false,
            microstructure: false,
            properties: false,
        };
        let result = rank(&Scorer::default(), &target(), Vec::new(), scope, &RankConfig::default());
        assert_eq!(result, Err(ScoreError::InvalidScope));
    }
}
