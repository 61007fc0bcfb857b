//! Fuzzy spelling suggestions drawn from an index's vocabulary.
//!
//! The model is intentionally derived: candidate terms and their occurrence
//! counts come straight from the live document map, so snapshots only need
//! to persist the configuration.

use ahash::AHashMap;
use rapidfuzz::distance::levenshtein;
use serde::{Deserialize, Serialize};

/// Spell-suggestion tuning, fixed when the index is created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// Maximum edit distance between a query term and a suggestion.
    pub depth: usize,
    /// Total occurrences a vocabulary term needs before it is offered.
    pub min_occurrences: f64,
}

/// Suggestions for one query term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermSuggestions {
    pub term: String,
    pub suggestions: Vec<String>,
}

/// Rank vocabulary terms within `config.depth` edits of each query term.
/// Closer matches come first; equal distances order by occurrence count
/// (descending) and then by term so results are deterministic.
pub(crate) fn suggest_terms(
    vocabulary: &AHashMap<String, f64>,
    config: FuzzyConfig,
    terms: &[String],
    limit: usize,
) -> Vec<TermSuggestions> {
    terms
        .iter()
        .map(|term| {
            let mut matches: Vec<(usize, f64, &String)> = vocabulary
                .iter()
                .filter(|(_, occurrences)| **occurrences >= config.min_occurrences)
                .filter_map(|(candidate, occurrences)| {
                    let distance = levenshtein::distance_with_args(
                        term.chars(),
                        candidate.chars(),
                        &levenshtein::Args::default().score_cutoff(config.depth),
                    )?;
                    Some((distance, *occurrences, candidate))
                })
                .collect();

            matches.sort_by(|a, b| {
                a.0.cmp(&b.0)
                    .then_with(|| b.1.total_cmp(&a.1))
                    .then_with(|| a.2.cmp(b.2))
            });

            TermSuggestions {
                term: term.clone(),
                suggestions: matches
                    .into_iter()
                    .take(limit)
                    .map(|(_, _, candidate)| candidate.clone())
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    fn vocabulary(entries: &[(&str, f64)]) -> AHashMap<String, f64> {
        entries
            .iter()
            .map(|(term, occurrences)| ((*term).to_string(), *occurrences))
            .collect()
    }

    const CONFIG: FuzzyConfig = FuzzyConfig {
        depth: 1,
        min_occurrences: 2.0,
    };

    #[test]
    fn suggests_close_frequent_terms() {
        let vocab = vocabulary(&[("more", 10.0), ("bore", 5.0), ("moose", 3.0)]);
        let result = suggest_terms(&vocab, CONFIG, &["mor".to_string()], 3);

        check!(result.len() == 1);
        check!(result[0].term == "mor");
        // "more" and "bore"... "bore" is two edits from "mor", so only
        // "more" qualifies at depth 1.
        check!(result[0].suggestions == vec!["more".to_string()]);
    }

    #[test]
    fn rare_terms_are_not_suggested() {
        let vocab = vocabulary(&[("more", 1.0)]);
        let result = suggest_terms(&vocab, CONFIG, &["mor".to_string()], 3);
        check!(result[0].suggestions.is_empty());
    }

    #[test]
    fn exact_match_ranks_first() {
        let vocab = vocabulary(&[("cat", 2.0), ("cats", 9.0)]);
        let result = suggest_terms(&vocab, CONFIG, &["cat".to_string()], 3);
        check!(
            result[0].suggestions == vec!["cat".to_string(), "cats".to_string()]
        );
    }

    #[test]
    fn equal_distance_orders_by_occurrences() {
        let vocab = vocabulary(&[("mot", 3.0), ("more", 7.0)]);
        let result = suggest_terms(&vocab, CONFIG, &["mor".to_string()], 3);
        check!(
            result[0].suggestions == vec!["more".to_string(), "mot".to_string()]
        );
    }

    #[test]
    fn limit_truncates() {
        let vocab = vocabulary(&[("mot", 3.0), ("more", 7.0), ("mork", 4.0)]);
        let result = suggest_terms(&vocab, CONFIG, &["mor".to_string()], 1);
        check!(result[0].suggestions == vec!["more".to_string()]);
    }
}
