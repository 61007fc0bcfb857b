//! TF-IDF scoring over a candidate set.

use crate::document::{DocumentEntry, DocumentId, ScoredDocument};
use ahash::AHashMap;

/// Term-frequency weighting scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TfWeight {
    /// Relative frequency: `count / terms_count`.
    #[default]
    Default,
    /// Sub-linear scaling: `log10(1 + count)`.
    Log,
}

/// Inverse-document-frequency weighting scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdfWeight {
    /// `log10(N / n_t)`, zero when no candidate contains the term.
    #[default]
    Default,
    /// `1 + log10((1 + N) / (1 + n_t))`, always at least one.
    Smooth,
}

/// Ranks candidates by summed `tf(t, d) * idf(t)` over the query terms.
///
/// Idf values are computed once per query term against the candidate set.
/// Query terms are visited in analyzed order; a term repeated in the query
/// contributes once per occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TfIdfRanker {
    tf_weight: TfWeight,
    idf_weight: IdfWeight,
}

impl TfIdfRanker {
    pub const fn new(tf_weight: TfWeight, idf_weight: IdfWeight) -> Self {
        Self {
            tf_weight,
            idf_weight,
        }
    }

    /// Score and sort the candidate set, highest score first. Tie order is
    /// unspecified.
    pub fn rank(
        &self,
        terms: &[String],
        candidates: &AHashMap<DocumentId, DocumentEntry>,
    ) -> Vec<ScoredDocument> {
        let idf = self.terms_idf(terms, candidates);

        let mut scored: Vec<ScoredDocument> = candidates
            .values()
            .map(|entry| ScoredDocument {
                document: entry.document.clone(),
                score: self.document_score(terms, entry, &idf),
            })
            .collect();

        scored.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Idf for each distinct query term over the candidate set.
    fn terms_idf<'t>(
        &self,
        terms: &'t [String],
        candidates: &AHashMap<DocumentId, DocumentEntry>,
    ) -> AHashMap<&'t str, f64> {
        let mut idf = AHashMap::with_capacity(terms.len());
        for term in terms {
            idf.entry(term.as_str())
                .or_insert_with(|| term_idf(term, candidates, self.idf_weight));
        }
        idf
    }

    fn document_score(
        &self,
        terms: &[String],
        entry: &DocumentEntry,
        idf: &AHashMap<&str, f64>,
    ) -> f64 {
        let mut score = 0.0;
        for term in terms {
            let count = entry.frequencies.get(term);
            let tf = match self.tf_weight {
                TfWeight::Default => {
                    if entry.terms_count > 0.0 {
                        count / entry.terms_count
                    } else {
                        0.0
                    }
                }
                TfWeight::Log => (1.0 + count).log10(),
            };
            score += tf * idf.get(term.as_str()).copied().unwrap_or(0.0);
        }
        score
    }
}

/// Count candidates containing the term and apply the idf formula.
fn term_idf(
    term: &str,
    candidates: &AHashMap<DocumentId, DocumentEntry>,
    scheme: IdfWeight,
) -> f64 {
    let containing = candidates
        .values()
        .filter(|entry| entry.frequencies.get(term) > 0.0)
        .count() as f64;
    let total = candidates.len() as f64;

    match scheme {
        IdfWeight::Default => {
            if containing > 0.0 {
                (total / containing).log10()
            } else {
                0.0
            }
        }
        IdfWeight::Smooth => 1.0 + ((1.0 + total) / (1.0 + containing)).log10(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, TermFrequency};
    use assert2::check;

    const EPSILON: f64 = 1e-6;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn entry(id: &str, terms: &[&str]) -> (DocumentId, DocumentEntry) {
        let frequencies =
            TermFrequency::from_terms(terms.iter().map(|t| (*t).to_string()));
        (
            id.to_string(),
            DocumentEntry::new(Document::new(id, ""), frequencies),
        )
    }

    fn corpus() -> AHashMap<DocumentId, DocumentEntry> {
        [
            entry("1", &["the", "first", "example", "example"]),
            entry("2", &["another", "cool", "example"]),
            entry("3", &["another", "example"]),
            entry("4", &["last"]),
        ]
        .into_iter()
        .collect()
    }

    fn query() -> Vec<String> {
        ["great", "first", "example"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[test]
    fn default_weights_rank_and_score() {
        let ranker = TfIdfRanker::new(TfWeight::Default, IdfWeight::Default);
        let scores = ranker.rank(&query(), &corpus());

        let expected = [("1", 0.212984), ("3", 0.062469), ("2", 0.041646), ("4", 0.0)];
        check!(scores.len() == expected.len());
        for (scored, (id, score)) in scores.iter().zip(expected) {
            check!(scored.document.id() == id);
            check!(close(scored.score, score), "doc {id}: {}", scored.score);
        }
    }

    #[test]
    fn log_smooth_weights_rank_and_score() {
        let ranker = TfIdfRanker::new(TfWeight::Log, IdfWeight::Smooth);
        let scores = ranker.rank(&query(), &corpus());

        // Docs 2 and 3 tie, so compare score vectors rather than id order.
        let expected = [0.944181, 0.330203, 0.330203, 0.0];
        check!(scores.len() == expected.len());
        for (scored, score) in scores.iter().zip(expected) {
            check!(close(scored.score, score), "got {}", scored.score);
        }
        check!(scores[0].document.id() == "1");
        check!(scores[3].document.id() == "4");
    }

    #[test]
    fn duplicate_query_terms_count_per_occurrence() {
        let ranker = TfIdfRanker::default();
        let once: Vec<String> = vec!["first".to_string()];
        let twice: Vec<String> = vec!["first".to_string(), "first".to_string()];

        let score_of = |results: Vec<crate::document::ScoredDocument>| {
            results
                .into_iter()
                .find(|scored| scored.document.id() == "1")
                .unwrap()
                .score
        };

        let single = score_of(ranker.rank(&once, &corpus()));
        let double = score_of(ranker.rank(&twice, &corpus()));
        check!(close(double, single * 2.0));
    }

    #[test]
    fn unknown_terms_score_zero_under_default_idf() {
        let ranker = TfIdfRanker::default();
        let terms = vec!["nonexistent".to_string()];
        let scores = ranker.rank(&terms, &corpus());
        check!(scores.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn smooth_idf_is_at_least_one() {
        let idf = term_idf("nonexistent", &corpus(), IdfWeight::Smooth);
        check!(idf >= 1.0);
    }

    #[test]
    fn empty_candidates_rank_to_empty() {
        let ranker = TfIdfRanker::default();
        check!(ranker.rank(&query(), &AHashMap::new()).is_empty());
    }
}
