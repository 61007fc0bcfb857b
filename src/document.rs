//! Documents and per-document term statistics.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Identifier of a document within one index.
pub type DocumentId = String;

/// An immutable piece of text identified by its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    text: String,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A document paired with its relevance score for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

/// Unordered mapping from term to its (absolute) count in one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermFrequency {
    counts: AHashMap<String, f64>,
}

impl TermFrequency {
    /// Count an analyzed term sequence.
    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut counts = AHashMap::new();
        for term in terms {
            *counts.entry(term.into()).or_insert(0.0) += 1.0;
        }
        Self { counts }
    }

    /// Wrap pre-computed counts, used when decoding a snapshot.
    pub(crate) const fn from_counts(counts: AHashMap<String, f64>) -> Self {
        Self { counts }
    }

    /// Count for a term, zero when absent.
    pub fn get(&self, term: &str) -> f64 {
        self.counts.get(term).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.counts.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> f64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.counts.iter().map(|(term, count)| (term.as_str(), *count))
    }

    /// The `n` terms with the largest counts, descending. Ties order by
    /// term so repeated calls agree. Returns every entry when `n` exceeds
    /// the map size.
    pub fn top(&self, n: usize) -> Vec<(String, f64)> {
        let n = n.min(self.counts.len());
        let mut heap: BinaryHeap<TopEntry<'_>> = self
            .counts
            .iter()
            .map(|(term, count)| TopEntry {
                count: *count,
                term,
            })
            .collect();

        let mut top = Vec::with_capacity(n);
        for _ in 0..n {
            let entry = heap.pop().expect("heap holds at least n entries");
            top.push((entry.term.to_string(), entry.count));
        }
        top
    }
}

/// Max-heap entry ordered by count, then by term for deterministic ties.
struct TopEntry<'a> {
    count: f64,
    term: &'a str,
}

impl Ord for TopEntry<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count
            .total_cmp(&other.count)
            .then_with(|| other.term.cmp(self.term))
    }
}

impl PartialOrd for TopEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TopEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TopEntry<'_> {}

/// Everything the index stores about one document.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub document: Document,
    /// Sum of all frequency counts, cached for tf normalization.
    pub terms_count: f64,
    pub frequencies: TermFrequency,
}

impl DocumentEntry {
    pub fn new(document: Document, frequencies: TermFrequency) -> Self {
        let terms_count = frequencies.total();
        Self {
            document,
            terms_count,
            frequencies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    fn terms(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn counts_terms() {
        let tf = TermFrequency::from_terms(terms(&["a", "b", "a", "a"]));
        check!(tf.get("a") == 3.0);
        check!(tf.get("b") == 1.0);
        check!(tf.get("c") == 0.0);
        check!(tf.len() == 2);
        check!(tf.total() == 4.0);
    }

    #[test]
    fn top_orders_by_count() {
        let query = terms(&["some2", "some2", "test3", "test3", "test3", "query1"]);
        let tf = TermFrequency::from_terms(query);

        let top = tf.top(20);
        check!(
            top == vec![
                ("test3".to_string(), 3.0),
                ("some2".to_string(), 2.0),
                ("query1".to_string(), 1.0),
            ]
        );

        let top = tf.top(2);
        check!(top.len() == 2);
        check!(top[0] == ("test3".to_string(), 3.0));
    }

    #[test]
    fn top_ties_are_deterministic() {
        let tf = TermFrequency::from_terms(terms(&["b", "a", "c"]));
        let first = tf.top(3);
        let second = tf.top(3);
        check!(first == second);
        check!(first[0].0 == "a");
    }

    #[test]
    fn entry_caches_terms_count() {
        let tf = TermFrequency::from_terms(terms(&["x", "x", "y"]));
        let entry = DocumentEntry::new(Document::new("1", "x x y"), tf);
        check!(entry.terms_count == 3.0);
    }
}
