//! Boolean candidate filtering by query-term match count.

use crate::document::DocumentId;
use ahash::AHashMap;

/// Candidate filter that keeps documents matching at least `min_count`
/// distinct query terms.
///
/// The effective threshold is clamped to the query length, so
/// [`MinMatchFilter::AND`] requires every query term without knowing the
/// query size up front. Constructing with a non-positive count yields
/// `None`, which callers treat as "no filter": every document is ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMatchFilter {
    min_count: usize,
}

impl MinMatchFilter {
    /// Match any single query term.
    pub const OR: Self = Self { min_count: 1 };

    /// Match all query terms.
    pub const AND: Self = Self {
        min_count: usize::MAX,
    };

    /// A filter requiring at least `min_count` matching terms, or `None`
    /// when `min_count` is not positive.
    pub fn new(min_count: i64) -> Option<Self> {
        if min_count <= 0 {
            return None;
        }
        Some(Self {
            min_count: usize::try_from(min_count).unwrap_or(usize::MAX),
        })
    }

    /// Collect the ids of documents whose posting match count reaches the
    /// threshold. Output order follows map iteration and carries no
    /// meaning.
    pub fn apply(
        &self,
        terms: &[String],
        postings: &AHashMap<String, Vec<DocumentId>>,
    ) -> Vec<DocumentId> {
        let mut match_counts: AHashMap<&DocumentId, usize> = AHashMap::new();
        for term in terms {
            if let Some(ids) = postings.get(term) {
                for id in ids {
                    *match_counts.entry(id).or_insert(0) += 1;
                }
            }
        }

        let threshold = self.min_count.min(terms.len());
        match_counts
            .into_iter()
            .filter(|(_, count)| *count >= threshold)
            .map(|(id, _)| id.clone())
            .collect()
    }
}
