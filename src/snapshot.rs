//! Deterministic binary codec for whole-index snapshots.
//!
//! An index serializes as one `postcard` record holding, in order, the
//! postings, the document entries and the analyzer configuration. Every
//! map is written as a sorted vector so the bytes depend only on the index
//! state, keeping byte-for-byte regression tests possible.
//!
//! Decoding re-validates the structural invariants between postings and
//! documents; any violation fails with
//! [`SnapshotError::CorruptSnapshot`](crate::error::SnapshotError).

use crate::analysis::{Analyzer, AnalyzerKind, Settings};
use crate::document::{Document, DocumentEntry, TermFrequency};
use crate::error::SnapshotError;
use crate::index::{DocumentMap, Index, Postings};
use crate::suggest::FuzzyConfig;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Tolerance when checking the cached `terms_count` against the summed
/// frequencies of a decoded document.
const TERMS_COUNT_EPSILON: f64 = 1e-9;

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    postings: Vec<(String, Vec<String>)>,
    documents: Vec<DocumentRecord>,
    analyzer: AnalyzerRecord,
    fuzzy: Option<FuzzyConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentRecord {
    id: String,
    text: String,
    terms_count: f64,
    frequencies: Vec<(String, f64)>,
}

/// Discriminated analyzer description. This doubles as the codec's
/// "registry" of serializable analyzer variants: adding a variant means
/// extending [`AnalyzerKind`], nothing is registered at runtime.
#[derive(Debug, Serialize, Deserialize)]
struct AnalyzerRecord {
    kind: AnalyzerKind,
    stopwords: Vec<String>,
    synonyms: Vec<(String, String)>,
    stemmer: String,
}

/// Serialize an index. The state is deep-copied under the index's read
/// lock; encoding happens on the copy.
pub fn encode(index: &Index) -> Result<Vec<u8>, SnapshotError> {
    let (postings, documents) = index.export_state();

    let mut postings: Vec<(String, Vec<String>)> = postings.into_iter().collect();
    postings.sort_by(|a, b| a.0.cmp(&b.0));

    let mut documents: Vec<DocumentRecord> = documents
        .into_values()
        .map(|entry| {
            let mut frequencies: Vec<(String, f64)> = entry
                .frequencies
                .iter()
                .map(|(term, count)| (term.to_string(), count))
                .collect();
            frequencies.sort_by(|a, b| a.0.cmp(&b.0));
            DocumentRecord {
                id: entry.document.id().to_string(),
                text: entry.document.text().to_string(),
                terms_count: entry.terms_count,
                frequencies,
            }
        })
        .collect();
    documents.sort_by(|a, b| a.id.cmp(&b.id));

    let analyzer = index.analyzer();
    let mut stopwords = analyzer.stopwords();
    stopwords.sort();
    let mut synonyms = analyzer.synonyms();
    synonyms.sort();

    let record = IndexRecord {
        postings,
        documents,
        analyzer: AnalyzerRecord {
            kind: analyzer.kind(),
            stopwords,
            synonyms,
            stemmer: analyzer.stemmer_name().to_string(),
        },
        fuzzy: index.fuzzy_config(),
    };

    Ok(postcard::to_stdvec(&record)?)
}

/// Deserialize an index, re-validating all structural invariants.
pub fn decode(bytes: &[u8]) -> Result<Index, SnapshotError> {
    let record: IndexRecord = postcard::from_bytes(bytes)?;
    validate(&record)?;

    let settings = Settings::from_stemmed(
        record.analyzer.stopwords.into_iter().collect(),
        record.analyzer.synonyms.into_iter().collect(),
        &record.analyzer.stemmer,
    )
    .map_err(|err| SnapshotError::corrupt(err.to_string()))?;
    let analyzer = Analyzer::new(record.analyzer.kind, settings);

    let postings: Postings = record.postings.into_iter().collect();
    let documents: DocumentMap = record
        .documents
        .into_iter()
        .map(|doc| {
            let frequencies =
                TermFrequency::from_counts(doc.frequencies.into_iter().collect());
            let entry = DocumentEntry {
                document: Document::new(doc.id.clone(), doc.text),
                terms_count: doc.terms_count,
                frequencies,
            };
            (doc.id, entry)
        })
        .collect();

    Ok(Index::from_parts(analyzer, record.fuzzy, postings, documents))
}

/// Check the record restores a consistent index:
/// every posting entry is backed by a positive frequency, every frequency
/// term is posted, postings are duplicate-free and non-empty, and each
/// cached terms_count matches its summed frequencies.
fn validate(record: &IndexRecord) -> Result<(), SnapshotError> {
    let mut frequencies: AHashMap<&str, AHashMap<&str, f64>> = AHashMap::new();
    for doc in &record.documents {
        let by_term: AHashMap<&str, f64> = doc
            .frequencies
            .iter()
            .map(|(term, count)| (term.as_str(), *count))
            .collect();
        if by_term.len() != doc.frequencies.len() {
            return Err(SnapshotError::corrupt(format!(
                "document '{}' repeats a frequency term",
                doc.id
            )));
        }

        let sum: f64 = by_term.values().sum();
        if (sum - doc.terms_count).abs() > TERMS_COUNT_EPSILON {
            return Err(SnapshotError::corrupt(format!(
                "document '{}' declares terms_count {} but frequencies sum to {}",
                doc.id, doc.terms_count, sum
            )));
        }

        if frequencies.insert(doc.id.as_str(), by_term).is_some() {
            return Err(SnapshotError::corrupt(format!(
                "duplicate document id '{}'",
                doc.id
            )));
        }
    }

    let mut posted: AHashMap<&str, AHashSet<&str>> = AHashMap::new();
    for (term, ids) in &record.postings {
        if ids.is_empty() {
            return Err(SnapshotError::corrupt(format!(
                "term '{term}' has an empty posting"
            )));
        }

        let id_set: AHashSet<&str> = ids.iter().map(String::as_str).collect();
        if id_set.len() != ids.len() {
            return Err(SnapshotError::corrupt(format!(
                "term '{term}' posts a document more than once"
            )));
        }

        for id in &id_set {
            let positive = frequencies
                .get(id)
                .and_then(|by_term| by_term.get(term.as_str()))
                .is_some_and(|count| *count > 0.0);
            if !positive {
                return Err(SnapshotError::corrupt(format!(
                    "term '{term}' posts document '{id}' without a positive frequency"
                )));
            }
        }

        if posted.insert(term.as_str(), id_set).is_some() {
            return Err(SnapshotError::corrupt(format!(
                "duplicate posting term '{term}'"
            )));
        }
    }

    for (id, by_term) in &frequencies {
        for term in by_term.keys() {
            let listed = posted.get(term).is_some_and(|ids| ids.contains(id));
            if !listed {
                return Err(SnapshotError::corrupt(format!(
                    "document '{id}' counts term '{term}' but is not posted under it"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{IdfWeight, MinMatchFilter, TfIdfRanker, TfWeight};
    use assert2::check;

    fn sample_index() -> Index {
        let settings =
            Settings::new(["the"], AHashMap::new(), "english").unwrap();
        let index = Index::new(Analyzer::new(AnalyzerKind::Simple, settings));
        for (id, text) in [
            ("1", "the first example example"),
            ("2", "another cool example"),
            ("3", "another example"),
            ("4", "last"),
        ] {
            index.add(Document::new(id, text)).unwrap();
        }
        index
    }

    fn base_record() -> IndexRecord {
        IndexRecord {
            postings: vec![("text".to_string(), vec!["1".to_string()])],
            documents: vec![DocumentRecord {
                id: "1".to_string(),
                text: "text".to_string(),
                terms_count: 1.0,
                frequencies: vec![("text".to_string(), 1.0)],
            }],
            analyzer: AnalyzerRecord {
                kind: AnalyzerKind::Simple,
                stopwords: vec![],
                synonyms: vec![],
                stemmer: String::new(),
            },
            fuzzy: None,
        }
    }

    fn decode_record(record: &IndexRecord) -> Result<Index, SnapshotError> {
        decode(&postcard::to_stdvec(record).unwrap())
    }

    #[test]
    fn round_trip_preserves_documents_and_searches() {
        let index = sample_index();
        let restored = decode(&encode(&index).unwrap()).unwrap();

        check!(restored.length() == index.length());
        check!(restored.analyzer().kind() == AnalyzerKind::Simple);
        check!(restored.analyzer().stopwords() == vec!["the".to_string()]);
        check!(restored.analyzer().stemmer_name() == "english");
        for id in ["1", "2", "3", "4"] {
            check!(restored.get(id) == index.get(id));
            check!(restored.term_frequencies(id) == index.term_frequencies(id));
        }

        let ranker = TfIdfRanker::new(TfWeight::Default, IdfWeight::Default);
        let original = index.search("cool example", Some(MinMatchFilter::AND), Some(ranker));
        let reloaded = restored.search("cool example", Some(MinMatchFilter::AND), Some(ranker));
        check!(original.len() == reloaded.len());
        for (a, b) in original.iter().zip(&reloaded) {
            check!(a.document.id() == b.document.id());
            check!(a.score == b.score);
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let index = sample_index();
        let first = encode(&index).unwrap();
        let second = encode(&index).unwrap();
        check!(first == second);

        let reencoded = encode(&decode(&first).unwrap()).unwrap();
        check!(reencoded == first);
    }

    #[test]
    fn fuzzy_config_round_trips() {
        let config = FuzzyConfig {
            depth: 2,
            min_occurrences: 5.0,
        };
        let index = Index::with_fuzzy(Analyzer::simple(), config);
        index.add(Document::new("1", "hello world")).unwrap();

        let restored = decode(&encode(&index).unwrap()).unwrap();
        check!(restored.fuzzy_config() == Some(config));
    }

    #[test]
    fn valid_record_decodes() {
        check!(decode_record(&base_record()).is_ok());
    }

    #[test]
    fn posting_without_backing_document_is_corrupt() {
        let mut record = base_record();
        record.postings.push(("ghost".to_string(), vec!["9".to_string()]));
        check!(matches!(
            decode_record(&record),
            Err(SnapshotError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn unposted_frequency_term_is_corrupt() {
        let mut record = base_record();
        record.documents[0].frequencies.push(("extra".to_string(), 1.0));
        record.documents[0].terms_count = 2.0;
        check!(matches!(
            decode_record(&record),
            Err(SnapshotError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn empty_posting_is_corrupt() {
        let mut record = base_record();
        record.postings.push(("void".to_string(), vec![]));
        check!(matches!(
            decode_record(&record),
            Err(SnapshotError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn repeated_posting_id_is_corrupt() {
        let mut record = base_record();
        record.postings[0].1.push("1".to_string());
        check!(matches!(
            decode_record(&record),
            Err(SnapshotError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn terms_count_mismatch_is_corrupt() {
        let mut record = base_record();
        record.documents[0].terms_count = 7.0;
        check!(matches!(
            decode_record(&record),
            Err(SnapshotError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let index = sample_index();
        let bytes = encode(&index).unwrap();
        check!(decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
