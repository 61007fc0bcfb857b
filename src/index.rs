//! Concurrent inverted index: term postings plus per-document statistics.

use crate::analysis::Analyzer;
use crate::document::{Document, DocumentEntry, DocumentId, ScoredDocument, TermFrequency};
use crate::error::IndexError;
use crate::search::{MinMatchFilter, TfIdfRanker};
use crate::suggest::{self, FuzzyConfig, TermSuggestions};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::path::Path;

/// Term to ids of the documents containing it. Id order within a posting
/// is insertion order and carries no meaning; ids never repeat.
pub(crate) type Postings = AHashMap<String, Vec<DocumentId>>;

/// Document id to everything stored about that document.
pub(crate) type DocumentMap = AHashMap<DocumentId, DocumentEntry>;

/// The two maps guarded by the index lock. They are kept consistent with
/// each other: every posting entry is backed by a positive frequency in
/// the referenced document, and vice versa.
#[derive(Debug, Default)]
struct IndexState {
    postings: Postings,
    documents: DocumentMap,
}

#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Create,
    Update,
    Upsert,
}

/// A single searchable index.
///
/// All document operations are callable from multiple threads. Reads take
/// shared access, writes exclusive access; the analyzer is immutable and
/// used without the lock.
#[derive(Debug)]
pub struct Index {
    analyzer: Analyzer,
    fuzzy: Option<FuzzyConfig>,
    state: RwLock<IndexState>,
}

impl Index {
    /// Create an empty index bound to `analyzer` for its lifetime.
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            fuzzy: None,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Create an empty index with spell-suggestion support.
    pub fn with_fuzzy(analyzer: Analyzer, fuzzy: FuzzyConfig) -> Self {
        Self {
            analyzer,
            fuzzy: Some(fuzzy),
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Reassemble an index from decoded snapshot state.
    pub(crate) fn from_parts(
        analyzer: Analyzer,
        fuzzy: Option<FuzzyConfig>,
        postings: Postings,
        documents: DocumentMap,
    ) -> Self {
        Self {
            analyzer,
            fuzzy,
            state: RwLock::new(IndexState {
                postings,
                documents,
            }),
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub const fn fuzzy_config(&self) -> Option<FuzzyConfig> {
        self.fuzzy
    }

    /// Insert a new document; fails if the id is already present.
    pub fn add(&self, document: Document) -> Result<(), IndexError> {
        self.write(document, WriteMode::Create)
    }

    /// Replace an existing document's text; fails if the id is absent.
    pub fn update(&self, document: Document) -> Result<(), IndexError> {
        self.write(document, WriteMode::Update)
    }

    /// Insert or replace.
    pub fn upsert(&self, document: Document) -> Result<(), IndexError> {
        self.write(document, WriteMode::Upsert)
    }

    fn write(&self, document: Document, mode: WriteMode) -> Result<(), IndexError> {
        // Analysis is a pure function of the text and the (immutable)
        // settings, so it runs before the lock is taken; readers are never
        // blocked on tokenization.
        let terms = self.analyzer.analyze(document.text());
        let frequencies = TermFrequency::from_terms(terms);

        let mut state = self.state.write();
        let id = document.id().to_string();

        match (mode, state.documents.contains_key(&id)) {
            (WriteMode::Create, true) => {
                return Err(IndexError::DuplicateDocument { id });
            }
            (WriteMode::Update, false) => {
                return Err(IndexError::NonExistentDocument { id });
            }
            // Replacement: drop the old postings so the rebuilt entry is
            // the only reference to this id.
            (WriteMode::Update | WriteMode::Upsert, true) => {
                Self::delete_nolock(&mut state, &id)?;
            }
            _ => {}
        }

        for (term, _) in frequencies.iter() {
            state
                .postings
                .entry(term.to_string())
                .or_default()
                .push(id.clone());
        }
        state
            .documents
            .insert(id, DocumentEntry::new(document, frequencies));
        Ok(())
    }

    /// Remove a document; fails if the id is absent.
    pub fn delete(&self, id: &str) -> Result<(), IndexError> {
        let mut state = self.state.write();
        Self::delete_nolock(&mut state, id)
    }

    /// Delete with the write lock already held. The lock is not reentrant,
    /// so upsert and update route through this instead of [`Self::delete`].
    fn delete_nolock(state: &mut IndexState, id: &str) -> Result<(), IndexError> {
        let entry = state
            .documents
            .remove(id)
            .ok_or_else(|| IndexError::NonExistentDocument { id: id.to_string() })?;

        for (term, _) in entry.frequencies.iter() {
            if let Some(ids) = state.postings.get_mut(term) {
                ids.retain(|doc_id| doc_id != id);
                if ids.is_empty() {
                    state.postings.remove(term);
                }
            }
        }
        Ok(())
    }

    /// Fetch a document by id.
    pub fn get(&self, id: &str) -> Option<Document> {
        self.state
            .read()
            .documents
            .get(id)
            .map(|entry| entry.document.clone())
    }

    /// Current document count.
    pub fn length(&self) -> usize {
        self.state.read().documents.len()
    }

    /// A document's frequency map, empty when the document is absent.
    pub fn term_frequencies(&self, id: &str) -> TermFrequency {
        self.state
            .read()
            .documents
            .get(id)
            .map(|entry| entry.frequencies.clone())
            .unwrap_or_default()
    }

    /// Run the search pipeline: analyze the query, collect candidates and
    /// rank them. Without a filter every document is a candidate; without
    /// a ranker candidates come back with score zero in arbitrary order.
    pub fn search(
        &self,
        query: &str,
        filter: Option<MinMatchFilter>,
        ranker: Option<TfIdfRanker>,
    ) -> Vec<ScoredDocument> {
        let terms = self.analyzer.analyze(query);
        let candidates = self.collect_candidates(&terms, filter);

        match ranker {
            Some(ranker) => ranker.rank(&terms, &candidates),
            None => candidates
                .into_values()
                .map(|entry| ScoredDocument {
                    document: entry.document,
                    score: 0.0,
                })
                .collect(),
        }
    }

    /// Capture the candidate subset under the read lock so ranking works
    /// on one consistent snapshot of the index.
    fn collect_candidates(
        &self,
        terms: &[String],
        filter: Option<MinMatchFilter>,
    ) -> DocumentMap {
        let state = self.state.read();
        match filter {
            None => state.documents.clone(),
            Some(filter) => filter
                .apply(terms, &state.postings)
                .into_iter()
                .filter_map(|id| {
                    let entry = state.documents.get(&id).cloned()?;
                    Some((id, entry))
                })
                .collect(),
        }
    }

    /// Spelling suggestions for each surface term, using the vocabulary of
    /// the live index. Empty when the index has no fuzzy configuration.
    pub fn suggest(&self, terms: &[String], limit: usize) -> Vec<TermSuggestions> {
        let Some(config) = self.fuzzy else {
            return Vec::new();
        };

        let vocabulary = {
            let state = self.state.read();
            let mut vocabulary: AHashMap<String, f64> = AHashMap::new();
            for entry in state.documents.values() {
                for (term, count) in entry.frequencies.iter() {
                    *vocabulary.entry(term.to_string()).or_insert(0.0) += count;
                }
            }
            vocabulary
        };

        suggest::suggest_terms(&vocabulary, config, terms, limit)
    }

    /// Deep-copy the index state under the read lock. Serialization then
    /// happens on the copy, keeping the lock window short.
    pub(crate) fn export_state(&self) -> (Postings, DocumentMap) {
        let state = self.state.read();
        (state.postings.clone(), state.documents.clone())
    }
}

/// Build an index from a directory of text files, one document per file
/// with the file path as its id. Unreadable files are logged and skipped.
pub fn load_directory(dir: &Path, analyzer: Analyzer) -> std::io::Result<Index> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }

    let index = Index::new(analyzer);
    std::thread::scope(|scope| {
        for path in &paths {
            let index = &index;
            scope.spawn(move || match std::fs::read_to_string(path) {
                Ok(text) => {
                    let id = path.display().to_string();
                    if let Err(err) = index.add(Document::new(id, text)) {
                        tracing::warn!(path = %path.display(), error = %err, "Skipping file");
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Unable to read file");
                }
            });
        }
    });

    Ok(index)
}
