//! Text analysis pipeline: tokenization, normalization and token filtering.
//!
//! An [`Analyzer`] turns raw text into the term sequence that gets indexed
//! and searched. Three tokenizer variants are supported; all of them feed
//! their tokens through the same filter chain, in this order:
//!
//! 1. Stem the token (when a stemmer is configured).
//! 2. Substitute the token if it is a key in the synonym map.
//! 3. Drop the token if it is in the stop-word set.
//!
//! Stop-words and synonym entries are themselves stemmed when settings are
//! built, so surface-form configuration keeps working after stemming.

use crate::error::AnalysisError;
use ahash::{AHashMap, AHashSet};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

/// Name of the only supported stemming algorithm (Porter, 1980).
pub const ENGLISH_STEMMER: &str = "english";

/// Tokenizer variant of an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyzerKind {
    /// Lowercase, then UAX #29 word segmentation keeping word-like segments.
    Standard,
    /// Lowercase, then split on anything that is not a letter, digit or
    /// apostrophe.
    Simple,
    /// Split on whitespace runs, no case folding.
    Whitespace,
}

impl AnalyzerKind {
    /// Display name, also used by the snapshot codec and the HTTP surface.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "StandardAnalyzer",
            Self::Simple => "SimpleAnalyzer",
            Self::Whitespace => "WhitespaceAnalyzer",
        }
    }

    /// Parse a display name back into a kind.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "StandardAnalyzer" => Some(Self::Standard),
            "SimpleAnalyzer" => Some(Self::Simple),
            "WhitespaceAnalyzer" => Some(Self::Whitespace),
            _ => None,
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token filter configuration shared by every analyzer variant.
///
/// Holds the stop-word set, the synonym map and the optional stemmer. All
/// stored terms are post-stem forms.
pub struct Settings {
    stopwords: AHashSet<String>,
    synonyms: AHashMap<String, String>,
    stemmer: Option<Stemmer>,
    stemmer_name: String,
}

impl Settings {
    /// Build settings from surface-form configuration.
    ///
    /// A non-empty `stemmer` must equal `"english"` (case-insensitive);
    /// anything else fails with [`AnalysisError::UnavailableStemmer`].
    /// Stop-words and synonym keys/values are stemmed here so that
    /// filtering composes with stemming at analysis time.
    pub fn new<I, S>(
        stopwords: I,
        synonyms: AHashMap<String, String>,
        stemmer: &str,
    ) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (stemmer, stemmer_name) = build_stemmer(stemmer)?;

        let stem = |term: String| -> String {
            match &stemmer {
                Some(s) => s.stem(&term).into_owned(),
                None => term,
            }
        };

        let stopwords = stopwords.into_iter().map(|w| stem(w.into())).collect();
        let synonyms = synonyms
            .into_iter()
            .map(|(from, to)| (stem(from), stem(to)))
            .collect();

        Ok(Self {
            stopwords,
            synonyms,
            stemmer,
            stemmer_name,
        })
    }

    /// Rebuild settings from already-stemmed terms, used when decoding a
    /// snapshot. Stemming is not re-applied: Porter is not idempotent for
    /// every input, so re-stemming could drift from the encoded state.
    pub(crate) fn from_stemmed(
        stopwords: AHashSet<String>,
        synonyms: AHashMap<String, String>,
        stemmer: &str,
    ) -> Result<Self, AnalysisError> {
        let (stemmer, stemmer_name) = build_stemmer(stemmer)?;
        Ok(Self {
            stopwords,
            synonyms,
            stemmer,
            stemmer_name,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stopwords: AHashSet::new(),
            synonyms: AHashMap::new(),
            stemmer: None,
            stemmer_name: String::new(),
        }
    }
}

impl Clone for Settings {
    fn clone(&self) -> Self {
        Self {
            stopwords: self.stopwords.clone(),
            synonyms: self.synonyms.clone(),
            // Stemmer is a stateless algorithm handle; recreate it.
            stemmer: self
                .stemmer
                .as_ref()
                .map(|_| Stemmer::create(Algorithm::English)),
            stemmer_name: self.stemmer_name.clone(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("stopwords", &self.stopwords)
            .field("synonyms", &self.synonyms)
            .field("stemmer", &self.stemmer_name)
            .finish()
    }
}

fn build_stemmer(name: &str) -> Result<(Option<Stemmer>, String), AnalysisError> {
    if name.is_empty() {
        return Ok((None, String::new()));
    }
    if name.to_lowercase() == ENGLISH_STEMMER {
        Ok((
            Some(Stemmer::create(Algorithm::English)),
            ENGLISH_STEMMER.to_string(),
        ))
    } else {
        Err(AnalysisError::UnavailableStemmer {
            name: name.to_string(),
        })
    }
}

/// A tokenizer variant bound to its filter settings.
///
/// Analyzers are immutable after construction and safe to share across
/// threads; [`Analyzer::analyze`] is a pure function of the input text.
#[derive(Debug, Clone)]
pub struct Analyzer {
    kind: AnalyzerKind,
    settings: Settings,
}

impl Analyzer {
    pub const fn new(kind: AnalyzerKind, settings: Settings) -> Self {
        Self { kind, settings }
    }

    /// Standard analyzer with default (empty) settings.
    pub fn standard() -> Self {
        Self::new(AnalyzerKind::Standard, Settings::default())
    }

    /// Simple analyzer with default (empty) settings.
    pub fn simple() -> Self {
        Self::new(AnalyzerKind::Simple, Settings::default())
    }

    /// Whitespace analyzer with default (empty) settings.
    pub fn whitespace() -> Self {
        Self::new(AnalyzerKind::Whitespace, Settings::default())
    }

    pub const fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    /// The stop-word set, unordered, in post-stem form.
    pub fn stopwords(&self) -> Vec<String> {
        self.settings.stopwords.iter().cloned().collect()
    }

    /// The synonym map in post-stem form.
    pub fn synonyms(&self) -> Vec<(String, String)> {
        self.settings
            .synonyms
            .iter()
            .map(|(from, to)| (from.clone(), to.clone()))
            .collect()
    }

    /// Configured stemmer name, empty when stemming is disabled.
    pub fn stemmer_name(&self) -> &str {
        &self.settings.stemmer_name
    }

    /// Analyze text into the normalized term sequence.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        match self.kind {
            AnalyzerKind::Whitespace => text
                .split_whitespace()
                .filter_map(|token| self.filter_token(token.to_string()))
                .collect(),
            AnalyzerKind::Simple => {
                let lowered = text.to_lowercase();
                lowered
                    .split(|c: char| !(c.is_alphabetic() || c.is_numeric() || is_apostrophe(c)))
                    .filter(|token| !token.is_empty())
                    .filter_map(|token| self.filter_token(token.to_string()))
                    .collect()
            }
            AnalyzerKind::Standard => {
                let lowered = text.to_lowercase();
                lowered
                    .unicode_words()
                    .filter_map(|token| self.filter_token(token.to_string()))
                    .collect()
            }
        }
    }

    /// Apply the filter chain: stem, then synonym substitution, then
    /// stop-word removal. Returns `None` when the token is dropped.
    fn filter_token(&self, token: String) -> Option<String> {
        let token = match &self.settings.stemmer {
            Some(stemmer) => stemmer.stem(&token).into_owned(),
            None => token,
        };
        let token = match self.settings.synonyms.get(&token) {
            Some(substitute) => substitute.clone(),
            None => token,
        };
        if self.settings.stopwords.contains(&token) {
            None
        } else {
            Some(token)
        }
    }
}

const fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}
