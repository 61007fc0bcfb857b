#![warn(unreachable_pub)]

pub mod analysis;
pub mod cli;
pub mod document;
pub mod error;
pub mod index;
pub mod path;
pub mod repo;
pub mod search;
pub mod server;
pub mod snapshot;
pub mod suggest;
pub mod tracing;
pub mod worker;

// Re-export common types
pub use analysis::{Analyzer, AnalyzerKind, Settings};
pub use document::{Document, DocumentEntry, ScoredDocument, TermFrequency};
pub use error::{
    AnalysisError, ConfigError, IndexError, RepoError, Result, SnapshotError,
};
pub use index::{Index, load_directory};
pub use repo::{IndexId, IndexRepository, NamedIndex};
pub use search::{IdfWeight, MinMatchFilter, TfIdfRanker, TfWeight};
pub use suggest::FuzzyConfig;
