//! Search pipeline pieces: candidate filtering and TF-IDF ranking.

pub mod filter;
pub mod rank;

pub use filter::MinMatchFilter;
pub use rank::{IdfWeight, TfIdfRanker, TfWeight};
