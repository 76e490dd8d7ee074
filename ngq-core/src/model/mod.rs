//! Top-level module for the n-gram scoring engine.
//!
//! This module provides a backoff language model read from a binary buffer,
//! including:
//! - Format recognition and header validation (`format`)
//! - The word vocabulary (`ProbingVocabulary`)
//! - Per-order n-gram storage (`HashedSearch`)
//! - Incremental scoring with context states (`ProbingModel`, `State`)
//! - Whole sentence scoring and perplexity (`SentenceScore`)

/// Sanity block, parameter block and layout arithmetic of the binary format.
pub mod format;

/// The scoring engine, generic over the n-gram store.
pub mod generic;

/// Lookup capabilities of an n-gram store and the hash-table store.
pub mod search;

/// Scoring whole token sequences and corpus perplexity.
pub mod sentence;

/// Context carried between scoring calls and the result of one call.
pub mod state;

/// Stored weights and their decoding.
pub mod value;

/// Word to id mapping.
pub mod vocab;

pub use generic::{GenericModel, ProbingModel};
pub use sentence::{CorpusStats, SentenceScore, WordScore};
pub use state::{FullScoreReturn, State};
pub use vocab::{ProbingVocabulary, WordIndex};
