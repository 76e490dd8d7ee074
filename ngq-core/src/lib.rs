//! N-gram language model scoring library.
//!
//! This crate reads backoff language models stored in the probing binary
//! format and scores text with them, including:
//! - Recognition and validation of the binary format
//! - Word lookup through a hashed vocabulary
//! - Incremental scoring with explicit context states
//! - Sentence scoring and perplexity
//! - A minimal `init` / `query` / `teardown` boundary
//!
//! A loaded model is immutable and can be shared between threads.

/// Options for loading a model.
pub mod config;

/// Load and table errors.
pub mod error;

/// Opaque handle boundary.
pub mod handle;

/// I/O utilities (file loading, path helpers).
pub mod io;

/// The model, its vocabulary, n-gram store and scoring.
pub mod model;

/// Byte arena, hashing and probing hash tables.
pub mod util;

#[cfg(test)]
pub(crate) mod fixture;

pub use config::Config;
pub use error::{LoadError, ProbingError};
pub use model::{CorpusStats, FullScoreReturn, ProbingModel, ProbingVocabulary, SentenceScore, State, WordIndex, WordScore};
