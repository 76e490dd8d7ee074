//! Error types raised while loading a model.
//!
//! Scoring itself never fails; everything that can go wrong is detected
//! while the binary buffer is validated and laid out.

use thiserror::Error;

/// Diagnostic failures of a probing hash table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbingError {
	#[error("probing table with {buckets} buckets is completely full")]
	CompletelyFull { buckets: usize },

	#[error("inconsistency at position {position} with ideal bucket {ideal}")]
	Inconsistent { position: usize, ideal: usize },
}

/// Why a buffer could not be turned into a model.
#[derive(Debug, Error)]
pub enum LoadError {
	#[error("not a binary format of a language model")]
	NotBinary,

	#[error("this binary file did not finish building")]
	Incomplete,

	#[error(
		"binary file has version {found} but this implementation expects version {expected}, rebuild the binary from the ARPA file"
	)]
	VersionMismatch { found: i64, expected: i64 },

	#[error(
		"looks like this is an old 32-bit format; it has been removed so that 64-bit and 32-bit files are exchangeable"
	)]
	Obsolete32Bit,

	#[error(
		"file looks like a binary language model but the test values don't match; rebuild it with the same code revision, compiler and architecture"
	)]
	SanityMismatch,

	#[error("binary format claims to have a probing multiplier of {0} which is not a finite value >= 1.0")]
	ProbingMultiplier(f32),

	#[error("the binary file claims to be model type {0} which is not implemented by this inference code")]
	UnknownModelType(u32),

	#[error("the binary file was built for {found} but the inference code is trying to load {expected}")]
	ModelTypeMismatch { found: &'static str, expected: &'static str },

	#[error("the binary file has {name} version {found} but this code expects {name} version {expected}")]
	SearchVersionMismatch { name: &'static str, found: u32, expected: u32 },

	#[error("this model has order {order} but this build supports up to order {max}; recompile with a higher maximum order")]
	OrderTooHigh { order: usize, max: usize },

	#[error("this model has order 0")]
	EmptyModel,

	#[error("this model has {count} {order}-grams which is too many for this address width")]
	CountOverflow { order: usize, count: u64 },

	#[error(
		"the decoder requested all the vocabulary strings, but this binary does not have them; rebuild the binary with an updated builder"
	)]
	MissingVocabulary,

	#[error("{what} needs {needed} bytes at offset {offset} but the buffer has only {size} bytes")]
	Truncated { what: &'static str, offset: usize, needed: usize, size: usize },

	#[error("the size of the {what} claimed by the headers does not fit in 64 bits")]
	SizeOverflow { what: &'static str },

	#[error("binary file has size {size} but the headers say it should be at least {expected}")]
	FileTooSmall { size: u64, expected: u64 },

	#[error("the data structures took {used} bytes but the layout says they should take {expected}")]
	LayoutMismatch { used: u64, expected: u64 },

	#[error(
		"the binary file has probing vocabulary version {found} but the code expects version {expected}; rebuild the binary with the same version of the code"
	)]
	VocabularyVersion { found: u32, expected: u32 },

	#[error("the vocabulary stores word id {id} but its bound is {bound}")]
	VocabularyId { id: u32, bound: u32 },

	#[error("the vocabulary claims {bound} words but only {unigrams} unigrams are stored")]
	VocabularyBound { bound: u32, unigrams: u64 },

	#[error("the vocabulary has no entry for the sentence marker {0}")]
	MissingSentenceMarker(&'static str),

	#[error(transparent)]
	Probing(#[from] ProbingError),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
