use crate::util::arena::{read_f32, read_u32, read_u64};
use crate::util::probing::ProbingEntry;

/// Sign bit of an IEEE-754 single.
pub(crate) const SIGN_BIT: u32 = 0x8000_0000;

/// Backoff stored for an n-gram that is never extended to the right and has
/// zero backoff. Differs from `+0.0` only in the sign bit.
pub const NO_EXTENSION_BACKOFF: f32 = -0.0;

/// Backoff stored for an n-gram with zero backoff that may be extended.
pub const EXTENSION_BACKOFF: f32 = 0.0;

/// Whether a context ending in this n-gram can matter for a later word.
///
/// Compares bit patterns: `-0.0` and `0.0` are equal as numbers but mean
/// different things here.
#[inline]
pub fn has_extension(backoff: f32) -> bool {
	backoff.to_bits() != NO_EXTENSION_BACKOFF.to_bits()
}

/// Weights of an n-gram below the maximum order, decoded from storage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
	/// log10 probability.
	pub prob: f32,
	/// log10 backoff.
	pub backoff: f32,
	/// No longer n-gram ends with this one, so left context cannot change
	/// its cost.
	pub independent_left: bool,
}

impl Weights {
	/// Decodes a stored `(prob, backoff)` pair.
	///
	/// Builders clear the sign bit of the probability of n-grams that can be
	/// extended to the left; every probability is `<= 0`, so the sign bit is
	/// forced back on when reading.
	#[inline]
	pub fn decode(raw_prob: u32, backoff: f32) -> Self {
		Self {
			prob: f32::from_bits(raw_prob | SIGN_BIT),
			backoff,
			independent_left: raw_prob & SIGN_BIT != 0,
		}
	}

	/// Rest cost; equal to the probability for this kind of model.
	#[inline]
	pub fn rest(&self) -> f32 {
		self.prob
	}
}

/// Unigram record `{prob: f32, backoff: f32}`.
pub(crate) const UNIGRAM_SIZE: usize = 8;

#[inline]
pub(crate) fn decode_unigram(raw: &[u8]) -> Weights {
	Weights::decode(read_u32(raw, 0), read_f32(raw, 4))
}

/// Middle-order entry `{key: u64, prob: f32, backoff: f32}`.
pub struct MiddleEntry;

impl ProbingEntry for MiddleEntry {
	const SIZE: usize = 16;
	type Value = Weights;

	#[inline]
	fn key(raw: &[u8]) -> u64 {
		read_u64(raw, 0)
	}

	#[inline]
	fn value(raw: &[u8]) -> Weights {
		Weights::decode(read_u32(raw, 8), read_f32(raw, 12))
	}
}

/// Highest-order entry `{key: u64, prob: f32, padding: u32}`.
///
/// Nothing extends the longest n-grams, so the stored value is the plain
/// probability.
pub struct LongestEntry;

impl ProbingEntry for LongestEntry {
	const SIZE: usize = 16;
	type Value = f32;

	#[inline]
	fn key(raw: &[u8]) -> u64 {
		read_u64(raw, 0)
	}

	#[inline]
	fn value(raw: &[u8]) -> f32 {
		read_f32(raw, 8)
	}
}
