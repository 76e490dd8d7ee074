use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::config::MAX_ORDER;
use crate::model::vocab::WordIndex;

/// Context carried from one scoring call to the next.
///
/// `words` holds the preceding words, most recent first, and `backoff` the
/// backoff of each of those context lengths: `backoff[i]` is charged when a
/// later word fails to match the context of length `i + 1`. Only the first
/// `length` slots are meaningful; equality, ordering and hashing look at
/// `length` and that prefix of `words` only.
///
/// A zero-length state means "no usable context".
#[derive(Clone, Copy, Debug)]
pub struct State {
	pub(crate) words: [WordIndex; MAX_ORDER - 1],
	pub(crate) backoff: [f32; MAX_ORDER - 1],
	pub(crate) length: u8,
}

impl State {
	/// Number of context words kept.
	pub fn length(&self) -> usize {
		usize::from(self.length)
	}

	/// Context words, most recent first.
	pub fn words(&self) -> &[WordIndex] {
		&self.words[..self.length()]
	}

	/// Backoff of each kept context length.
	pub fn backoffs(&self) -> &[f32] {
		&self.backoff[..self.length()]
	}

	/// Clears the slots past `length` so a plain byte comparison of two
	/// states agrees with `==`.
	pub fn zero_remaining(&mut self) {
		let length = self.length();
		self.words[length..].fill(0);
		self.backoff[length..].fill(0.0);
	}
}

impl Default for State {
	fn default() -> Self {
		Self {
			words: [0; MAX_ORDER - 1],
			backoff: [0.0; MAX_ORDER - 1],
			length: 0,
		}
	}
}

impl PartialEq for State {
	fn eq(&self, other: &Self) -> bool {
		self.length == other.length && self.words() == other.words()
	}
}

impl Eq for State {}

impl Ord for State {
	fn cmp(&self, other: &Self) -> Ordering {
		self.length
			.cmp(&other.length)
			.then_with(|| self.words().cmp(other.words()))
	}
}

impl PartialOrd for State {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Hash for State {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.length.hash(state);
		self.words().hash(state);
	}
}

/// Result of scoring one word.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FullScoreReturn {
	/// log10 probability of the word, backoff included.
	pub prob: f32,

	/// Length of the longest n-gram matched.
	pub ngram_length: u8,

	/// The cost of the matched n-gram cannot change whatever words come
	/// before the context.
	pub independent_left: bool,

	/// Search position of the longest match; lets a caller extend the match
	/// to the left later on.
	pub extend_left: u64,

	/// Rest cost estimate. Equal to `prob` (before backoff) for this model.
	pub rest: f32,
}
