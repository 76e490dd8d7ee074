use log::debug;

use crate::error::{LoadError, ProbingError};
use crate::model::format::ModelType;
use crate::model::value::{decode_unigram, LongestEntry, MiddleEntry, Weights, UNIGRAM_SIZE};
use crate::model::vocab::WordIndex;
use crate::util::arena::{byte_len, Arena, Span};
use crate::util::hash::combine_word_hash;
use crate::util::probing::ProbingTable;

/// Position reached while walking the context of a word, one order at a
/// time. Feeding it the next context word gives the key of the next order.
pub type Node = u64;

/// Lookup capabilities the scoring engine needs from an n-gram store.
///
/// A store is laid over the bytes following the vocabulary and answers
/// lookups in increasing order: unigram, then each middle order, then the
/// longest order.
pub trait Search: Sized {
	/// Model type recorded in binary files built for this store.
	const MODEL_TYPE: ModelType;

	/// Layout version recorded in binary files built for this store.
	const VERSION: u32;

	/// Bytes taken by the store for the given n-gram counts, `None` if the
	/// total does not fit in a `u64`.
	fn size(counts: &[u64], probing_multiplier: f32) -> Option<u64>;

	/// Places the store at `offset` and returns it with the first offset
	/// past its bytes.
	fn setup(arena: &Arena, offset: usize, counts: &[u64], probing_multiplier: f32) -> Result<(Self, usize), LoadError>;

	/// Highest n-gram order.
	fn order(&self) -> u8;

	/// Weights of a single word. Always defined for `word < bound`.
	fn lookup_unigram(&self, word: WordIndex) -> (Weights, Node);

	/// Extends `node` by `word` and looks the result up in the table of
	/// order `order_minus_2 + 2`.
	fn lookup_middle(&self, order_minus_2: usize, word: WordIndex, node: Node) -> (Option<Weights>, Node);

	/// Extends `node` by `word` and looks the result up among the longest
	/// n-grams.
	fn lookup_longest(&self, word: WordIndex, node: Node) -> Option<f32>;

	/// Runs the probing consistency check over every hash table.
	fn check_consistency(&self) -> Result<(), ProbingError>;
}

/// Dense unigram array indexed by word id.
#[derive(Clone, Debug)]
struct Unigrams {
	arena: Arena,
	span: Span,
}

impl Unigrams {
	fn size(count: u64) -> Option<u64> {
		count.checked_mul(UNIGRAM_SIZE as u64)
	}

	#[inline]
	fn lookup(&self, word: WordIndex) -> Weights {
		let at = word as usize * UNIGRAM_SIZE;
		let bytes = self.arena.slice(self.span);
		decode_unigram(&bytes[at..at + UNIGRAM_SIZE])
	}
}

/// Hash-table based store: a unigram array, one probing table per middle
/// order and one for the longest order.
#[derive(Clone, Debug)]
pub struct HashedSearch {
	unigram: Unigrams,
	middle: Vec<ProbingTable<MiddleEntry>>,
	longest: ProbingTable<LongestEntry>,
	order: u8,
}

impl Search for HashedSearch {
	const MODEL_TYPE: ModelType = ModelType::Probing;
	const VERSION: u32 = 0;

	fn size(counts: &[u64], probing_multiplier: f32) -> Option<u64> {
		let Some((&longest, _)) = counts.split_last() else {
			return Some(0);
		};
		let middle = counts
			.iter()
			.skip(1)
			.take(counts.len().saturating_sub(2))
			.try_fold(0u64, |sum, &count| {
				sum.checked_add(ProbingTable::<MiddleEntry>::size(count, probing_multiplier)?)
			})?;
		Unigrams::size(counts[0])?
			.checked_add(middle)?
			.checked_add(ProbingTable::<LongestEntry>::size(longest, probing_multiplier)?)
	}

	fn setup(arena: &Arena, offset: usize, counts: &[u64], probing_multiplier: f32) -> Result<(Self, usize), LoadError> {
		let Some((&longest_count, _)) = counts.split_last() else {
			return Err(LoadError::EmptyModel);
		};

		let unigram_len = byte_len(Unigrams::size(counts[0]), "unigram array")?;
		let span = arena.span(offset, unigram_len, "unigram array")?;
		let unigram = Unigrams { arena: arena.clone(), span };
		let mut start = span.end();

		let mut middle = Vec::with_capacity(counts.len().saturating_sub(2));
		for n in 2..counts.len() {
			let len = byte_len(ProbingTable::<MiddleEntry>::size(counts[n - 1], probing_multiplier), "middle order table")?;
			let span = arena.span(start, len, "middle order table")?;
			debug!("{n}-gram table at offset {start}, {len} bytes");
			middle.push(ProbingTable::new(arena.clone(), span));
			start = span.end();
		}

		let len = byte_len(ProbingTable::<LongestEntry>::size(longest_count, probing_multiplier), "longest order table")?;
		let span = arena.span(start, len, "longest order table")?;
		debug!("{}-gram table at offset {start}, {len} bytes", counts.len());
		let longest = ProbingTable::new(arena.clone(), span);

		let search = Self {
			unigram,
			middle,
			longest,
			order: counts.len() as u8,
		};
		Ok((search, span.end()))
	}

	fn order(&self) -> u8 {
		self.order
	}

	#[inline]
	fn lookup_unigram(&self, word: WordIndex) -> (Weights, Node) {
		(self.unigram.lookup(word), Node::from(word))
	}

	#[inline]
	fn lookup_middle(&self, order_minus_2: usize, word: WordIndex, node: Node) -> (Option<Weights>, Node) {
		let node = combine_word_hash(node, word);
		(self.middle[order_minus_2].find(node), node)
	}

	#[inline]
	fn lookup_longest(&self, word: WordIndex, node: Node) -> Option<f32> {
		self.longest.find(combine_word_hash(node, word))
	}

	fn check_consistency(&self) -> Result<(), ProbingError> {
		for table in &self.middle {
			table.check_consistency()?;
		}
		self.longest.check_consistency()
	}
}
