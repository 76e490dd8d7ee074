use log::{debug, warn};

use crate::error::LoadError;
use crate::util::arena::{align8, read_u32, read_u64, Arena, Span};
use crate::util::hash::hash_for_vocab;
use crate::util::probing::{ProbingEntry, ProbingTable};

/// Dense identifier of a vocabulary word. `0` is `<unk>`.
pub type WordIndex = u32;

/// Version of the vocabulary table layout this code reads.
pub const PROBING_VOCABULARY_VERSION: u32 = 0;

/// `{version: u32, bound: u32}`, padded to 8 bytes.
const HEADER_SIZE: usize = align8(8);

pub const BEGIN_SENTENCE: &str = "<s>";
pub const END_SENTENCE: &str = "</s>";

/// Vocabulary entry `{hash: u64, id: u32}` packed to 12 bytes.
pub struct VocabEntry;

impl ProbingEntry for VocabEntry {
	const SIZE: usize = 12;
	type Value = WordIndex;

	#[inline]
	fn key(raw: &[u8]) -> u64 {
		read_u64(raw, 0)
	}

	#[inline]
	fn value(raw: &[u8]) -> WordIndex {
		read_u32(raw, 8)
	}
}

/// Maps words to [`WordIndex`] through a probing table of word hashes.
///
/// Words never seen by the builder map to `0`; there is no error for an
/// unknown word.
#[derive(Clone, Debug)]
pub struct ProbingVocabulary {
	lookup: ProbingTable<VocabEntry>,
	bound: WordIndex,
	begin_sentence: WordIndex,
	end_sentence: WordIndex,
	saw_unk: bool,
}

impl ProbingVocabulary {
	/// Bytes taken by a vocabulary of `entries` words, `None` on overflow.
	pub fn size(entries: u64, probing_multiplier: f32) -> Option<u64> {
		ProbingTable::<VocabEntry>::size(entries, probing_multiplier)?.checked_add(HEADER_SIZE as u64)
	}

	/// Places the vocabulary over `span` and resolves the sentence markers.
	///
	/// # Errors
	/// - [`LoadError::VocabularyVersion`] if the header version differs.
	/// - [`LoadError::VocabularyId`] if a stored id is not below the bound.
	/// - [`LoadError::MissingSentenceMarker`] if `require_markers` is set
	///   and `<s>` or `</s>` is absent.
	pub(crate) fn setup(arena: &Arena, span: Span, require_markers: bool) -> Result<Self, LoadError> {
		let header = arena.span(span.offset, HEADER_SIZE, "vocabulary header")?;
		let header_bytes = arena.slice(header);
		let version = read_u32(header_bytes, 0);
		if version != PROBING_VOCABULARY_VERSION {
			return Err(LoadError::VocabularyVersion {
				found: version,
				expected: PROBING_VOCABULARY_VERSION,
			});
		}
		let bound = read_u32(header_bytes, 4);

		let table = arena.span(span.offset + HEADER_SIZE, span.len.saturating_sub(HEADER_SIZE), "vocabulary table")?;
		let mut vocab = Self {
			lookup: ProbingTable::new(arena.clone(), table),
			bound,
			begin_sentence: 0,
			end_sentence: 0,
			saw_unk: false,
		};
		// every id handed out later indexes the unigram array
		if let Some(id) = vocab.lookup.values().find(|&id| id >= bound) {
			return Err(LoadError::VocabularyId { id, bound });
		}

		vocab.begin_sentence = vocab.index(BEGIN_SENTENCE);
		vocab.end_sentence = vocab.index(END_SENTENCE);
		vocab.saw_unk = vocab.lookup.find(hash_for_vocab(b"<unk>")).is_some()
			|| vocab.lookup.find(hash_for_vocab(b"<UNK>")).is_some();

		for (marker, id) in [(BEGIN_SENTENCE, vocab.begin_sentence), (END_SENTENCE, vocab.end_sentence)] {
			if id == 0 {
				if require_markers {
					return Err(LoadError::MissingSentenceMarker(marker));
				}
				warn!("vocabulary has no {marker}, it will be scored as <unk>");
			}
		}
		debug!(
			"vocabulary: bound {} with {} buckets, <s>={} </s>={}",
			vocab.bound,
			vocab.lookup.buckets(),
			vocab.begin_sentence,
			vocab.end_sentence
		);
		Ok(vocab)
	}

	/// Id of `word`, or `0` if the vocabulary does not contain it.
	#[inline]
	pub fn index(&self, word: &str) -> WordIndex {
		self.index_bytes(word.as_bytes())
	}

	/// Id of a word given as raw bytes.
	#[inline]
	pub fn index_bytes(&self, word: &[u8]) -> WordIndex {
		self.lookup.find(hash_for_vocab(word)).unwrap_or(0)
	}

	/// Valid ids are `[0, bound)`. This is also the number of words,
	/// `<unk>` included.
	pub fn bound(&self) -> WordIndex {
		self.bound
	}

	pub fn begin_sentence(&self) -> WordIndex {
		self.begin_sentence
	}

	pub fn end_sentence(&self) -> WordIndex {
		self.end_sentence
	}

	/// Id returned for unknown words.
	pub fn not_found(&self) -> WordIndex {
		0
	}

	/// Whether the builder stored an explicit `<unk>` (or `<UNK>`) entry.
	pub fn saw_unk(&self) -> bool {
		self.saw_unk
	}

	pub(crate) fn table(&self) -> &ProbingTable<VocabEntry> {
		&self.lookup
	}
}
