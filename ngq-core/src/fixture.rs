//! Builders writing small binary models for tests.

use crate::model::format::{sanity_reference, total_header_size, FIXED_PARAMETERS_SIZE};
use crate::model::generic::ProbingModel;
use crate::model::value::{NO_EXTENSION_BACKOFF, SIGN_BIT};
use crate::model::vocab::PROBING_VOCABULARY_VERSION;
use crate::util::hash::{combine_word_hash, hash_for_vocab};
use crate::util::probing::{bucket_count, EMPTY_KEY};

/// Writes entries into a linear probing table the same way a builder does.
pub(crate) struct TableWriter {
	buckets: usize,
	entry_size: usize,
	bytes: Vec<u8>,
}

impl TableWriter {
	pub(crate) fn new(buckets: usize, entry_size: usize) -> Self {
		Self {
			buckets,
			entry_size,
			bytes: vec![0; buckets * entry_size],
		}
	}

	/// Stores `key` followed by `value` in the first free bucket from the
	/// ideal one.
	pub(crate) fn insert(&mut self, key: u64, value: &[u8]) {
		assert_ne!(key, EMPTY_KEY);
		assert!(8 + value.len() <= self.entry_size);
		let mut bucket = (key % self.buckets as u64) as usize;
		for _ in 0..self.buckets {
			let start = bucket * self.entry_size;
			let stored = u64::from_le_bytes(self.bytes[start..start + 8].try_into().unwrap());
			if stored == EMPTY_KEY {
				self.bytes[start..start + 8].copy_from_slice(&key.to_le_bytes());
				self.bytes[start + 8..start + 8 + value.len()].copy_from_slice(value);
				return;
			}
			bucket = (bucket + 1) % self.buckets;
		}
		panic!("table with {} buckets is full", self.buckets);
	}

	pub(crate) fn into_bytes(self) -> Vec<u8> {
		self.bytes
	}
}

/// Vocabulary block: header then the table, ids following `words`.
pub(crate) fn write_vocabulary(words: &[&str], multiplier: f32, version: u32) -> Vec<u8> {
	let mut bytes = Vec::new();
	bytes.extend_from_slice(&version.to_le_bytes());
	bytes.extend_from_slice(&(words.len() as u32).to_le_bytes());

	let buckets = bucket_count(words.len() as u64, multiplier) as usize;
	let mut table = TableWriter::new(buckets, 12);
	for (id, word) in words.iter().enumerate() {
		table.insert(hash_for_vocab(word.as_bytes()), &(id as u32).to_le_bytes());
	}
	bytes.extend(table.into_bytes());
	bytes
}

/// Rewrites the id stored for `word` in the vocabulary table starting at
/// `table_offset`.
pub(crate) fn set_vocabulary_id(bytes: &mut [u8], table_offset: usize, word: &str, id: u32) {
	let key = hash_for_vocab(word.as_bytes());
	let entry = bytes[table_offset..]
		.chunks_exact_mut(12)
		.find(|raw| u64::from_le_bytes(raw[..8].try_into().unwrap()) == key)
		.unwrap_or_else(|| panic!("{word:?} is not in the table"));
	entry[8..12].copy_from_slice(&id.to_le_bytes());
}

/// Header fields, valid by default.
pub(crate) struct HeaderFields {
	pub(crate) counts: Vec<u64>,
	pub(crate) probing_multiplier: f32,
	pub(crate) model_type: u32,
	pub(crate) has_vocabulary: bool,
	pub(crate) search_version: u32,
}

impl HeaderFields {
	pub(crate) fn new(counts: Vec<u64>) -> Self {
		Self {
			counts,
			probing_multiplier: 1.5,
			model_type: 0,
			has_vocabulary: true,
			search_version: 0,
		}
	}
}

/// Sanity block, parameters and counts, padded to the aligned header size.
pub(crate) fn write_header(header: &HeaderFields) -> Vec<u8> {
	let mut bytes = sanity_reference().to_vec();
	let mut fixed = [0u8; FIXED_PARAMETERS_SIZE];
	fixed[0] = header.counts.len() as u8;
	fixed[4..8].copy_from_slice(&header.probing_multiplier.to_le_bytes());
	fixed[8..12].copy_from_slice(&header.model_type.to_le_bytes());
	fixed[12] = u8::from(header.has_vocabulary);
	fixed[16..20].copy_from_slice(&header.search_version.to_le_bytes());
	bytes.extend_from_slice(&fixed);
	for count in &header.counts {
		bytes.extend_from_slice(&count.to_le_bytes());
	}
	bytes.resize(total_header_size(header.counts.len()), 0);
	bytes
}

/// One n-gram of a fixture, words left to right.
struct Gram {
	words: Vec<&'static str>,
	prob: f32,
	backoff: f32,
}

fn gram(words: &'static str, prob: f32, backoff: f32) -> Gram {
	Gram {
		words: words.split_whitespace().collect(),
		prob,
		backoff,
	}
}

/// A complete model kept as grams and as the bytes a builder would write.
///
/// Word ids follow the order of the unigrams. Independent-left flags are
/// derived: an n-gram is tagged independent when no longer n-gram ends
/// with it.
pub(crate) struct ModelFixture {
	orders: Vec<Vec<Gram>>,
	bytes: Vec<u8>,
}

impl ModelFixture {
	const MULTIPLIER: f32 = 1.5;

	/// Trigram model over `a b c`.
	pub(crate) fn trigram() -> Self {
		Self::build(vec![
			vec![
				gram("<unk>", -2.0, NO_EXTENSION_BACKOFF),
				gram("<s>", -99.0, -0.5),
				gram("</s>", -1.1, NO_EXTENSION_BACKOFF),
				gram("a", -1.2, -0.3),
				gram("b", -1.5, -0.4),
				gram("c", -1.8, -0.2),
			],
			vec![
				gram("<s> a", -0.6, -0.25),
				gram("a b", -0.5, -0.15),
				gram("b c", -0.9, NO_EXTENSION_BACKOFF),
			],
			vec![gram("<s> a b", -0.2, 0.0), gram("a b c", -0.3, 0.0)],
		])
	}

	/// Bigram model, so the longest table directly follows the unigrams.
	pub(crate) fn bigram() -> Self {
		Self::build(vec![
			vec![
				gram("<unk>", -2.0, NO_EXTENSION_BACKOFF),
				gram("<s>", -99.0, -0.5),
				gram("</s>", -1.1, NO_EXTENSION_BACKOFF),
				gram("a", -1.2, -0.3),
				gram("b", -1.5, -0.1),
			],
			vec![gram("<s> a", -0.4, 0.0), gram("b </s>", -0.3, 0.0)],
		])
	}

	/// Unigram-only model with the given words and probabilities.
	pub(crate) fn unigram(words: &[(&'static str, f32)]) -> Self {
		let unigrams = words
			.iter()
			.map(|&(word, prob)| gram(word, prob, NO_EXTENSION_BACKOFF))
			.collect();
		Self::build(vec![unigrams])
	}

	fn build(orders: Vec<Vec<Gram>>) -> Self {
		let mut fixture = Self { orders, bytes: Vec::new() };
		fixture.bytes = fixture.write();
		fixture
	}

	pub(crate) fn counts(&self) -> Vec<u64> {
		self.orders.iter().map(|grams| grams.len() as u64).collect()
	}

	pub(crate) fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub(crate) fn load(&self) -> ProbingModel {
		ProbingModel::new(&self.bytes).unwrap()
	}

	fn id(&self, word: &str) -> u32 {
		self.orders[0].iter().position(|g| g.words[0] == word).unwrap() as u32
	}

	/// Key of an n-gram: the last word, then the context nearest first.
	fn key(&self, words: &[&str]) -> u64 {
		let (last, context) = words.split_last().unwrap();
		context
			.iter()
			.rev()
			.fold(u64::from(self.id(last)), |node, word| combine_word_hash(node, self.id(word)))
	}

	fn extends_left(&self, gram: &Gram) -> bool {
		let n = gram.words.len();
		self.orders
			.get(n)
			.is_some_and(|longer| longer.iter().any(|g| g.words[1..] == gram.words[..]))
	}

	fn stored_prob(&self, gram: &Gram) -> [u8; 4] {
		let bits = gram.prob.to_bits() | SIGN_BIT;
		let bits = if self.extends_left(gram) { bits & !SIGN_BIT } else { bits };
		bits.to_le_bytes()
	}

	fn write(&self) -> Vec<u8> {
		let counts = self.counts();
		let order = counts.len();
		let mut bytes = write_header(&HeaderFields::new(counts.clone()));

		let words: Vec<&str> = self.orders[0].iter().map(|g| g.words[0]).collect();
		bytes.extend(write_vocabulary(&words, Self::MULTIPLIER, PROBING_VOCABULARY_VERSION));

		for unigram in &self.orders[0] {
			bytes.extend_from_slice(&self.stored_prob(unigram));
			bytes.extend_from_slice(&unigram.backoff.to_le_bytes());
		}

		for grams in self.orders.iter().take(order.saturating_sub(1)).skip(1) {
			let buckets = bucket_count(grams.len() as u64, Self::MULTIPLIER) as usize;
			let mut table = TableWriter::new(buckets, 16);
			for gram in grams {
				let mut value = self.stored_prob(gram).to_vec();
				value.extend_from_slice(&gram.backoff.to_le_bytes());
				table.insert(self.key(&gram.words), &value);
			}
			bytes.extend(table.into_bytes());
		}

		let longest_count = counts[order - 1];
		let mut table = TableWriter::new(bucket_count(longest_count, Self::MULTIPLIER) as usize, 16);
		if order > 1 {
			for gram in &self.orders[order - 1] {
				table.insert(self.key(&gram.words), &gram.prob.to_le_bytes());
			}
		}
		bytes.extend(table.into_bytes());
		bytes
	}
}
