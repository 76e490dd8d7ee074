use std::path::Path;

use log::{debug, info};

use crate::config::Config;
use crate::error::{LoadError, ProbingError};
use crate::io;
use crate::model::format::{check_counts, is_binary_format, match_check, read_parameters, total_header_size};
use crate::model::search::{HashedSearch, Node, Search};
use crate::model::state::{FullScoreReturn, State};
use crate::model::value::has_extension;
use crate::model::vocab::{ProbingVocabulary, WordIndex};
use crate::util::arena::{byte_len, Arena};

/// Backoff n-gram language model over one immutable buffer.
///
/// # Responsibilities
/// - Validate a binary buffer and lay the vocabulary and n-gram store over it
/// - Score words incrementally, carrying context in [`State`] values
///
/// # Notes
/// The model is never mutated after construction, so a shared reference can
/// be used from any number of threads as long as each caller brings its own
/// states.
#[derive(Clone, Debug)]
pub struct GenericModel<S: Search> {
	vocab: ProbingVocabulary,
	search: S,
	begin_sentence: State,
	null_context: State,
	arena: Arena,
}

/// Model backed by probing hash tables, the only store this crate reads.
pub type ProbingModel = GenericModel<HashedSearch>;

impl<S: Search> GenericModel<S> {
	/// Bytes taken by the vocabulary and n-gram store for the given counts,
	/// header excluded. `None` if the total does not fit in a `u64`.
	pub fn size(counts: &[u64], probing_multiplier: f32) -> Option<u64> {
		let Some(&unigrams) = counts.first() else {
			return Some(0);
		};
		ProbingVocabulary::size(unigrams, probing_multiplier)?.checked_add(S::size(counts, probing_multiplier)?)
	}

	/// Loads a model from a buffer with the default [`Config`].
	///
	/// The buffer is copied once; the caller keeps its own.
	pub fn new(data: &[u8]) -> Result<Self, LoadError> {
		Self::with_config(data, &Config::default())
	}

	/// Loads a model from a buffer.
	pub fn with_config(data: &[u8], config: &Config) -> Result<Self, LoadError> {
		Self::from_arena(Arena::new(data), config)
	}

	/// Loads a model from a file.
	pub fn from_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self, LoadError> {
		let bytes = io::read_bytes(&path)?;
		debug!("read {} bytes from {}", bytes.len(), path.as_ref().display());
		Self::from_arena(Arena::new(bytes), config)
	}

	/// Validates the buffer and places every structure over it.
	///
	/// # Errors
	/// Any [`LoadError`]; see the variants for the individual checks, which
	/// run in this order: recognition, parameters, search type, counts,
	/// vocabulary flag, total size, vocabulary, n-gram store, layout size.
	fn from_arena(arena: Arena, config: &Config) -> Result<Self, LoadError> {
		let data = arena.bytes();
		if !is_binary_format(data)? {
			return Err(LoadError::NotBinary);
		}

		let params = read_parameters(data)?;
		match_check(S::MODEL_TYPE, S::VERSION, &params)?;
		check_counts(&params.counts)?;
		if !params.fixed.has_vocabulary {
			return Err(LoadError::MissingVocabulary);
		}

		let multiplier = params.fixed.probing_multiplier;
		let header_size = total_header_size(params.order());
		let goal_size = Self::size(&params.counts, multiplier).ok_or(LoadError::SizeOverflow { what: "model" })?;
		let total = (header_size as u64)
			.checked_add(goal_size)
			.ok_or(LoadError::SizeOverflow { what: "model" })?;
		if (arena.len() as u64) < total {
			return Err(LoadError::FileTooSmall {
				size: arena.len() as u64,
				expected: total,
			});
		}

		let vocab_size = byte_len(ProbingVocabulary::size(params.counts[0], multiplier), "vocabulary")?;
		let vocab_span = arena.span(header_size, vocab_size, "vocabulary")?;
		let vocab = ProbingVocabulary::setup(&arena, vocab_span, config.require_sentence_markers)?;
		if u64::from(vocab.bound()) > params.counts[0] {
			return Err(LoadError::VocabularyBound {
				bound: vocab.bound(),
				unigrams: params.counts[0],
			});
		}

		let (search, end) = S::setup(&arena, vocab_span.end(), &params.counts, multiplier)?;
		let used = (end - header_size) as u64;
		if used != goal_size {
			return Err(LoadError::LayoutMismatch {
				used,
				expected: goal_size,
			});
		}

		let (begin_weights, _) = search.lookup_unigram(vocab.begin_sentence());
		let mut begin_sentence = State::default();
		begin_sentence.length = 1;
		begin_sentence.words[0] = vocab.begin_sentence();
		begin_sentence.backoff[0] = begin_weights.backoff;

		let model = Self {
			vocab,
			search,
			begin_sentence,
			null_context: State::default(),
			arena,
		};
		if config.check_consistency {
			model.check_consistency()?;
		}
		info!(
			"loaded {}-gram model, counts {:?}, probing multiplier {}, {} bytes",
			params.order(),
			params.counts,
			multiplier,
			model.arena.len()
		);
		Ok(model)
	}

	/// State to start scoring a sentence with: context `<s>`.
	pub fn begin_sentence_state(&self) -> &State {
		&self.begin_sentence
	}

	/// State without any context.
	pub fn null_context_state(&self) -> &State {
		&self.null_context
	}

	pub fn vocabulary(&self) -> &ProbingVocabulary {
		&self.vocab
	}

	/// Highest n-gram order of the model.
	pub fn order(&self) -> u8 {
		self.search.order()
	}

	pub(crate) fn search(&self) -> &S {
		&self.search
	}

	/// Checks every probing table of the model.
	///
	/// # Errors
	/// The first [`ProbingError`] found.
	pub fn check_consistency(&self) -> Result<(), ProbingError> {
		self.vocab.table().check_consistency()?;
		self.search.check_consistency()
	}

	/// Scores `new_word` after the context of `in_state`, backoff included,
	/// and writes the context for the next word into `out_state`.
	///
	/// # Notes
	/// - `new_word` must be below the vocabulary bound; ids coming from
	///   [`ProbingVocabulary::index`] always are.
	/// - Identical arguments always give bit-identical results.
	pub fn full_score(&self, in_state: &State, new_word: WordIndex, out_state: &mut State) -> FullScoreReturn {
		let mut ret = self.score_except_backoff(in_state.words(), new_word, out_state);
		// charge the backoff of every longer context that did not match
		for backoff in &in_state.backoff[usize::from(ret.ngram_length) - 1..in_state.length()] {
			ret.prob += *backoff;
		}
		ret
	}

	/// Same as [`GenericModel::full_score`] but returns only the probability.
	pub fn score(&self, in_state: &State, new_word: WordIndex, out_state: &mut State) -> f32 {
		self.full_score(in_state, new_word, out_state).prob
	}

	/// Probability of the longest match, without backoff.
	///
	/// The context goes backwards: `context[0]` is the word right before
	/// `new_word`.
	fn score_except_backoff(&self, context: &[WordIndex], new_word: WordIndex, out_state: &mut State) -> FullScoreReturn {
		debug_assert!(new_word < self.vocab.bound());
		let (unigram, node) = self.search.lookup_unigram(new_word);
		let mut ret = FullScoreReturn {
			prob: unigram.prob,
			ngram_length: 1,
			independent_left: unigram.independent_left,
			extend_left: node,
			rest: unigram.rest(),
		};

		out_state.backoff[0] = unigram.backoff;
		// length of the context worth keeping for the words to the right
		out_state.length = u8::from(has_extension(unigram.backoff));
		out_state.words[0] = new_word;
		if self.order() < 2 {
			out_state.length = 0;
			return ret;
		}
		if context.is_empty() {
			return ret;
		}

		self.resume_score(context, node, out_state, &mut ret);

		let keep = out_state.length();
		if keep > 1 {
			out_state.words[1..keep].copy_from_slice(&context[..keep - 1]);
		}
		ret
	}

	/// Scores bigrams and above, walking the context nearest word first.
	/// Does not include backoff.
	fn resume_score(&self, context: &[WordIndex], mut node: Node, out_state: &mut State, ret: &mut FullScoreReturn) {
		let longest_step = usize::from(self.order()) - 2;
		for (order_minus_2, &word) in context.iter().enumerate() {
			if ret.independent_left {
				return;
			}
			if order_minus_2 == longest_step {
				ret.independent_left = true;
				if let Some(prob) = self.search.lookup_longest(word, node) {
					ret.prob = prob;
					ret.rest = prob;
					ret.ngram_length = self.order();
				}
				return;
			}

			let (found, next) = self.search.lookup_middle(order_minus_2, word, node);
			let Some(weights) = found else {
				ret.independent_left = true;
				return;
			};
			node = next;
			out_state.backoff[order_minus_2 + 1] = weights.backoff;
			ret.prob = weights.prob;
			ret.rest = weights.rest();
			ret.ngram_length = (order_minus_2 + 2) as u8;
			ret.independent_left = weights.independent_left;
			ret.extend_left = node;
			if has_extension(weights.backoff) {
				out_state.length = ret.ngram_length;
			}
		}
	}
}
