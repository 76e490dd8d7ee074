use serde::Serialize;

use crate::model::generic::GenericModel;
use crate::model::search::Search;
use crate::model::state::State;
use crate::model::vocab::{WordIndex, END_SENTENCE};

/// Score of one token inside a sentence.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct WordScore {
	pub word: String,
	pub index: WordIndex,
	pub ngram_length: u8,
	/// log10 probability, backoff included.
	pub prob: f32,
}

impl WordScore {
	/// Whether the word resolved to `<unk>`.
	pub fn is_oov(&self) -> bool {
		self.index == 0
	}
}

/// Scores of every token of a sentence, `</s>` included when scored with
/// sentence context.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct SentenceScore {
	pub words: Vec<WordScore>,
	/// Sum of every word probability.
	pub total: f32,
	/// Number of words that resolved to `<unk>`.
	pub oov: usize,
}

impl SentenceScore {
	/// Sum of the probabilities of the out-of-vocabulary words only.
	pub fn oov_total(&self) -> f32 {
		self.words.iter().filter(|w| w.is_oov()).map(|w| w.prob).sum()
	}
}

/// Running totals over many sentences, for perplexity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CorpusStats {
	pub total: f64,
	pub oov_total: f64,
	pub tokens: usize,
	pub oov: usize,
}

impl CorpusStats {
	pub fn add(&mut self, sentence: &SentenceScore) {
		self.total += f64::from(sentence.total);
		self.oov_total += f64::from(sentence.oov_total());
		self.tokens += sentence.words.len();
		self.oov += sentence.oov;
	}

	/// Perplexity over every token.
	pub fn perplexity(&self) -> f64 {
		perplexity(self.total, self.tokens)
	}

	/// Perplexity over in-vocabulary tokens only.
	pub fn perplexity_excluding_oov(&self) -> f64 {
		perplexity(self.total - self.oov_total, self.tokens - self.oov)
	}
}

/// `10^(-total / tokens)` for a log10 total; infinite for zero tokens.
pub fn perplexity(total: f64, tokens: usize) -> f64 {
	if tokens == 0 {
		return f64::INFINITY;
	}
	10f64.powf(-total / tokens as f64)
}

impl<S: Search> GenericModel<S> {
	/// Scores a sequence of words left to right.
	///
	/// # Parameters
	/// - `words`: tokens, already split.
	/// - `sentence_context`: start from `<s>` and finish by scoring `</s>`;
	///   otherwise start without context and stop after the last word.
	pub fn score_words<'a, I>(&self, words: I, sentence_context: bool) -> SentenceScore
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut state = if sentence_context {
			*self.begin_sentence_state()
		} else {
			*self.null_context_state()
		};
		let mut out = State::default();
		let mut sentence = SentenceScore::default();

		let mut push = |word: &str, index: WordIndex, state: &mut State, out: &mut State| {
			let ret = self.full_score(state, index, out);
			*state = *out;
			sentence.total += ret.prob;
			if index == 0 {
				sentence.oov += 1;
			}
			sentence.words.push(WordScore {
				word: word.to_owned(),
				index,
				ngram_length: ret.ngram_length,
				prob: ret.prob,
			});
		};

		for word in words {
			let index = self.vocabulary().index(word);
			push(word, index, &mut state, &mut out);
		}
		if sentence_context {
			let end = self.vocabulary().end_sentence();
			push(END_SENTENCE, end, &mut state, &mut out);
		}
		sentence
	}

	/// Splits `text` on whitespace and scores it with [`GenericModel::score_words`].
	pub fn score_sentence(&self, text: &str, sentence_context: bool) -> SentenceScore {
		self.score_words(text.split_whitespace(), sentence_context)
	}
}
