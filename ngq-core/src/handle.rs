//! Opaque handle over a loaded model with sentinel-based failure reporting.
//!
//! The three functions here are the whole surface a foreign caller needs:
//! load a buffer, score sentences, release the model. Failures never cross
//! this boundary as typed errors.

use log::{debug, warn};

use crate::config::Config;
use crate::model::generic::ProbingModel;
use crate::model::state::State;

/// Returned by [`query`] when no score can be computed.
pub const QUERY_FAILURE: f32 = 0.0;

/// A loaded model owned by the caller until [`teardown`].
#[derive(Debug)]
pub struct ModelHandle {
	model: ProbingModel,
}

impl ModelHandle {
	pub fn model(&self) -> &ProbingModel {
		&self.model
	}
}

/// Loads a model from `bytes` with the default [`Config`].
///
/// # Errors
/// The message of the load failure.
pub fn init(bytes: &[u8]) -> Result<ModelHandle, String> {
	init_with_config(bytes, &Config::default())
}

/// Loads a model from `bytes`.
///
/// # Errors
/// The message of the load failure.
pub fn init_with_config(bytes: &[u8], config: &Config) -> Result<ModelHandle, String> {
	let model = ProbingModel::with_config(bytes, config).map_err(|e| e.to_string())?;
	Ok(ModelHandle { model })
}

/// Total log10 probability of `text` scored as a sentence: whitespace
/// separated tokens after `<s>`, then `</s>`.
///
/// # Returns
/// [`QUERY_FAILURE`] if `handle` is `None` or a token resolves to an id the
/// model cannot address.
pub fn query(handle: Option<&ModelHandle>, text: &str) -> f32 {
	let Some(handle) = handle else {
		warn!("query without a loaded model");
		return QUERY_FAILURE;
	};
	let model = &handle.model;
	let vocab = model.vocabulary();

	let mut state = *model.begin_sentence_state();
	let mut out = State::default();
	let mut total = 0.0;
	for index in text.split_whitespace().map(|w| vocab.index(w)).chain([vocab.end_sentence()]) {
		if index >= vocab.bound() {
			warn!("word id {index} is outside the vocabulary bound {}", vocab.bound());
			return QUERY_FAILURE;
		}
		total += model.score(&state, index, &mut out);
		state = out;
	}
	total
}

/// Releases a model obtained from [`init`].
pub fn teardown(handle: ModelHandle) {
	debug!("releasing {}-gram model", handle.model.order());
	drop(handle);
}
