use serde::{Deserialize, Serialize};

/// Highest n-gram order this build can load.
///
/// `State` stores `MAX_ORDER - 1` context words inline, so raising this
/// grows every state.
pub const MAX_ORDER: usize = 6;

/// Options for loading a model.
///
/// Deserializable so outer layers (query strings, command-line flags)
/// can feed it directly. Missing fields take their default value.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
	/// Size multiplier for probing hash tables. Space is linear in this,
	/// time is `probing_multiplier / (probing_multiplier - 1)`.
	///
	/// A binary file records the multiplier it was built with and that value
	/// always wins when loading; this field only matters for size estimates.
	pub probing_multiplier: f32,

	/// Run the probing table consistency check on every table after loading.
	/// Linear in the model size.
	pub check_consistency: bool,

	/// Fail the load if `<s>` or `</s>` is missing from the vocabulary
	/// instead of silently mapping them to `<unk>`.
	pub require_sentence_markers: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			probing_multiplier: 1.5,
			check_consistency: false,
			require_sentence_markers: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_values() {
		let config = Config::default();
		assert_eq!(config.probing_multiplier, 1.5);
		assert!(!config.check_consistency);
		assert!(!config.require_sentence_markers);
	}
}
