//! Recognition and header parsing of the binary model format.
//!
//! ```text
//! offset  size  field
//! 0       56    magic, zero filled
//! 56      12    0.0, 1.0, -0.5 as f32
//! 68      12    1, u32::MAX, 0 as u32
//! 80      8     1 as u64
//! 88      20    order, probing_multiplier, model_type, has_vocabulary, search_version
//! 108     8*n   n-gram counts
//!         ...   zero padding up to a multiple of 8
//! ```
//!
//! Everything is little-endian.

use std::fmt;

use crate::config::MAX_ORDER;
use crate::error::LoadError;
use crate::util::arena::{align8, read_f32, read_u32, read_u64, read_u8};

/// Common prefix of every version of the format.
pub const MAGIC_BEFORE_VERSION: &[u8] = b"mmap lm http://kheafield.com/code format version";

/// Magic of the current version, followed by the zero fill of the sanity
/// block.
pub const MAGIC_BYTES: &[u8] = b"mmap lm http://kheafield.com/code format version 5\n\0";

/// Written first by builders and replaced by the sanity block once the file
/// is complete. Shorter than [`MAGIC_BYTES`].
pub const MAGIC_INCOMPLETE: &[u8] = b"mmap lm http://kheafield.com/code incomplete\n";

pub const MAGIC_VERSION: i64 = 5;

/// Magic string slot: 53 bytes, padded to 8.
const MAGIC_SLOT: usize = 56;

/// Size of the sanity block.
pub const SANITY_SIZE: usize = 88;

/// Size of the sanity block written by obsolete 32-bit builds, where the
/// trailing `u64` was only 4-byte aligned.
pub const OLD_SANITY_SIZE: usize = 84;

/// Size of the fixed-width parameter block following the sanity block.
pub const FIXED_PARAMETERS_SIZE: usize = 20;

/// Sanity block every valid file starts with.
pub fn sanity_reference() -> [u8; SANITY_SIZE] {
	let mut block = [0u8; SANITY_SIZE];
	block[..MAGIC_BYTES.len()].copy_from_slice(MAGIC_BYTES);
	write_test_values(&mut block);
	block[76..80].copy_from_slice(&0u32.to_le_bytes());
	block[80..88].copy_from_slice(&1u64.to_le_bytes());
	block
}

/// Sanity block of obsolete 32-bit builds.
pub fn old_sanity_reference() -> [u8; OLD_SANITY_SIZE] {
	let mut block = [0u8; OLD_SANITY_SIZE];
	block[..MAGIC_BYTES.len()].copy_from_slice(MAGIC_BYTES);
	write_test_values(&mut block);
	block[76..84].copy_from_slice(&1u64.to_le_bytes());
	block
}

fn write_test_values(block: &mut [u8]) {
	block[MAGIC_SLOT..60].copy_from_slice(&0.0f32.to_le_bytes());
	block[60..64].copy_from_slice(&1.0f32.to_le_bytes());
	block[64..68].copy_from_slice(&(-0.5f32).to_le_bytes());
	block[68..72].copy_from_slice(&1u32.to_le_bytes());
	block[72..76].copy_from_slice(&u32::MAX.to_le_bytes());
}

/// Parses a decimal integer the way `strtol` does: leading whitespace, an
/// optional sign, then digits. Returns `None` when no digit follows.
fn parse_leading_long(bytes: &[u8]) -> Option<i64> {
	let mut rest = bytes;
	while let [b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c, tail @ ..] = rest {
		rest = tail;
	}
	let negative = match rest {
		[b'-', tail @ ..] => {
			rest = tail;
			true
		}
		[b'+', tail @ ..] => {
			rest = tail;
			false
		}
		_ => false,
	};
	let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
	if digits == 0 {
		return None;
	}
	let value = rest[..digits]
		.iter()
		.fold(0i64, |acc, digit| acc.saturating_mul(10).saturating_add(i64::from(digit - b'0')));
	Some(if negative { -value } else { value })
}

/// Decides whether `data` is a binary model this code understands.
///
/// # Returns
/// - `Ok(true)` if the sanity block matches exactly.
/// - `Ok(false)` if the buffer is not a binary model at all, so another
///   loader may try it.
///
/// # Errors
/// The buffer is a binary model that cannot be loaded: unfinished build,
/// other format version, obsolete 32-bit layout or mismatching test values.
pub fn is_binary_format(data: &[u8]) -> Result<bool, LoadError> {
	if data.len() <= SANITY_SIZE {
		return Ok(false);
	}
	if data[..SANITY_SIZE] == sanity_reference() {
		return Ok(true);
	}
	if data.starts_with(MAGIC_INCOMPLETE) {
		return Err(LoadError::Incomplete);
	}
	if data.starts_with(MAGIC_BEFORE_VERSION) {
		let tail = &data[MAGIC_BEFORE_VERSION.len()..SANITY_SIZE];
		if let Some(version) = parse_leading_long(tail) {
			if version != MAGIC_VERSION {
				return Err(LoadError::VersionMismatch {
					found: version,
					expected: MAGIC_VERSION,
				});
			}
		}
		if data[..OLD_SANITY_SIZE] == old_sanity_reference() {
			return Err(LoadError::Obsolete32Bit);
		}
		return Err(LoadError::SanityMismatch);
	}
	Ok(false)
}

/// Kind of search structure a binary file was built for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelType {
	Probing,
}

impl ModelType {
	/// Every model type this code knows about, indexed by its stored value.
	const ALL: [ModelType; 1] = [ModelType::Probing];

	pub fn from_raw(raw: u32) -> Option<Self> {
		Self::ALL.get(raw as usize).copied()
	}

	pub fn raw(self) -> u32 {
		match self {
			ModelType::Probing => 0,
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			ModelType::Probing => "probing hash tables",
		}
	}
}

impl fmt::Display for ModelType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Fixed-width block stored right after the sanity block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedWidthParameters {
	pub order: u8,
	pub probing_multiplier: f32,
	/// Raw model type; see [`ModelType::from_raw`].
	pub model_type: u32,
	/// Whether the file stores the vocabulary table.
	pub has_vocabulary: bool,
	pub search_version: u32,
}

impl FixedWidthParameters {
	fn read(block: &[u8]) -> Self {
		Self {
			order: read_u8(block, 0),
			probing_multiplier: read_f32(block, 4),
			model_type: read_u32(block, 8),
			has_vocabulary: read_u8(block, 12) != 0,
			search_version: read_u32(block, 16),
		}
	}
}

/// Parameters stored in the header of a binary file.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters {
	pub fixed: FixedWidthParameters,
	/// Number of n-grams of each order, unigrams first.
	pub counts: Vec<u64>,
}

impl Parameters {
	pub fn order(&self) -> usize {
		self.counts.len()
	}
}

/// Size of the whole header, sanity block and counts included.
pub fn total_header_size(order: usize) -> usize {
	align8(SANITY_SIZE + FIXED_PARAMETERS_SIZE + 8 * order)
}

/// Reads the parameter block and the counts of a recognized buffer.
///
/// # Errors
/// - [`LoadError::Truncated`] if the buffer ends inside the header.
/// - [`LoadError::ProbingMultiplier`] if the multiplier is below 1.0 or not
///   finite.
pub fn read_parameters(data: &[u8]) -> Result<Parameters, LoadError> {
	let counts_offset = SANITY_SIZE + FIXED_PARAMETERS_SIZE;
	if data.len() < counts_offset {
		return Err(LoadError::Truncated {
			what: "parameter block",
			offset: SANITY_SIZE,
			needed: FIXED_PARAMETERS_SIZE,
			size: data.len(),
		});
	}
	let fixed = FixedWidthParameters::read(&data[SANITY_SIZE..counts_offset]);
	// written so that NaN fails too
	if !(fixed.probing_multiplier >= 1.0 && fixed.probing_multiplier.is_finite()) {
		return Err(LoadError::ProbingMultiplier(fixed.probing_multiplier));
	}

	let order = usize::from(fixed.order);
	if data.len() < counts_offset + 8 * order {
		return Err(LoadError::Truncated {
			what: "n-gram counts",
			offset: counts_offset,
			needed: 8 * order,
			size: data.len(),
		});
	}
	let counts = (0..order).map(|n| read_u64(data, counts_offset + 8 * n)).collect();
	Ok(Parameters { fixed, counts })
}

/// Checks that the file was built for the search structure this code uses.
///
/// # Errors
/// [`LoadError::UnknownModelType`], [`LoadError::ModelTypeMismatch`] or
/// [`LoadError::SearchVersionMismatch`], each naming what was expected.
pub fn match_check(model_type: ModelType, search_version: u32, params: &Parameters) -> Result<(), LoadError> {
	let found = ModelType::from_raw(params.fixed.model_type).ok_or(LoadError::UnknownModelType(params.fixed.model_type))?;
	if found != model_type {
		return Err(LoadError::ModelTypeMismatch {
			found: found.name(),
			expected: model_type.name(),
		});
	}
	if params.fixed.search_version != search_version {
		return Err(LoadError::SearchVersionMismatch {
			name: found.name(),
			found: params.fixed.search_version,
			expected: search_version,
		});
	}
	Ok(())
}

/// Checks the counts against what this build can address.
///
/// # Errors
/// [`LoadError::EmptyModel`], [`LoadError::OrderTooHigh`] or
/// [`LoadError::CountOverflow`].
pub fn check_counts(counts: &[u64]) -> Result<(), LoadError> {
	if counts.is_empty() {
		return Err(LoadError::EmptyModel);
	}
	if counts.len() > MAX_ORDER {
		return Err(LoadError::OrderTooHigh {
			order: counts.len(),
			max: MAX_ORDER,
		});
	}
	for (n, &count) in counts.iter().enumerate() {
		if usize::try_from(count).is_err() {
			return Err(LoadError::CountOverflow { order: n + 1, count });
		}
	}
	Ok(())
}
