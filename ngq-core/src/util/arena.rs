use std::sync::Arc;

use crate::error::LoadError;

/// Rounds `size` up to the next multiple of 8.
pub const fn align8(size: usize) -> usize {
	size.div_ceil(8) * 8
}

/// A byte range inside an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
	pub offset: usize,
	pub len: usize,
}

impl Span {
	/// First byte past the span.
	pub fn end(&self) -> usize {
		self.offset + self.len
	}
}

/// Owned, immutable backing buffer of a loaded model.
///
/// Every structure of the model keeps a cheap clone of the arena plus a
/// [`Span`] describing its own bytes. Spans are validated once when they are
/// carved out, so later reads through [`Arena::slice`] stay in bounds.
#[derive(Clone, Debug)]
pub struct Arena {
	bytes: Arc<[u8]>,
}

impl Arena {
	/// Moves or copies `bytes` into the reference-counted buffer. This is
	/// the only copy a load makes.
	pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
		Self { bytes: bytes.into() }
	}

	pub fn len(&self) -> usize {
		self.bytes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// The whole buffer.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Carves `len` bytes starting at `offset`.
	///
	/// # Errors
	/// Returns [`LoadError::Truncated`] if the range does not fit the buffer.
	pub fn span(&self, offset: usize, len: usize, what: &'static str) -> Result<Span, LoadError> {
		match offset.checked_add(len) {
			Some(end) if end <= self.bytes.len() => Ok(Span { offset, len }),
			_ => Err(LoadError::Truncated {
				what,
				offset,
				needed: len,
				size: self.bytes.len(),
			}),
		}
	}

	/// Bytes of a span obtained from [`Arena::span`].
	#[inline]
	pub fn slice(&self, span: Span) -> &[u8] {
		&self.bytes[span.offset..span.end()]
	}
}

/// Converts a computed structure size into a length, failing instead of
/// wrapping.
///
/// # Errors
/// [`LoadError::SizeOverflow`] if `size` is `None` or exceeds `usize`.
pub fn byte_len(size: Option<u64>, what: &'static str) -> Result<usize, LoadError> {
	size.and_then(|s| usize::try_from(s).ok())
		.ok_or(LoadError::SizeOverflow { what })
}

#[inline]
pub fn read_u8(bytes: &[u8], at: usize) -> u8 {
	bytes[at]
}

#[inline]
pub fn read_u32(bytes: &[u8], at: usize) -> u32 {
	u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
pub fn read_f32(bytes: &[u8], at: usize) -> f32 {
	f32::from_bits(read_u32(bytes, at))
}

#[inline]
pub fn read_u64(bytes: &[u8], at: usize) -> u64 {
	let mut raw = [0u8; 8];
	raw.copy_from_slice(&bytes[at..at + 8]);
	u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn align8_rounds_up() {
		assert_eq!(align8(0), 0);
		assert_eq!(align8(1), 8);
		assert_eq!(align8(8), 8);
		assert_eq!(align8(53), 56);
		assert_eq!(align8(116), 120);
	}

	#[test]
	fn span_is_bounds_checked() {
		let arena = Arena::new(vec![0u8; 16]);
		assert_eq!(arena.span(8, 8, "tail").unwrap(), Span { offset: 8, len: 8 });
		assert!(matches!(
			arena.span(9, 8, "tail"),
			Err(LoadError::Truncated { offset: 9, needed: 8, size: 16, .. })
		));
		assert!(arena.span(usize::MAX, 2, "overflow").is_err());
	}

	#[test]
	fn byte_len_rejects_overflow() {
		assert_eq!(byte_len(Some(24), "table").unwrap(), 24);
		assert!(matches!(byte_len(None, "table"), Err(LoadError::SizeOverflow { what: "table" })));
	}

	#[test]
	fn little_endian_reads() {
		let bytes = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0xbf, 0xff];
		assert_eq!(read_u32(&bytes, 0), 1);
		assert_eq!(read_f32(&bytes, 4), -1.0);
		assert_eq!(read_u64(&bytes, 0), 0xbf80_0000_0000_0001);
		assert_eq!(read_u8(&bytes, 8), 0xff);
	}
}
