use std::fmt;
use std::marker::PhantomData;

use crate::error::ProbingError;
use crate::util::arena::{Arena, Span};

/// Key marking an empty bucket.
pub const EMPTY_KEY: u64 = 0;

/// Fixed-size record stored in a [`ProbingTable`].
///
/// Implementors describe how one entry is laid out in the buffer: its size
/// in bytes, where the 64-bit key lives and how to decode the value.
pub trait ProbingEntry {
	/// Size of one entry in bytes.
	const SIZE: usize;

	type Value: Copy;

	fn key(raw: &[u8]) -> u64;

	fn value(raw: &[u8]) -> Self::Value;
}

/// Number of buckets a table holding `entries` keys is built with.
///
/// Always at least `entries + 1`, so there is one empty bucket and a probe
/// for an absent key terminates. Saturates at `u64::MAX` instead of
/// wrapping.
pub fn bucket_count(entries: u64, multiplier: f32) -> u64 {
	// float to integer casts saturate, infinity included
	let scaled = (multiplier * entries as f32).ceil() as u64;
	entries.saturating_add(1).max(scaled)
}

/// Read-only hash table with linear probing over a span of an arena.
///
/// The table never allocates, resizes or deletes: it is placed over bytes
/// written by a builder. Keys are already hashes, so the ideal bucket of a
/// key is `key % buckets`.
///
/// Every stored entry must lie on the forward probe path from its ideal
/// bucket without an empty bucket in between; [`ProbingTable::check_consistency`]
/// verifies this.
pub struct ProbingTable<E> {
	arena: Arena,
	span: Span,
	buckets: usize,
	_entry: PhantomData<E>,
}

impl<E> Clone for ProbingTable<E> {
	fn clone(&self) -> Self {
		Self {
			arena: self.arena.clone(),
			span: self.span,
			buckets: self.buckets,
			_entry: PhantomData,
		}
	}
}

impl<E> fmt::Debug for ProbingTable<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProbingTable")
			.field("span", &self.span)
			.field("buckets", &self.buckets)
			.finish()
	}
}

impl<E: ProbingEntry> ProbingTable<E> {
	/// Bytes taken by a table holding `entries` keys, `None` on overflow.
	pub fn size(entries: u64, multiplier: f32) -> Option<u64> {
		bucket_count(entries, multiplier).checked_mul(E::SIZE as u64)
	}

	/// Places a table over `span`. The bucket count is derived from the
	/// span length.
	pub fn new(arena: Arena, span: Span) -> Self {
		Self {
			buckets: span.len / E::SIZE,
			arena,
			span,
			_entry: PhantomData,
		}
	}

	pub fn buckets(&self) -> usize {
		self.buckets
	}

	#[inline]
	fn entry<'b>(&self, bytes: &'b [u8], bucket: usize) -> &'b [u8] {
		let start = bucket * E::SIZE;
		&bytes[start..start + E::SIZE]
	}

	#[inline]
	fn ideal(&self, key: u64) -> usize {
		(key % self.buckets as u64) as usize
	}

	/// Looks up `key`.
	///
	/// Visits at most `buckets` slots, so even a table without an empty
	/// bucket answers `None` for a missing key.
	pub fn find(&self, key: u64) -> Option<E::Value> {
		self.find_counting(key).0
	}

	/// Same as [`ProbingTable::find`], also returning the number of slots
	/// inspected.
	pub fn find_counting(&self, key: u64) -> (Option<E::Value>, usize) {
		if self.buckets == 0 {
			return (None, 0);
		}
		let bytes = self.arena.slice(self.span);
		let mut bucket = self.ideal(key);
		for probes in 1..=self.buckets {
			let raw = self.entry(bytes, bucket);
			let got = E::key(raw);
			if got == key {
				return (Some(E::value(raw)), probes);
			}
			if got == EMPTY_KEY {
				return (None, probes);
			}
			bucket += 1;
			if bucket == self.buckets {
				bucket = 0;
			}
		}
		(None, self.buckets)
	}

	/// Values of every occupied bucket, in bucket order.
	pub fn values(&self) -> impl Iterator<Item = E::Value> + '_ {
		let bytes = self.arena.slice(self.span);
		bytes
			.chunks_exact(E::SIZE)
			.filter(|raw| E::key(raw) != EMPTY_KEY)
			.map(E::value)
	}

	/// Checks that every entry is reachable from its ideal bucket.
	///
	/// # Errors
	/// - [`ProbingError::CompletelyFull`] if no bucket is empty.
	/// - [`ProbingError::Inconsistent`] for the first misplaced entry.
	pub fn check_consistency(&self) -> Result<(), ProbingError> {
		if self.buckets == 0 {
			return Err(ProbingError::CompletelyFull { buckets: 0 });
		}
		let bytes = self.arena.slice(self.span);
		let key_at = |bucket: usize| E::key(self.entry(bytes, bucket));

		let last_gap = (0..self.buckets)
			.rev()
			.find(|&bucket| key_at(bucket) == EMPTY_KEY)
			.ok_or(ProbingError::CompletelyFull { buckets: self.buckets })?;

		// Entries before the first gap may have wrapped around from the end.
		let mut position = 0;
		while key_at(position) != EMPTY_KEY {
			let ideal = self.ideal(key_at(position));
			if ideal > position && ideal <= last_gap {
				return Err(ProbingError::Inconsistent { position, ideal });
			}
			position += 1;
		}

		let mut pre_gap = position;
		for position in position..self.buckets {
			let key = key_at(position);
			if key == EMPTY_KEY {
				pre_gap = position;
				continue;
			}
			let ideal = self.ideal(key);
			if ideal > position || ideal <= pre_gap {
				return Err(ProbingError::Inconsistent { position, ideal });
			}
		}
		Ok(())
	}
}
