/// Multiplication constant of MurmurHash64A.
const MURMUR_M: u64 = 0xc6a4a7935bd1e995;

/// Shift constant of MurmurHash64A.
const MURMUR_R: u32 = 47;

/// MurmurHash2, 64-bit version A (Austin Appleby).
///
/// Blocks are read as little-endian `u64`s so the result does not depend on
/// the host, which keeps vocabulary tables portable between machines.
///
/// # Notes
/// - The empty input hashes to `0` for seed `0`, which is also the empty-slot
///   key of every probing table.
pub fn murmur_hash_64a(key: &[u8], seed: u64) -> u64 {
	let mut h = seed ^ (key.len() as u64).wrapping_mul(MURMUR_M);

	let mut blocks = key.chunks_exact(8);
	for block in &mut blocks {
		// chunks_exact guarantees 8 bytes
		let mut k = u64::from_le_bytes(block.try_into().unwrap_or([0; 8]));
		k = k.wrapping_mul(MURMUR_M);
		k ^= k >> MURMUR_R;
		k = k.wrapping_mul(MURMUR_M);

		h ^= k;
		h = h.wrapping_mul(MURMUR_M);
	}

	let tail = blocks.remainder();
	if !tail.is_empty() {
		for (i, byte) in tail.iter().enumerate().rev() {
			h ^= u64::from(*byte) << (8 * i);
		}
		h = h.wrapping_mul(MURMUR_M);
	}

	h ^= h >> MURMUR_R;
	h = h.wrapping_mul(MURMUR_M);
	h ^= h >> MURMUR_R;
	h
}

/// Hash of a vocabulary word, as stored in the vocabulary table.
pub fn hash_for_vocab(word: &[u8]) -> u64 {
	murmur_hash_64a(word, 0)
}

/// Extends an n-gram search position by one more context word.
///
/// The key of `w1 .. wn` is obtained by starting from `wn as u64` and folding
/// in `w(n-1)`, then `w(n-2)`, down to `w1`.
#[inline]
pub fn combine_word_hash(current: u64, next: u32) -> u64 {
	current.wrapping_mul(8978948897894561157) ^ (1 + u64::from(next)).wrapping_mul(17894857484156487943)
}
