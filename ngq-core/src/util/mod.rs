//! Low-level building blocks shared by the model structures.

/// Owned backing buffer, bounds-checked spans and little-endian readers.
pub mod arena;

/// MurmurHash64A and the n-gram key combination hash.
pub mod hash;

/// Read-only linear probing hash table laid over an arena.
pub mod probing;
