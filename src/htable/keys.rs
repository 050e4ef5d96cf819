//! # Key and Value Capabilities
//!
//! The index stores fixed-size keys and values as raw bytes inside bucket
//! pages. This module defines the capability set an entry type needs
//! ([`EntryData`]) and the two injected behaviors the driver navigates
//! with: key equality ([`KeyComparator`]) and hashing ([`KeyHasher`]).
//!
//! ## EntryData
//!
//! An entry type must be a plain-old-data type that zerocopy can move in
//! and out of page bytes: `FromBytes + IntoBytes + Immutable + KnownLayout
//! + Copy`. All primitive integers qualify, as do `#[repr(C)]` structs of
//! them with the zerocopy derives. The bytes written are the type's native
//! representation; an index file is therefore tied to the layout of its
//! key and value types.
//!
//! ## Injected comparator and hasher
//!
//! Equality and hashing are construction-time parameters rather than trait
//! bounds on the key, so a caller can index case-folded strings, truncated
//! composites, or any other view of the key bytes without newtypes.
//! [`DefaultComparator`] and [`Xxh3KeyHasher`] cover the common case;
//! [`IdentityKeyHasher`] gives tests full control of bucket placement.

use std::marker::PhantomData;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Capability set for keys and values stored in bucket pages.
pub trait EntryData:
    FromBytes + IntoBytes + Immutable + KnownLayout + Copy + Send + Sync + 'static
{
}

impl<T> EntryData for T where
    T: FromBytes + IntoBytes + Immutable + KnownLayout + Copy + Send + Sync + 'static
{
}

/// Key equality, injected at index construction.
pub trait KeyComparator<K>: Send + Sync {
    fn matches(&self, a: &K, b: &K) -> bool;
}

/// Compares keys with `PartialEq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparator<K>(PhantomData<fn(K)>);

impl<K> DefaultComparator<K> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K: PartialEq + Send + Sync> KeyComparator<K> for DefaultComparator<K> {
    fn matches(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Key hashing, injected at index construction. The driver truncates the
/// 64-bit result to its low 32 bits.
pub trait KeyHasher<K>: Send + Sync {
    fn hash_key(&self, key: &K) -> u64;
}

/// Hashes the key's byte representation with xxh3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Xxh3KeyHasher;

impl<K: EntryData> KeyHasher<K> for Xxh3KeyHasher {
    fn hash_key(&self, key: &K) -> u64 {
        xxhash_rust::xxh3::xxh3_64(key.as_bytes())
    }
}

/// Uses the key itself as its hash. Only sensible for integer keys; tests
/// use it to steer entries into chosen directory slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityKeyHasher;

impl KeyHasher<u32> for IdentityKeyHasher {
    fn hash_key(&self, key: &u32) -> u64 {
        *key as u64
    }
}

impl KeyHasher<u64> for IdentityKeyHasher {
    fn hash_key(&self, key: &u64) -> u64 {
        *key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_comparator_uses_partial_eq() {
        let cmp = DefaultComparator::<u64>::new();

        assert!(cmp.matches(&3, &3));
        assert!(!cmp.matches(&3, &4));
    }

    #[test]
    fn xxh3_hasher_is_stable_per_key() {
        let hasher = Xxh3KeyHasher;

        let a = KeyHasher::<u64>::hash_key(&hasher, &42);
        let b = KeyHasher::<u64>::hash_key(&hasher, &42);
        let c = KeyHasher::<u64>::hash_key(&hasher, &43);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn identity_hasher_returns_key() {
        let hasher = IdentityKeyHasher;

        assert_eq!(KeyHasher::<u32>::hash_key(&hasher, &7), 7);
        assert_eq!(KeyHasher::<u64>::hash_key(&hasher, &u64::MAX), u64::MAX);
    }
}
