//! Hash functions used to place both nodes and keys on the hash ring.
//!
//! Any `Fn(&[u8]) -> u64` can be used as a [`HashFunction`]. This is mostly useful for tests,
//! where a stub mapping known inputs to known positions makes ownership assertions trivial.
use murmur3::murmur3_x64_128;
use sha2::{Digest, Sha256 as Sha256Hasher};
use std::io::Cursor;

/// Every hash function returns a u64. Rings that use a narrower hash space mask the result.
pub type HashFunctionReturnType = u64;

/// Deterministic mapping from a byte slice to a position in the hash space.
///
/// Implementations should spread their outputs uniformly over the whole u64 range, since rings only keep
/// the low bits when configured with a hash width below 64.
pub trait HashFunction: Send + Sync {
    fn hash(&self, input: &[u8]) -> HashFunctionReturnType;
}

impl<F> HashFunction for F
where
    F: Fn(&[u8]) -> HashFunctionReturnType + Send + Sync,
{
    fn hash(&self, input: &[u8]) -> HashFunctionReturnType {
        self(input)
    }
}

/// Default hash function: murmur3 x64_128 (seed 0) truncated to its low 64 bits
#[derive(Clone, Copy, Debug, Default)]
pub struct Murmur3;

impl HashFunction for Murmur3 {
    fn hash(&self, input: &[u8]) -> HashFunctionReturnType {
        murmur3_hash(input)
    }
}

/// SHA-256 truncated to its first 8 bytes (big endian).
/// Slower than [`Murmur3`], but useful when node ids might be chosen adversarially.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256;

impl HashFunction for Sha256 {
    fn hash(&self, input: &[u8]) -> HashFunctionReturnType {
        sha256_hash(input)
    }
}

pub fn murmur3_hash(input: &[u8]) -> HashFunctionReturnType {
    // reading from an in-memory cursor can't fail
    let hash = murmur3_x64_128(&mut Cursor::new(input), 0).unwrap_or_default();
    hash as HashFunctionReturnType
}

pub fn sha256_hash(input: &[u8]) -> HashFunctionReturnType {
    let digest = Sha256Hasher::digest(input);
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    HashFunctionReturnType::from_be_bytes(prefix)
}

/// Returns the mask that reduces a hash to the lower `hash_width` bits
pub(crate) fn hash_space_mask(hash_width: u32) -> HashFunctionReturnType {
    if hash_width >= HashFunctionReturnType::BITS {
        HashFunctionReturnType::MAX
    } else {
        (1 << hash_width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_space_mask, murmur3_hash, sha256_hash, HashFunction, Murmur3, Sha256};
    use crate::utils::generate_random_ascii_string;

    #[quickcheck]
    fn test_hash_functions_are_deterministic(input: Vec<u8>) -> bool {
        Murmur3.hash(&input) == Murmur3.hash(&input) && Sha256.hash(&input) == Sha256.hash(&input)
    }

    #[test]
    fn test_struct_and_fn_agree() {
        for _ in 0..100 {
            let input = generate_random_ascii_string(16);
            assert_eq!(Murmur3.hash(input.as_bytes()), murmur3_hash(input.as_bytes()));
            assert_eq!(Sha256.hash(input.as_bytes()), sha256_hash(input.as_bytes()));
        }
    }

    #[test]
    fn test_sha256_known_value() {
        // sha256("abc") = ba7816bf 8f01cfea ...
        assert_eq!(sha256_hash(b"abc"), 0xba7816bf8f01cfea);
    }

    #[test]
    fn test_closures_are_hash_functions() {
        let constant = |_: &[u8]| 42u64;
        assert_eq!(constant.hash(b"anything"), 42);
    }

    #[test]
    fn test_hash_space_mask() {
        assert_eq!(hash_space_mask(1), 0b1);
        assert_eq!(hash_space_mask(8), 0xff);
        assert_eq!(hash_space_mask(32), u32::MAX as u64);
        assert_eq!(hash_space_mask(63), u64::MAX >> 1);
        assert_eq!(hash_space_mask(64), u64::MAX);
    }
}
