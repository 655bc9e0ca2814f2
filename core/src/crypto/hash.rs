//! Empreintes Blake3
//!
//! Sert aux identifiants de transactions et aux sommes de contrôle des snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::CryptoError;
use super::CryptoResult;

pub const HASH_SIZE: usize = 32;

/// Empreinte de 256 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    pub fn new(data: [u8; HASH_SIZE]) -> Self {
        Self(data)
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; HASH_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidHashLength {
            expected: HASH_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Forme courte pour les logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub fn compute_blake3(data: &[u8]) -> Hash {
    Hash::new(*blake3::hash(data).as_bytes())
}

/// Empreinte de plusieurs segments, chacun préfixé par sa longueur.
///
/// Le préfixe évite que `["ab", "c"]` et `["a", "bc"]` produisent la même empreinte.
pub fn compute_blake3_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    Hash::new(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_from_invalid_bytes() {
        let result = Hash::from_bytes(&[0u8; 16]);
        assert!(matches!(
            result,
            Err(CryptoError::InvalidHashLength { expected: HASH_SIZE, actual: 16 })
        ));
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let original = compute_blake3(b"proposal-1");
        assert_eq!(Hash::from_hex(&original.to_hex()).unwrap(), original);
        assert_eq!(original.short().len(), 12);
    }

    #[test]
    fn test_parts_are_length_delimited() {
        let left = compute_blake3_parts(&[b"ab".as_slice(), b"c".as_slice()]);
        let right = compute_blake3_parts(&[b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(left, right);
        assert_ne!(left, compute_blake3(b"abc"));
    }
}
