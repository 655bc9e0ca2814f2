//! Module cryptographique pour ClimateDAO
//!
//! Fournit les primitives cryptographiques du ledger :
//! - Empreintes Blake3
//! - Signatures numériques (Ed25519)
//! - Gestion des clés
//! - Adresses de comptes (20 bytes, dérivées Keccak-256)

pub mod address;
pub mod hash;
pub mod keys;
pub mod signature;

pub use address::{Address, ADDRESS_SIZE};
pub use hash::{compute_blake3, compute_blake3_parts, Hash, HASH_SIZE};
pub use keys::{generate_keypair, generate_keypair_from_seed, KeyPair, PrivateKey, PublicKey};
pub use signature::{sign_data, verify_signature, Signature};

use crate::error::CryptoError;

/// Résultat des opérations cryptographiques
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = generate_keypair();
        let data = b"message to sign";

        let signature = sign_data(data, keypair.private_key());
        assert!(verify_signature(data, &signature, keypair.public_key()));
    }
}
