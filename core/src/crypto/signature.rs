//! Module de signatures numériques pour ClimateDAO
//!
//! Utilise Ed25519 pour signer et vérifier les transactions

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ed25519_dalek::{Signer, Verifier};
use std::fmt;
use crate::error::CryptoError;
use super::keys::{PrivateKey, PublicKey};
use super::CryptoResult;

/// Taille d'une signature Ed25519 en bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Signature numérique Ed25519
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; SIGNATURE_SIZE],
}

impl Signature {
    /// Crée une signature à partir d'un array de bytes
    pub fn new(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self { bytes }
    }

    /// Crée une signature à partir d'un slice de bytes
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(CryptoError::InvalidSignature);
        }

        let mut array = [0u8; SIGNATURE_SIZE];
        array.copy_from_slice(bytes);
        Ok(Self { bytes: array })
    }

    /// Crée une signature à partir d'une string hexadécimale
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Retourne les bytes de la signature
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.bytes
    }

    /// Retourne une représentation hexadécimale
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Signature::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Signe des données avec une clé privée
pub fn sign_data(data: &[u8], private_key: &PrivateKey) -> Signature {
    Signature::new(private_key.inner().sign(data).to_bytes())
}

/// Vérifie une signature avec une clé publique
pub fn verify_signature(data: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let ed25519_signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    public_key.inner().verify(data, &ed25519_signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_keypair;

    #[test]
    fn test_signature_from_invalid_bytes() {
        let result = Signature::from_bytes(&[0u8; 32]);
        assert_eq!(result, Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let signature = Signature::new([0x12u8; SIGNATURE_SIZE]);
        let recovered = Signature::from_hex(&signature.to_hex()).unwrap();
        assert_eq!(signature, recovered);
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = generate_keypair();
        let data = b"vote:1:for";

        let signature = sign_data(data, keypair.private_key());
        assert!(verify_signature(data, &signature, keypair.public_key()));
    }

    #[test]
    fn test_verify_with_wrong_key() {
        let keypair1 = generate_keypair();
        let keypair2 = generate_keypair();
        let data = b"donate:500";

        let signature = sign_data(data, keypair1.private_key());
        assert!(!verify_signature(data, &signature, keypair2.public_key()));
    }

    #[test]
    fn test_verify_tampered_data() {
        let keypair = generate_keypair();
        let signature = sign_data(b"donate:500", keypair.private_key());
        assert!(!verify_signature(b"donate:5000", &signature, keypair.public_key()));
    }

    #[test]
    fn test_zero_signature_never_verifies() {
        let keypair = generate_keypair();
        assert!(!verify_signature(b"anything", &Signature::new([0u8; SIGNATURE_SIZE]), keypair.public_key()));
    }
}
