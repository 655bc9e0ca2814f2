//! Adresses de comptes ClimateDAO
//!
//! Une adresse fait 20 bytes : les derniers bytes du Keccak-256 de la clé
//! publique, au format `0x` + hexadécimal minuscule.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use crate::error::CryptoError;
use super::{CryptoResult, PublicKey};

/// Taille d'une adresse en bytes
pub const ADDRESS_SIZE: usize = 20;

/// Adresse de compte sur le ledger
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_SIZE]);

impl Address {
    /// Adresse nulle
    pub const ZERO: Address = Address([0u8; ADDRESS_SIZE]);

    /// Crée une adresse à partir de bytes bruts
    pub const fn new(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(bytes)
    }

    /// Dérive l'adresse d'une clé publique Ed25519
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = Keccak256::digest(public_key.as_bytes());
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest[digest.len() - ADDRESS_SIZE..]);
        Self(bytes)
    }

    /// Adresse système déterministe (treasury, réserves)
    pub fn system(label: &str) -> Self {
        let digest = blake3::hash(format!("climatedao:system:{}", label).as_bytes());
        let mut bytes = [0u8; ADDRESS_SIZE];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_SIZE]);
        Self(bytes)
    }

    /// Parse une adresse hexadécimale, avec ou sans préfixe `0x`
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        let trimmed = hex_str
            .strip_prefix("0x")
            .or_else(|| hex_str.strip_prefix("0X"))
            .unwrap_or(hex_str);
        let bytes = hex::decode(trimmed)?;
        if bytes.len() != ADDRESS_SIZE {
            return Err(CryptoError::InvalidAddress(hex_str.to_string()));
        }
        let mut array = [0u8; ADDRESS_SIZE];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }

    /// Représentation `0x` + hexadécimal
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Retourne les bytes de l'adresse
    pub fn as_bytes(&self) -> &[u8; ADDRESS_SIZE] {
        &self.0
    }

    /// Vérifie si l'adresse est nulle
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> CryptoResult<Self> {
        Self::from_hex(s)
    }
}

impl From<&PublicKey> for Address {
    fn from(public_key: &PublicKey) -> Self {
        Self::from_public_key(public_key)
    }
}

// Sérialisée en string pour rester une clé de map JSON valide
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Address::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}
