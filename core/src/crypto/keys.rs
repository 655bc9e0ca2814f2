//! Gestion des clés cryptographiques pour ClimateDAO
//!
//! Utilise Ed25519 pour les signatures des transactions

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use crate::error::CryptoError;
use super::{Address, CryptoResult};

/// Taille d'une clé publique Ed25519 en bytes
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Taille d'une clé privée Ed25519 en bytes
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Clé publique Ed25519
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
}

/// Clé privée Ed25519
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

/// Paire de clés (publique + privée)
#[derive(Clone)]
pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl PublicKey {
    /// Crée une clé publique à partir de bytes
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidPublicKey);
        }

        let mut array = [0u8; PUBLIC_KEY_SIZE];
        array.copy_from_slice(bytes);

        let key = VerifyingKey::from_bytes(&array)
            .map_err(|_| CryptoError::InvalidPublicKey)?;

        Ok(Self { key })
    }

    /// Crée une clé publique à partir d'une string hexadécimale
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Retourne les bytes de la clé publique
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        self.key.as_bytes()
    }

    /// Retourne une représentation hexadécimale
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Adresse de compte dérivée de cette clé
    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }

    pub(crate) fn inner(&self) -> &VerifyingKey {
        &self.key
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        PublicKey::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

impl PrivateKey {
    /// Crée une clé privée à partir de bytes
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CryptoError::InvalidPrivateKey);
        }

        let mut array = [0u8; PRIVATE_KEY_SIZE];
        array.copy_from_slice(bytes);

        Ok(Self { key: SigningKey::from_bytes(&array) })
    }

    /// Crée une clé privée à partir d'une string hexadécimale
    pub fn from_hex(hex_str: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Retourne les bytes de la clé privée
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        self.key.as_bytes()
    }

    /// Obtient la clé publique correspondante
    pub fn public_key(&self) -> PublicKey {
        PublicKey { key: self.key.verifying_key() }
    }

    pub(crate) fn inner(&self) -> &SigningKey {
        &self.key
    }
}

// Debug pour PrivateKey ne doit pas révéler la clé
impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key", &"<hidden>")
            .finish()
    }
}

impl KeyPair {
    /// Crée une nouvelle paire de clés
    pub fn new(private_key: PrivateKey, public_key: PublicKey) -> Self {
        Self {
            private_key,
            public_key,
        }
    }

    /// Obtient la clé privée
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Obtient la clé publique
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Adresse de compte de la paire
    pub fn address(&self) -> Address {
        self.public_key.address()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<hidden>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Génère une nouvelle paire de clés aléatoire
pub fn generate_keypair() -> KeyPair {
    let mut csprng = OsRng;
    let signing_key = SigningKey::generate(&mut csprng);
    let public_key = PublicKey { key: signing_key.verifying_key() };

    KeyPair::new(PrivateKey { key: signing_key }, public_key)
}

/// Génère une paire de clés déterministe à partir d'une seed
pub fn generate_keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    let public_key = PublicKey { key: signing_key.verifying_key() };

    KeyPair::new(PrivateKey { key: signing_key }, public_key)
}
