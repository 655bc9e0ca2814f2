//! Module de sérialisation pour ClimateDAO
//!
//! Fournit la sérialisation bincode, CBOR et JSON, une enveloppe compressée
//! avec checksum, et les snapshots du runtime sur disque.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;
use crate::crypto::{compute_blake3, Address};
use crate::error::{Result, SerializationError};
use crate::governance::ClimateDao;
use crate::token::ClimateToken;

/// Version du format de snapshot
pub const SNAPSHOT_VERSION: u32 = 2;

/// Taille maximale acceptée à la décompression
const MAX_DECOMPRESSED_SIZE: usize = 256 * 1024 * 1024;

/// Formats de sérialisation supportés
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SerializationFormat {
    /// Bincode - Format binaire compact et rapide
    Bincode,
    /// CBOR - Format binaire standardisé pour l'interopérabilité
    Cbor,
    /// JSON - Format texte pour le debug et l'inspection
    Json,
}

/// Trait pour les objets sérialisables
pub trait Serializable: Serialize + DeserializeOwned {
    /// Sérialise l'objet dans le format spécifié
    fn to_bytes(&self, format: SerializationFormat) -> Result<Vec<u8>> {
        serialize_with_format(self, format)
    }

    /// Désérialise un objet depuis les bytes
    fn from_bytes(data: &[u8], format: SerializationFormat) -> Result<Self>
    where
        Self: Sized,
    {
        deserialize_with_format(data, format)
    }

    /// Calcule la taille sérialisée de l'objet
    fn serialized_size(&self, format: SerializationFormat) -> Result<usize> {
        match format {
            SerializationFormat::Bincode => Ok(bincode::serialized_size(self)
                .map_err(SerializationError::from)? as usize),
            SerializationFormat::Cbor | SerializationFormat::Json => Ok(self.to_bytes(format)?.len()),
        }
    }
}

/// Sérialise un objet avec le format spécifié
pub fn serialize_with_format<T: Serialize>(obj: &T, format: SerializationFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        SerializationFormat::Bincode => bincode::serialize(obj).map_err(SerializationError::from)?,
        SerializationFormat::Cbor => cbor4ii::serde::to_vec(Vec::new(), obj)
            .map_err(|e| SerializationError::Cbor(format!("{:?}", e)))?,
        SerializationFormat::Json => serde_json::to_vec(obj).map_err(SerializationError::from)?,
    };
    Ok(bytes)
}

/// Désérialise un objet depuis les bytes avec le format spécifié
pub fn deserialize_with_format<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T> {
    let obj = match format {
        SerializationFormat::Bincode => bincode::deserialize(data).map_err(SerializationError::from)?,
        SerializationFormat::Cbor => cbor4ii::serde::from_slice(data)
            .map_err(|e| SerializationError::Cbor(format!("{:?}", e)))?,
        SerializationFormat::Json => serde_json::from_slice(data).map_err(SerializationError::from)?,
    };
    Ok(obj)
}

/// Algorithmes de compression supportés
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Pas de compression
    None,
    /// Compression Gzip
    Gzip,
    /// Compression Zstandard
    Zstd,
}

/// Compresse des données
pub fn compress_data(data: &[u8], algorithm: CompressionAlgorithm) -> Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Gzip => {
            use std::io::Write;
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| SerializationError::Compression(e.to_string()))?;
            Ok(encoder
                .finish()
                .map_err(|e| SerializationError::Compression(e.to_string()))?)
        }
        CompressionAlgorithm::Zstd => Ok(zstd::bulk::compress(data, 3)
            .map_err(|e| SerializationError::Compression(e.to_string()))?),
    }
}

/// Décompresse des données
pub fn decompress_data(data: &[u8], algorithm: CompressionAlgorithm) -> Result<Vec<u8>> {
    match algorithm {
        CompressionAlgorithm::None => Ok(data.to_vec()),
        CompressionAlgorithm::Gzip => {
            use std::io::Read;
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut result = Vec::new();
            decoder
                .read_to_end(&mut result)
                .map_err(|e| SerializationError::Compression(e.to_string()))?;
            Ok(result)
        }
        CompressionAlgorithm::Zstd => Ok(zstd::bulk::decompress(data, MAX_DECOMPRESSED_SIZE)
            .map_err(|e| SerializationError::Compression(e.to_string()))?),
    }
}

/// Enveloppe de données sérialisées avec métadonnées
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedData {
    pub format: SerializationFormat,
    pub compression: CompressionAlgorithm,
    /// Données sérialisées (potentiellement compressées)
    pub data: Vec<u8>,
    /// Taille originale avant compression
    pub original_size: usize,
    /// Checksum Blake3 des données stockées
    pub checksum: crate::crypto::Hash,
    pub version: u32,
}

impl SerializedData {
    /// Sérialise puis compresse un objet
    pub fn from_object<T: Serialize>(
        obj: &T,
        format: SerializationFormat,
        compression: CompressionAlgorithm,
    ) -> Result<Self> {
        let serialized = serialize_with_format(obj, format)?;
        let original_size = serialized.len();
        let compressed = compress_data(&serialized, compression)?;
        let checksum = compute_blake3(&compressed);

        Ok(Self {
            format,
            compression,
            data: compressed,
            original_size,
            checksum,
            version: SNAPSHOT_VERSION,
        })
    }

    /// Vérifie, décompresse et désérialise
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T> {
        let calculated = compute_blake3(&self.data);
        if calculated != self.checksum {
            return Err(SerializationError::Integrity("checksum invalide".to_string()).into());
        }

        let decompressed = decompress_data(&self.data, self.compression)?;
        if decompressed.len() != self.original_size {
            return Err(SerializationError::Integrity(format!(
                "taille {} après décompression, {} attendus",
                decompressed.len(),
                self.original_size
            ))
            .into());
        }

        deserialize_with_format(&decompressed, self.format)
    }

    /// Ratio taille stockée / taille originale
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            1.0
        } else {
            self.data.len() as f64 / self.original_size as f64
        }
    }
}

/// État complet du runtime : DAO, ledger et nonces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    pub version: u32,
    pub dao: ClimateDao,
    pub token: ClimateToken,
    pub nonces: BTreeMap<Address, u64>,
}

impl RuntimeSnapshot {
    pub fn new(dao: ClimateDao, token: ClimateToken, nonces: BTreeMap<Address, u64>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            dao,
            token,
            nonces,
        }
    }

    /// Écrit le snapshot dans un fichier
    pub fn save(&self, path: &Path, format: SerializationFormat, compression: CompressionAlgorithm) -> Result<()> {
        let envelope = SerializedData::from_object(self, format, compression)?;
        let bytes = serialize_with_format(&envelope, SerializationFormat::Bincode)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        info!(
            "Snapshot écrit dans {} ({} bytes, {:?}/{:?})",
            path.display(),
            bytes.len(),
            format,
            compression
        );
        Ok(())
    }

    /// Lit un snapshot écrit par [`RuntimeSnapshot::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let envelope: SerializedData = deserialize_with_format(&bytes, SerializationFormat::Bincode)?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(SerializationError::Integrity(format!(
                "version de snapshot {} non supportée",
                envelope.version
            ))
            .into());
        }
        envelope.to_object()
    }
}

impl Serializable for RuntimeSnapshot {}
impl Serializable for crate::transaction::Transaction {}
impl Serializable for crate::runtime::Receipt {}
