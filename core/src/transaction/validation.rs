//! Validation sans état des transactions
//!
//! Vérifications faites avant tout accès au ledger : taille encodée et
//! signature. Le nonce est vérifié par le runtime, qui connaît l'état.

use crate::error::TransactionError;
use super::types::Transaction;

/// Configuration pour la validation des transactions
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Taille maximum d'une transaction en bytes
    pub max_size: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_size: 64 * 1024, // 64KB
        }
    }
}

/// Validateur de transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionValidator {
    pub config: ValidationConfig,
}

impl TransactionValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Valide une transaction
    pub fn validate(&self, transaction: &Transaction) -> Result<(), TransactionError> {
        transaction.validate_with_config(&self.config)
    }
}

/// Trait pour les types qui peuvent être validés
pub trait Validatable {
    /// Valide l'objet avec la configuration par défaut
    fn validate(&self) -> Result<(), TransactionError> {
        self.validate_with_config(&ValidationConfig::default())
    }

    /// Valide l'objet avec une configuration spécifique
    fn validate_with_config(&self, config: &ValidationConfig) -> Result<(), TransactionError>;
}

impl Validatable for Transaction {
    fn validate_with_config(&self, config: &ValidationConfig) -> Result<(), TransactionError> {
        let size = self.size_bytes();
        if size > config.max_size {
            return Err(TransactionError::Malformed(format!(
                "taille {} > {} bytes",
                size, config.max_size
            )));
        }
        self.verify_signature()
    }
}
