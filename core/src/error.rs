//! Types d'erreurs pour ClimateDAO Core

use chrono::{DateTime, Utc};
use thiserror::Error;
use crate::crypto::Address;
use crate::governance::{ProposalId, ProposalStatus};

/// Type de résultat standard pour le module core
pub type Result<T> = std::result::Result<T, CoreError>;

/// Erreurs principales du module core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Erreur cryptographique: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Erreur de gouvernance: {0}")]
    Dao(#[from] DaoError),

    #[error("Erreur de token: {0}")]
    Token(#[from] TokenError),

    #[error("Erreur de transaction: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Erreur de sérialisation: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Erreur de configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Erreur d'entrée/sortie: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Raison de revert lisible, telle qu'enregistrée dans les reçus
    pub fn revert_reason(&self) -> String {
        match self {
            CoreError::Dao(err) => err.to_string(),
            CoreError::Token(err) => err.to_string(),
            CoreError::Transaction(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

/// Erreurs cryptographiques
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CryptoError {
    #[error("Signature invalide")]
    InvalidSignature,

    #[error("Clé publique invalide")]
    InvalidPublicKey,

    #[error("Clé privée invalide")]
    InvalidPrivateKey,

    #[error("Adresse invalide: {0}")]
    InvalidAddress(String),

    #[error("Hash invalide: longueur attendue {expected}, reçue {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    #[error("Erreur de décodage hexadécimal: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

/// Conditions de revert de la gouvernance
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaoError {
    #[error("Montant sous le minimum: {amount} < {minimum}")]
    AmountBelowMinimum { amount: u64, minimum: u64 },

    #[error("Montant au-dessus du maximum: {amount} > {maximum}")]
    AmountAboveMaximum { amount: u64, maximum: u64 },

    #[error("Champ requis vide: {field}")]
    EmptyField { field: &'static str },

    #[error("Champ trop long: {field} ({length} > {max})")]
    FieldTooLong { field: &'static str, length: usize, max: usize },

    #[error("Durée invalide: {days} jours (maximum {max})")]
    InvalidDuration { days: u32, max: u32 },

    #[error("Adresse nulle interdite pour {field}")]
    ZeroAddress { field: &'static str },

    #[error("Appelant non autorisé: {caller}")]
    Unauthorized { caller: Address },

    #[error("Vote déjà enregistré pour {voter} sur la proposition {proposal_id}")]
    AlreadyVoted { proposal_id: ProposalId, voter: Address },

    #[error("Période de vote fermée pour la proposition {proposal_id}")]
    VotingClosed { proposal_id: ProposalId },

    #[error("Période de vote encore ouverte pour la proposition {proposal_id}")]
    VotingStillOpen { proposal_id: ProposalId },

    #[error("Proposition non trouvée: {proposal_id}")]
    ProposalNotFound { proposal_id: ProposalId },

    #[error("Proposition {proposal_id} non adoptée (statut {status:?})")]
    ProposalNotPassed { proposal_id: ProposalId, status: ProposalStatus },

    #[error("Proposition {proposal_id} déjà exécutée")]
    AlreadyExecuted { proposal_id: ProposalId },

    #[error("Proposition {proposal_id} non exécutée")]
    NotExecuted { proposal_id: ProposalId },

    #[error("Choix de vote invalide: {0}")]
    InvalidVoteChoice(u8),

    #[error("Poids de vote nul")]
    ZeroWeight,

    #[error("Montant de don nul")]
    ZeroDonation,

    #[error("Fonds insuffisants: requis {required}, disponible {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Frais de plateforme trop élevés: {fee_bps} > {max_bps} bps")]
    FeeTooHigh { fee_bps: u16, max_bps: u16 },

    #[error("Modérateur déjà enregistré: {0}")]
    ModeratorAlreadyExists(Address),

    #[error("Modérateur inconnu: {0}")]
    ModeratorNotFound(Address),

    #[error("Opération token échouée: {0}")]
    Token(#[from] TokenError),
}

/// Erreurs du ledger de token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Solde insuffisant: requis {required}, disponible {available}")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("Allocation insuffisante: requis {required}, disponible {available}")]
    InsufficientAllowance { required: u64, available: u64 },

    #[error("Montant invalide: {amount}")]
    InvalidAmount { amount: u64 },

    #[error("Destinataire invalide: {0}")]
    InvalidRecipient(Address),

    #[error("Tokens déjà réclamés par {0}")]
    AlreadyClaimed(Address),

    #[error("Réserve du faucet épuisée: requis {required}, disponible {available}")]
    FaucetDepleted { required: u64, available: u64 },

    #[error("Stake minimum non atteint: requis {required}, fourni {provided}")]
    StakeBelowMinimum { required: u64, provided: u64 },

    #[error("Stake insuffisant: requis {required}, staké {staked}")]
    InsufficientStake { required: u64, staked: u64 },

    #[error("Tokens engagés dans un vote jusqu'au {until}: requis {required}, libres {available}")]
    VotesLocked {
        required: u64,
        available: u64,
        until: DateTime<Utc>,
    },

    #[error("Aucune récompense à réclamer pour {0}")]
    NoRewards(Address),

    #[error("Pool de récompenses insuffisant: requis {required}, disponible {available}")]
    InsufficientRewardPool { required: u64, available: u64 },

    #[error("Dépassement de la supply: allocations {allocated} > supply {supply}")]
    SupplyExceeded { allocated: u64, supply: u64 },

    #[error("Intégrité du ledger compromise: comptabilisé {accounted}, supply {supply}")]
    IntegrityViolation { accounted: u128, supply: u64 },

    #[error("Dépassement arithmétique")]
    Overflow,
}

/// Erreurs de transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Signature de transaction invalide")]
    InvalidSignature,

    #[error("Nonce invalide: attendu {expected}, reçu {actual}")]
    InvalidNonce { expected: u64, actual: u64 },

    #[error("Transaction invalide: {0}")]
    Malformed(String),
}

/// Erreurs de sérialisation
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Erreur bincode: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Erreur CBOR: {0}")]
    Cbor(String),

    #[error("Erreur JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Erreur de compression: {0}")]
    Compression(String),

    #[error("Données corrompues: {0}")]
    Integrity(String),
}

/// Erreurs de configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Lecture du fichier de configuration impossible: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration TOML invalide: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Écriture TOML impossible: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration incohérente: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dao_error_wraps_token_error() {
        let err: DaoError = TokenError::InvalidAmount { amount: 0 }.into();
        assert!(matches!(err, DaoError::Token(TokenError::InvalidAmount { amount: 0 })));
    }

    #[test]
    fn test_revert_reason_is_inner_message() {
        let err: CoreError = DaoError::ZeroWeight.into();
        assert_eq!(err.revert_reason(), DaoError::ZeroWeight.to_string());
    }

    #[test]
    fn test_amount_below_minimum_message() {
        let err = DaoError::AmountBelowMinimum { amount: 500, minimum: 1_000 };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("1000"));
    }
}
