//! Module du token CLIMATE pour ClimateDAO
//!
//! Ce module implémente le ledger fongible sur lequel la gouvernance règle
//! ses fonds :
//! - Token CLIMATE à supply fixe, mintée une seule fois à la genèse
//! - Transferts et allocations façon ERC-20
//! - Faucet : une réclamation unique par adresse
//! - Staking avec récompenses linéaires dans le temps

pub mod climate_token;
pub mod staking;

pub use climate_token::{ClimateToken, TokenMetadata, TokenStatistics, VoteLock};
pub use staking::{linear_reward, StakeInfo, StakingLedger};

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::crypto::Address;
use crate::error::TokenError;

/// Résultat des opérations token
pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Label de l'adresse système de la réserve du faucet
pub const FAUCET_RESERVE_LABEL: &str = "faucet-reserve";

/// Label de l'adresse système du pool de récompenses
pub const REWARDS_POOL_LABEL: &str = "staking-rewards-pool";

/// Événement émis lors des opérations token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEvent {
    /// Type d'événement
    pub event_type: TokenEventType,
    /// Timestamp de l'événement
    pub timestamp: DateTime<Utc>,
}

/// Types d'événements token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEventType {
    /// Transfert de tokens (`from` nul pour la genèse)
    Transfer {
        from: Address,
        to: Address,
        amount: u64,
    },
    /// Allocation accordée à un spender
    Approval {
        owner: Address,
        spender: Address,
        amount: u64,
    },
    /// Réclamation du faucet
    Claimed {
        claimant: Address,
        amount: u64,
    },
    /// Tokens stakés
    Staked {
        staker: Address,
        amount: u64,
    },
    /// Tokens retirés du staking
    Unstaked {
        staker: Address,
        amount: u64,
    },
    /// Récompenses de staking versées
    RewardsPaid {
        staker: Address,
        amount: u64,
    },
}

impl TokenEventType {
    /// Indique si l'événement concerne l'adresse donnée
    pub fn involves(&self, address: &Address) -> bool {
        match self {
            TokenEventType::Transfer { from, to, .. } => from == address || to == address,
            TokenEventType::Approval { owner, spender, .. } => owner == address || spender == address,
            TokenEventType::Claimed { claimant, .. } => claimant == address,
            TokenEventType::Staked { staker, .. }
            | TokenEventType::Unstaked { staker, .. }
            | TokenEventType::RewardsPaid { staker, .. } => staker == address,
        }
    }
}

/// Adresse de la réserve du faucet
pub fn faucet_reserve_address() -> Address {
    Address::system(FAUCET_RESERVE_LABEL)
}

/// Adresse du pool de récompenses de staking
pub fn rewards_pool_address() -> Address {
    Address::system(REWARDS_POOL_LABEL)
}
