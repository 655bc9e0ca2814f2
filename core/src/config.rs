//! Configuration de ClimateDAO
//!
//! Les constantes du protocole (bornes des propositions, quorum, frais,
//! supply, faucet, staking) vivent dans les `Default` des structures
//! ci-dessous. Un fichier TOML peut surcharger n'importe quelle section.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::error::ConfigError;

/// Montant minimum d'une proposition
pub const MIN_PROPOSAL_AMOUNT: u64 = 1_000;

/// Montant maximum d'une proposition
pub const MAX_PROPOSAL_AMOUNT: u64 = 1_000_000;

/// Dénominateur des basis points
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Secondes dans une année de 365 jours
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Niveau de log par défaut
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration complète d'un déploiement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClimateDaoConfig {
    /// Paramètres de gouvernance
    #[serde(default)]
    pub dao: DaoConfig,
    /// Paramètres du token
    #[serde(default)]
    pub token: TokenConfig,
    /// Paramètres de logs
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Paramètres de gouvernance et de trésorerie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    /// Montant minimum demandable
    pub min_proposal_amount: u64,
    /// Montant maximum demandable
    pub max_proposal_amount: u64,
    /// Durée de la période de vote (secondes)
    pub voting_period_secs: u64,
    /// Durée maximale d'un projet financé (jours)
    pub max_project_duration_days: u32,
    /// Poids total minimum (pour + contre + abstention) pour adopter
    pub quorum_threshold: u64,
    /// Frais de plateforme initiaux (bps)
    pub platform_fee_bps: u16,
    /// Plafond des frais de plateforme (bps)
    pub max_platform_fee_bps: u16,
    /// Longueur maximale du titre
    pub max_title_length: usize,
    /// Longueur maximale de la description
    pub max_description_length: usize,
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            min_proposal_amount: MIN_PROPOSAL_AMOUNT,
            max_proposal_amount: MAX_PROPOSAL_AMOUNT,
            voting_period_secs: 7 * 24 * 3600, // 7 jours de vote
            max_project_duration_days: 3 * 365,
            quorum_threshold: 10_000,
            platform_fee_bps: 250,             // 2.5%
            max_platform_fee_bps: 1_000,       // 10% maximum
            max_title_length: 200,
            max_description_length: 5_000,
        }
    }
}

/// Paramètres du token et du staking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Nom du token
    pub name: String,
    /// Symbole du token
    pub symbol: String,
    /// Décimales d'affichage uniquement : les montants du ledger sont des
    /// unités entières et aucune opération ne les met à l'échelle
    pub decimals: u8,
    /// Supply totale, mintée une seule fois à la genèse
    pub total_supply: u64,
    /// Allocation de la réserve du faucet
    pub faucet_allocation: u64,
    /// Montant distribué par réclamation
    pub claim_amount: u64,
    /// Allocation du pool de récompenses de staking
    pub rewards_allocation: u64,
    /// Taux annuel de récompense (bps)
    pub reward_rate_bps: u64,
    /// Stake minimum par opération
    pub min_stake: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Climate Token".to_string(),
            symbol: "CLIMATE".to_string(),
            decimals: 0,
            total_supply: 1_000_000_000,
            faucet_allocation: 100_000_000,
            claim_amount: 1_000,
            rewards_allocation: 100_000_000,
            reward_rate_bps: 1_000, // 10% annuel
            min_stake: 1,
        }
    }
}

/// Paramètres de logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filtre de niveau (trace, debug, info, warn, error ou directive EnvFilter)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ClimateDaoConfig {
    /// Parse une configuration TOML et la valide
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClimateDaoConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un fichier TOML
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Sauvegarde la configuration au format TOML
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Vérifie la cohérence des paramètres
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dao = &self.dao;
        if dao.min_proposal_amount == 0 {
            return Err(ConfigError::Invalid("min_proposal_amount doit être > 0".to_string()));
        }
        if dao.min_proposal_amount > dao.max_proposal_amount {
            return Err(ConfigError::Invalid(format!(
                "min_proposal_amount {} > max_proposal_amount {}",
                dao.min_proposal_amount, dao.max_proposal_amount
            )));
        }
        if dao.voting_period_secs == 0 {
            return Err(ConfigError::Invalid("voting_period_secs doit être > 0".to_string()));
        }
        if u64::from(dao.max_platform_fee_bps) > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid(format!(
                "max_platform_fee_bps {} > {}",
                dao.max_platform_fee_bps, BPS_DENOMINATOR
            )));
        }
        if dao.platform_fee_bps > dao.max_platform_fee_bps {
            return Err(ConfigError::Invalid(format!(
                "platform_fee_bps {} > max_platform_fee_bps {}",
                dao.platform_fee_bps, dao.max_platform_fee_bps
            )));
        }

        let token = &self.token;
        let allocated = token
            .faucet_allocation
            .checked_add(token.rewards_allocation)
            .ok_or_else(|| ConfigError::Invalid("allocations en dépassement".to_string()))?;
        if allocated > token.total_supply {
            return Err(ConfigError::Invalid(format!(
                "allocations {} > total_supply {}",
                allocated, token.total_supply
            )));
        }
        if token.claim_amount == 0 {
            return Err(ConfigError::Invalid("claim_amount doit être > 0".to_string()));
        }
        if token.min_stake == 0 {
            return Err(ConfigError::Invalid("min_stake doit être > 0".to_string()));
        }

        Ok(())
    }
}
