//! ClimateDAO Core Library
//!
//! Cœur de gouvernance de ClimateDAO : propositions de financement de projets
//! climatiques, vote pondéré par le token CLIMATE, quorum, libération des
//! fonds en deux phases et ledger du token.
//!
//! # Features
//!
//! - **Gouvernance** : propositions, vote pondéré, quorum figé à la création
//! - **Trésorerie** : dons, registre des contributions, frais de plateforme plafonnés
//! - **Token CLIMATE** : supply fixe, faucet à réclamation unique, staking linéaire
//! - **Transactions signées** : Ed25519, nonces anti-rejeu, exécution atomique
//! - **Snapshots** : bincode, CBOR ou JSON, compressés et vérifiés
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use climatedao_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClimateDaoConfig::default();
//!     climatedao_core::init_tracing_from(&config.logging);
//!
//!     let owner = generate_keypair();
//!     let runtime = DaoRuntime::new(&config, owner.address(), Utc::now())?;
//!     let service = DaoService::new(runtime, Arc::new(SystemClock));
//!
//!     let tx = Transaction::new(&owner, 0, Call::Donate { amount: 50_000 })?;
//!     let receipt = service.submit(tx).await?;
//!     println!("don accepté: {}", receipt.is_success());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`config`] - Paramètres du protocole et chargement TOML
//! - [`crypto`] - Hachage, clés Ed25519, adresses
//! - [`token`] - Ledger du token CLIMATE et staking
//! - [`governance`] - Propositions, votes, trésorerie, impact
//! - [`transaction`] - Appels signés
//! - [`runtime`] - Exécution atomique et reçus
//! - [`service`] - Accès asynchrone sérialisé
//! - [`serialization`] - Formats et snapshots

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crypto;
pub mod error;
pub mod governance;
pub mod runtime;
pub mod serialization;
pub mod service;
pub mod token;
pub mod transaction;

// Re-exports for convenience
pub use config::{ClimateDaoConfig, DaoConfig, LoggingConfig, TokenConfig};
pub use error::{CoreError, Result};
pub use governance::{ClimateDao, Proposal, ProposalDraft, ProposalId, ProposalStatus};
pub use runtime::{BlockContext, CallOutcome, DaoRuntime, Receipt};
pub use service::{Clock, DaoService, ManualClock, SystemClock};
pub use token::ClimateToken;
pub use transaction::{Call, Transaction};

use tracing_subscriber::EnvFilter;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (if available)
pub const GIT_HASH: Option<&str> = option_env!("GIT_HASH");

/// Version info structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VersionInfo {
    /// Semantic version
    pub version: String,
    /// Git commit hash
    pub git_hash: Option<String>,
    /// Version du format de snapshot
    pub snapshot_version: u32,
}

impl VersionInfo {
    /// Get current version information
    pub fn current() -> Self {
        Self {
            version: VERSION.to_string(),
            git_hash: GIT_HASH.map(String::from),
            snapshot_version: serialization::SNAPSHOT_VERSION,
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ClimateDAO v{}", self.version)?;
        if let Some(ref hash) = self.git_hash {
            write!(f, " ({})", hash.get(..8).unwrap_or(hash))?;
        }
        Ok(())
    }
}

/// Installe le subscriber `tracing` global.
///
/// `RUST_LOG` prime sur `level` lorsqu'il est défini. Les appels suivants
/// sont sans effet : le premier subscriber installé reste actif.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Installe le subscriber au niveau de la section `[logging]`
pub fn init_tracing_from(config: &LoggingConfig) {
    init_tracing(&config.level);
}

/// Prelude module for common imports
pub mod prelude {
    //! Common types and traits for convenient importing
    //!
    //! ```rust
    //! use climatedao_core::prelude::*;
    //! ```

    pub use crate::{
        BlockContext, Call, CallOutcome, ClimateDao, ClimateDaoConfig, ClimateToken, Clock,
        CoreError, DaoRuntime, DaoService, ManualClock, Proposal, ProposalDraft, ProposalId,
        ProposalStatus, Receipt, Result, SystemClock, Transaction, VersionInfo,
    };

    pub use crate::crypto::{generate_keypair, Address, KeyPair, PublicKey};
    pub use crate::governance::{ClimateCategory, ImpactMetrics, VoteChoice};
    pub use crate::serialization::{CompressionAlgorithm, RuntimeSnapshot, SerializationFormat};
    pub use crate::transaction::Validatable;

    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
}
