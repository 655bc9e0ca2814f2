//! Gouvernance de ClimateDAO
//!
//! Registre des propositions, vote pondéré, quorum et libération des fonds
//! en deux phases :
//! 1. `finalize_proposal` fixe l'issue du vote après l'échéance
//! 2. `execute_proposal` verse les fonds (nets des frais) au bénéficiaire

pub mod dao;
pub mod impact;
pub mod proposal;

pub use dao::{ClimateDao, DaoStatistics, Distribution};
pub use impact::{ImpactMetrics, ImpactSummary};
pub use proposal::{
    ClimateCategory, Proposal, ProposalDraft, ProposalId, ProposalStatus, Tally, Vote, VoteChoice,
};

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::crypto::Address;
use crate::error::DaoError;

/// Résultat des opérations de gouvernance
pub type DaoResult<T> = std::result::Result<T, DaoError>;

/// Label de l'adresse système de la trésorerie
pub const TREASURY_LABEL: &str = "dao-treasury";

/// Compte de la trésorerie sur le ledger du token
pub fn treasury_address() -> Address {
    Address::system(TREASURY_LABEL)
}

/// Événement de gouvernance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoEvent {
    pub event_type: DaoEventType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DaoEventType {
    ProposalCreated {
        proposal_id: ProposalId,
        proposer: Address,
        requested_amount: u64,
    },
    VoteCast {
        proposal_id: ProposalId,
        voter: Address,
        choice: VoteChoice,
        weight: u64,
    },
    DonationReceived {
        donor: Address,
        amount: u64,
    },
    ProposalFinalized {
        proposal_id: ProposalId,
        status: ProposalStatus,
    },
    ProposalExecuted {
        proposal_id: ProposalId,
        beneficiary: Address,
        net_amount: u64,
        fee: u64,
    },
    ModeratorAdded(Address),
    ModeratorRemoved(Address),
    PlatformFeeUpdated {
        old_bps: u16,
        new_bps: u16,
    },
    ImpactUpdated {
        proposal_id: ProposalId,
        reporter: Address,
    },
}
