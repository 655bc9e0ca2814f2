//! Propositions de financement et machine à états du vote
//!
//! Cycle de vie : `Active -> {Passed, Rejected} -> Executed`. L'issue du vote
//! n'est fixée qu'après l'échéance, paresseusement, par `finalize`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Duration, Utc};
use crate::config::DaoConfig;
use crate::crypto::Address;
use crate::error::DaoError;
use super::{DaoResult, ImpactMetrics};

/// Identifiant séquentiel d'une proposition (à partir de 1)
pub type ProposalId = u64;

/// Statut d'une proposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Vote en cours ou issue pas encore évaluée
    Active,
    /// Adoptée, en attente d'exécution
    Passed,
    /// Rejetée (majorité contre ou quorum non atteint)
    Rejected,
    /// Fonds versés au bénéficiaire
    Executed,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProposalStatus::Active => "active",
            ProposalStatus::Passed => "passed",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Executed => "executed",
        };
        f.write_str(label)
    }
}

/// Choix de vote, encodé 0/1/2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VoteChoice {
    Against = 0,
    For = 1,
    Abstain = 2,
}

impl TryFrom<u8> for VoteChoice {
    type Error = DaoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VoteChoice::Against),
            1 => Ok(VoteChoice::For),
            2 => Ok(VoteChoice::Abstain),
            other => Err(DaoError::InvalidVoteChoice(other)),
        }
    }
}

impl From<VoteChoice> for u8 {
    fn from(choice: VoteChoice) -> Self {
        choice as u8
    }
}

/// Catégorie d'action climatique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClimateCategory {
    Reforestation,
    RenewableEnergy,
    OceanConservation,
    CarbonCapture,
    SustainableAgriculture,
    ClimateEducation,
    #[default]
    Other,
}

/// Vote enregistré, immuable une fois émis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: Address,
    pub choice: VoteChoice,
    pub weight: u64,
    pub cast_at: DateTime<Utc>,
}

/// Décompte pondéré des votes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub votes_for: u64,
    pub votes_against: u64,
    pub votes_abstain: u64,
}

impl Tally {
    fn add(&mut self, choice: VoteChoice, weight: u64) {
        let bucket = match choice {
            VoteChoice::For => &mut self.votes_for,
            VoteChoice::Against => &mut self.votes_against,
            VoteChoice::Abstain => &mut self.votes_abstain,
        };
        *bucket = bucket.saturating_add(weight);
    }

    /// Participation totale (pour + contre + abstention)
    pub fn participation(&self) -> u128 {
        u128::from(self.votes_for) + u128::from(self.votes_against) + u128::from(self.votes_abstain)
    }

    /// Adoptée si majorité simple pour et quorum atteint
    pub fn passes(&self, quorum: u64) -> bool {
        self.votes_for > self.votes_against && self.participation() >= u128::from(quorum)
    }
}

/// Données soumises à la création d'une proposition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: ClimateCategory,
    pub requested_amount: u64,
    /// Durée du projet en jours
    pub duration_days: u32,
    pub beneficiary: Address,
}

impl ProposalDraft {
    /// Vérifie la proposition contre les bornes de la configuration
    pub fn validate(&self, config: &DaoConfig) -> DaoResult<()> {
        if self.requested_amount < config.min_proposal_amount {
            return Err(DaoError::AmountBelowMinimum {
                amount: self.requested_amount,
                minimum: config.min_proposal_amount,
            });
        }
        if self.requested_amount > config.max_proposal_amount {
            return Err(DaoError::AmountAboveMaximum {
                amount: self.requested_amount,
                maximum: config.max_proposal_amount,
            });
        }

        check_text("title", &self.title, config.max_title_length, true)?;
        check_text("description", &self.description, config.max_description_length, true)?;
        check_text("location", &self.location, config.max_title_length, false)?;

        if self.duration_days == 0 || self.duration_days > config.max_project_duration_days {
            return Err(DaoError::InvalidDuration {
                days: self.duration_days,
                max: config.max_project_duration_days,
            });
        }
        if self.beneficiary.is_zero() {
            return Err(DaoError::ZeroAddress { field: "beneficiary" });
        }

        Ok(())
    }
}

fn check_text(field: &'static str, value: &str, max: usize, required: bool) -> DaoResult<()> {
    if required && value.trim().is_empty() {
        return Err(DaoError::EmptyField { field });
    }
    let length = value.chars().count();
    if length > max {
        return Err(DaoError::FieldTooLong { field, length, max });
    }
    Ok(())
}

/// Proposition de financement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub proposer: Address,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: ClimateCategory,
    pub requested_amount: u64,
    pub duration_days: u32,
    pub beneficiary: Address,
    pub status: ProposalStatus,
    pub tally: Tally,
    /// Quorum figé à la création
    pub quorum: u64,
    pub voting_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub impact: Option<ImpactMetrics>,
    votes: BTreeMap<Address, Vote>,
}

impl Proposal {
    /// Crée une proposition active après validation du brouillon
    pub fn new(
        id: ProposalId,
        proposer: Address,
        draft: ProposalDraft,
        config: &DaoConfig,
        now: DateTime<Utc>,
    ) -> DaoResult<Self> {
        draft.validate(config)?;

        let voting_period = i64::try_from(config.voting_period_secs).unwrap_or(i64::MAX);
        let voting_deadline = Duration::try_seconds(voting_period)
            .and_then(|period| now.checked_add_signed(period))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(Self {
            id,
            proposer,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            category: draft.category,
            requested_amount: draft.requested_amount,
            duration_days: draft.duration_days,
            beneficiary: draft.beneficiary,
            status: ProposalStatus::Active,
            tally: Tally::default(),
            quorum: config.quorum_threshold,
            voting_deadline,
            created_at: now,
            executed_at: None,
            impact: None,
            votes: BTreeMap::new(),
        })
    }

    /// Vote ouvert : statut actif et échéance non atteinte
    pub fn is_voting_open(&self, now: DateTime<Utc>) -> bool {
        self.status == ProposalStatus::Active && now < self.voting_deadline
    }

    /// Échéance atteinte (complément exact de la fenêtre de vote)
    pub fn voting_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.voting_deadline
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn vote_of(&self, voter: &Address) -> Option<&Vote> {
        self.votes.get(voter)
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }

    /// Enregistre un vote pondéré
    pub fn cast_vote(
        &mut self,
        voter: Address,
        choice: VoteChoice,
        weight: u64,
        now: DateTime<Utc>,
    ) -> DaoResult<()> {
        if weight == 0 {
            return Err(DaoError::ZeroWeight);
        }
        if !self.is_voting_open(now) {
            return Err(DaoError::VotingClosed { proposal_id: self.id });
        }
        if self.has_voted(&voter) {
            return Err(DaoError::AlreadyVoted {
                proposal_id: self.id,
                voter,
            });
        }

        self.tally.add(choice, weight);
        self.votes.insert(
            voter,
            Vote {
                voter,
                choice,
                weight,
                cast_at: now,
            },
        );
        Ok(())
    }

    /// Issue du vote d'après le décompte actuel
    pub fn outcome(&self) -> ProposalStatus {
        if self.tally.passes(self.quorum) {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Rejected
        }
    }

    /// Statut que `finalize` fixerait à `now`, sans rien modifier
    pub fn resolve(&self, now: DateTime<Utc>) -> DaoResult<ProposalStatus> {
        match self.status {
            ProposalStatus::Executed => Err(DaoError::AlreadyExecuted { proposal_id: self.id }),
            ProposalStatus::Passed | ProposalStatus::Rejected => Ok(self.status),
            ProposalStatus::Active if !self.voting_ended(now) => {
                Err(DaoError::VotingStillOpen { proposal_id: self.id })
            }
            ProposalStatus::Active => Ok(self.outcome()),
        }
    }

    /// Fixe l'issue du vote. Idempotent une fois décidée.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> DaoResult<ProposalStatus> {
        let status = self.resolve(now)?;
        self.status = status;
        Ok(status)
    }

    pub(crate) fn mark_executed(&mut self, now: DateTime<Utc>) {
        self.status = ProposalStatus::Executed;
        self.executed_at = Some(now);
    }
}
