//! Registre principal de la DAO
//!
//! `ClimateDao` détient les propositions, les modérateurs, les frais de
//! plateforme et le registre des contributions. Les fonds eux-mêmes vivent
//! sur le ledger du token, au compte de trésorerie : les opérations qui
//! déplacent des tokens reçoivent le `ClimateToken` en paramètre.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use crate::config::{DaoConfig, BPS_DENOMINATOR};
use crate::crypto::Address;
use crate::error::DaoError;
use crate::token::ClimateToken;
use super::{
    treasury_address, DaoEvent, DaoEventType, DaoResult, ImpactMetrics, ImpactSummary, Proposal,
    ProposalDraft, ProposalId, ProposalStatus, VoteChoice,
};

/// Versement effectué à l'exécution d'une proposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub proposal_id: ProposalId,
    pub beneficiary: Address,
    /// Montant demandé
    pub gross_amount: u64,
    /// Frais versés au propriétaire
    pub fee: u64,
    /// Montant reçu par le bénéficiaire
    pub net_amount: u64,
    pub fee_bps: u16,
}

/// Statistiques de la DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoStatistics {
    pub total_proposals: usize,
    pub active_proposals: usize,
    pub passed_proposals: usize,
    pub rejected_proposals: usize,
    pub executed_proposals: usize,
    pub total_funds_raised: u64,
    pub total_distributed: u64,
    pub total_fees_collected: u64,
    pub treasury_balance: u64,
    pub platform_fee_bps: u16,
    pub moderators_count: usize,
    pub contributors_count: usize,
    pub impact: ImpactSummary,
}

/// DAO climatique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateDao {
    owner: Address,
    treasury: Address,
    config: DaoConfig,
    proposals: BTreeMap<ProposalId, Proposal>,
    next_proposal_id: ProposalId,
    moderators: BTreeSet<Address>,
    platform_fee_bps: u16,
    total_funds_raised: u64,
    total_distributed: u64,
    total_fees_collected: u64,
    contributions: BTreeMap<Address, u64>,
    events: Vec<DaoEvent>,
}

impl ClimateDao {
    /// Crée une DAO vide
    pub fn new(owner: Address, config: DaoConfig) -> DaoResult<Self> {
        if owner.is_zero() {
            return Err(DaoError::ZeroAddress { field: "owner" });
        }
        if config.platform_fee_bps > config.max_platform_fee_bps {
            return Err(DaoError::FeeTooHigh {
                fee_bps: config.platform_fee_bps,
                max_bps: config.max_platform_fee_bps,
            });
        }

        Ok(Self {
            owner,
            treasury: treasury_address(),
            platform_fee_bps: config.platform_fee_bps,
            config,
            proposals: BTreeMap::new(),
            next_proposal_id: 1,
            moderators: BTreeSet::new(),
            total_funds_raised: 0,
            total_distributed: 0,
            total_fees_collected: 0,
            contributions: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn treasury(&self) -> Address {
        self.treasury
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    pub fn platform_fee_bps(&self) -> u16 {
        self.platform_fee_bps
    }

    pub fn total_funds_raised(&self) -> u64 {
        self.total_funds_raised
    }

    pub fn total_distributed(&self) -> u64 {
        self.total_distributed
    }

    pub fn total_fees_collected(&self) -> u64 {
        self.total_fees_collected
    }

    pub fn get_proposal(&self, proposal_id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&proposal_id)
    }

    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.values()
    }

    /// Propositions dans un statut donné, par id croissant
    pub fn proposals_by_status(&self, status: ProposalStatus) -> Vec<&Proposal> {
        self.proposals.values().filter(|p| p.status == status).collect()
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// Total donné par une adresse
    pub fn contribution_of(&self, donor: &Address) -> u64 {
        self.contributions.get(donor).copied().unwrap_or(0)
    }

    pub fn is_moderator(&self, address: &Address) -> bool {
        self.moderators.contains(address)
    }

    pub fn moderators(&self) -> impl Iterator<Item = &Address> {
        self.moderators.iter()
    }

    pub fn events(&self) -> &[DaoEvent] {
        &self.events
    }

    /// Solde de la trésorerie sur le ledger
    pub fn treasury_balance(&self, token: &ClimateToken) -> u64 {
        token.balance_of(&self.treasury)
    }

    /// Crée une proposition, retourne son id
    pub fn create_proposal(
        &mut self,
        proposer: Address,
        draft: ProposalDraft,
        now: DateTime<Utc>,
    ) -> DaoResult<ProposalId> {
        let proposal_id = self.next_proposal_id;
        let proposal = Proposal::new(proposal_id, proposer, draft, &self.config, now)?;
        let requested_amount = proposal.requested_amount;

        self.proposals.insert(proposal_id, proposal);
        self.next_proposal_id += 1;

        info!("Proposition {} créée par {} ({} demandés)", proposal_id, proposer, requested_amount);
        self.emit(
            DaoEventType::ProposalCreated {
                proposal_id,
                proposer,
                requested_amount,
            },
            now,
        );

        Ok(proposal_id)
    }

    /// Enregistre un vote. `choice` suit l'encodage 0 = contre, 1 = pour, 2 = abstention.
    pub fn cast_vote(
        &mut self,
        proposal_id: ProposalId,
        voter: Address,
        choice: u8,
        weight: u64,
        now: DateTime<Utc>,
    ) -> DaoResult<()> {
        let choice = VoteChoice::try_from(choice)?;
        let proposal = self.proposal_mut(proposal_id)?;
        proposal.cast_vote(voter, choice, weight, now)?;

        debug!("Vote {:?} de {} (poids {}) sur la proposition {}", choice, voter, weight, proposal_id);
        self.emit(
            DaoEventType::VoteCast {
                proposal_id,
                voter,
                choice,
                weight,
            },
            now,
        );
        Ok(())
    }

    /// Don de tokens à la trésorerie
    pub fn donate(
        &mut self,
        token: &mut ClimateToken,
        donor: Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> DaoResult<()> {
        if amount == 0 {
            return Err(DaoError::ZeroDonation);
        }
        token.transfer(donor, self.treasury, amount, now)?;

        self.total_funds_raised = self.total_funds_raised.saturating_add(amount);
        let contribution = self.contributions.entry(donor).or_insert(0);
        *contribution = contribution.saturating_add(amount);

        info!("Don de {} reçu de {}", amount, donor);
        self.emit(DaoEventType::DonationReceived { donor, amount }, now);
        Ok(())
    }

    /// Phase 1 : fixe l'issue du vote après l'échéance
    pub fn finalize_proposal(&mut self, proposal_id: ProposalId, now: DateTime<Utc>) -> DaoResult<ProposalStatus> {
        let proposal = self.proposal_mut(proposal_id)?;
        let previous = proposal.status;
        let status = proposal.finalize(now)?;

        if previous != status {
            info!("Proposition {} finalisée: {}", proposal_id, status);
            self.emit(DaoEventType::ProposalFinalized { proposal_id, status }, now);
        }
        Ok(status)
    }

    /// Phase 2 : finalise si besoin puis verse les fonds au bénéficiaire.
    /// Ouvert à tout appelant.
    pub fn execute_proposal(
        &mut self,
        token: &mut ClimateToken,
        proposal_id: ProposalId,
        now: DateTime<Utc>,
    ) -> DaoResult<Distribution> {
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(DaoError::ProposalNotFound { proposal_id })?;

        let status = proposal.resolve(now)?;
        if status != ProposalStatus::Passed {
            return Err(DaoError::ProposalNotPassed { proposal_id, status });
        }

        let available = token.balance_of(&self.treasury);
        if available < proposal.requested_amount {
            return Err(DaoError::InsufficientFunds {
                required: proposal.requested_amount,
                available,
            });
        }

        let distribution = self.compute_distribution(proposal);
        if distribution.fee > 0 {
            token.transfer(self.treasury, self.owner, distribution.fee, now)?;
        }
        if distribution.net_amount > 0 {
            token.transfer(self.treasury, distribution.beneficiary, distribution.net_amount, now)?;
        }

        let proposal = self.proposal_mut(proposal_id)?;
        let previous = proposal.status;
        proposal.finalize(now)?;
        proposal.mark_executed(now);

        self.total_distributed = self.total_distributed.saturating_add(distribution.net_amount);
        self.total_fees_collected = self.total_fees_collected.saturating_add(distribution.fee);

        if previous == ProposalStatus::Active {
            self.emit(
                DaoEventType::ProposalFinalized {
                    proposal_id,
                    status: ProposalStatus::Passed,
                },
                now,
            );
        }
        info!(
            "Proposition {} exécutée: {} versés à {}, {} de frais",
            proposal_id, distribution.net_amount, distribution.beneficiary, distribution.fee
        );
        self.emit(
            DaoEventType::ProposalExecuted {
                proposal_id,
                beneficiary: distribution.beneficiary,
                net_amount: distribution.net_amount,
                fee: distribution.fee,
            },
            now,
        );

        Ok(distribution)
    }

    fn compute_distribution(&self, proposal: &Proposal) -> Distribution {
        let gross = proposal.requested_amount;
        let fee = u128::from(gross) * u128::from(self.platform_fee_bps) / u128::from(BPS_DENOMINATOR);
        // fee <= gross car platform_fee_bps <= 10_000
        let fee = u64::try_from(fee).unwrap_or(gross).min(gross);

        Distribution {
            proposal_id: proposal.id,
            beneficiary: proposal.beneficiary,
            gross_amount: gross,
            fee,
            net_amount: gross - fee,
            fee_bps: self.platform_fee_bps,
        }
    }

    pub fn add_moderator(&mut self, caller: Address, moderator: Address, now: DateTime<Utc>) -> DaoResult<()> {
        self.ensure_owner(caller)?;
        if moderator.is_zero() {
            return Err(DaoError::ZeroAddress { field: "moderator" });
        }
        if !self.moderators.insert(moderator) {
            return Err(DaoError::ModeratorAlreadyExists(moderator));
        }

        info!("Modérateur ajouté: {}", moderator);
        self.emit(DaoEventType::ModeratorAdded(moderator), now);
        Ok(())
    }

    pub fn remove_moderator(&mut self, caller: Address, moderator: Address, now: DateTime<Utc>) -> DaoResult<()> {
        self.ensure_owner(caller)?;
        if !self.moderators.remove(&moderator) {
            return Err(DaoError::ModeratorNotFound(moderator));
        }

        info!("Modérateur retiré: {}", moderator);
        self.emit(DaoEventType::ModeratorRemoved(moderator), now);
        Ok(())
    }

    /// Met à jour les frais appliqués aux exécutions suivantes
    pub fn update_platform_fee(&mut self, caller: Address, fee_bps: u16, now: DateTime<Utc>) -> DaoResult<()> {
        self.ensure_owner(caller)?;
        if fee_bps > self.config.max_platform_fee_bps {
            return Err(DaoError::FeeTooHigh {
                fee_bps,
                max_bps: self.config.max_platform_fee_bps,
            });
        }

        let old_bps = self.platform_fee_bps;
        self.platform_fee_bps = fee_bps;

        info!("Frais de plateforme: {} -> {} bps", old_bps, fee_bps);
        self.emit(DaoEventType::PlatformFeeUpdated { old_bps, new_bps: fee_bps }, now);
        Ok(())
    }

    /// Enregistre l'impact d'un projet exécuté (propriétaire ou modérateur)
    pub fn update_impact_metrics(
        &mut self,
        caller: Address,
        proposal_id: ProposalId,
        mut metrics: ImpactMetrics,
        now: DateTime<Utc>,
    ) -> DaoResult<()> {
        if caller != self.owner && !self.is_moderator(&caller) {
            return Err(DaoError::Unauthorized { caller });
        }
        metrics.validate()?;

        let proposal = self.proposal_mut(proposal_id)?;
        if proposal.status != ProposalStatus::Executed {
            return Err(DaoError::NotExecuted { proposal_id });
        }
        metrics.updated_at = Some(now);
        proposal.impact = Some(metrics);

        debug!("Impact mis à jour pour la proposition {} par {}", proposal_id, caller);
        self.emit(DaoEventType::ImpactUpdated { proposal_id, reporter: caller }, now);
        Ok(())
    }

    pub fn statistics(&self, token: &ClimateToken) -> DaoStatistics {
        let count = |status: ProposalStatus| self.proposals.values().filter(|p| p.status == status).count();

        let mut impact = ImpactSummary::default();
        for metrics in self.proposals.values().filter_map(|p| p.impact.as_ref()) {
            impact.accumulate(metrics);
        }

        DaoStatistics {
            total_proposals: self.proposals.len(),
            active_proposals: count(ProposalStatus::Active),
            passed_proposals: count(ProposalStatus::Passed),
            rejected_proposals: count(ProposalStatus::Rejected),
            executed_proposals: count(ProposalStatus::Executed),
            total_funds_raised: self.total_funds_raised,
            total_distributed: self.total_distributed,
            total_fees_collected: self.total_fees_collected,
            treasury_balance: self.treasury_balance(token),
            platform_fee_bps: self.platform_fee_bps,
            moderators_count: self.moderators.len(),
            contributors_count: self.contributions.len(),
            impact,
        }
    }

    fn ensure_owner(&self, caller: Address) -> DaoResult<()> {
        if caller != self.owner {
            return Err(DaoError::Unauthorized { caller });
        }
        Ok(())
    }

    fn proposal_mut(&mut self, proposal_id: ProposalId) -> DaoResult<&mut Proposal> {
        self.proposals
            .get_mut(&proposal_id)
            .ok_or(DaoError::ProposalNotFound { proposal_id })
    }

    /// Copie de l'état sans l'historique d'événements
    pub(crate) fn checkpoint(&self) -> Self {
        Self {
            owner: self.owner,
            treasury: self.treasury,
            config: self.config.clone(),
            proposals: self.proposals.clone(),
            next_proposal_id: self.next_proposal_id,
            moderators: self.moderators.clone(),
            platform_fee_bps: self.platform_fee_bps,
            total_funds_raised: self.total_funds_raised,
            total_distributed: self.total_distributed,
            total_fees_collected: self.total_fees_collected,
            contributions: self.contributions.clone(),
            events: Vec::new(),
        }
    }

    /// Revient à `checkpoint` en tronquant le journal à `events_len`
    pub(crate) fn restore(&mut self, mut checkpoint: Self, events_len: usize) {
        let mut events = std::mem::take(&mut self.events);
        events.truncate(events_len);
        checkpoint.events = events;
        *self = checkpoint;
    }

    fn emit(&mut self, event_type: DaoEventType, timestamp: DateTime<Utc>) {
        self.events.push(DaoEvent { event_type, timestamp });
    }
}
