//! Runtime d'exécution des appels ClimateDAO
//!
//! Le runtime possède la DAO, le ledger du token et les nonces des
//! émetteurs. Chaque appel est appliqué de manière atomique : en cas
//! d'erreur, la DAO et le token sont restaurés à leur état d'avant l'appel.
//! Un appel rejeté d'une transaction signée consomme tout de même le nonce
//! et produit un reçu en échec.
//!
//! Un vote immobilise le pouvoir de vote de l'électeur jusqu'à l'échéance
//! de la proposition : les mêmes tokens ne peuvent pas voter deux fois
//! depuis deux adresses.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use crate::config::ClimateDaoConfig;
use crate::crypto::{Address, Hash};
use crate::error::{CoreError, DaoError, Result, TransactionError};
use crate::governance::{ClimateDao, Distribution, ProposalId, ProposalStatus};
use crate::serialization::RuntimeSnapshot;
use crate::token::ClimateToken;
use crate::transaction::{Call, Transaction, TransactionValidator};

/// Nombre de reçus conservés par défaut
pub const DEFAULT_RECEIPT_RETENTION: usize = 10_000;

/// Contexte du bloc dans lequel un appel est exécuté
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    /// Horloge de référence pour toutes les échéances
    pub timestamp: DateTime<Utc>,
}

impl BlockContext {
    pub fn new(height: u64, timestamp: DateTime<Utc>) -> Self {
        Self { height, timestamp }
    }
}

/// Résultat d'un appel réussi
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    ProposalCreated(ProposalId),
    /// Vote enregistré avec le poids dérivé du ledger
    VoteRecorded { weight: u64 },
    ProposalFinalized(ProposalStatus),
    ProposalExecuted(Distribution),
    TokensClaimed(u64),
    RewardsClaimed(u64),
    Applied,
}

/// Reçu d'exécution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash de la transaction (absent pour les appels de confiance)
    pub tx_hash: Option<Hash>,
    pub sender: Address,
    pub nonce: Option<u64>,
    pub call: String,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
    pub outcome: Option<CallOutcome>,
    pub revert_reason: Option<String>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.revert_reason.is_none()
    }
}

/// Runtime ClimateDAO
#[derive(Debug, Clone)]
pub struct DaoRuntime {
    dao: ClimateDao,
    token: ClimateToken,
    /// Prochain nonce attendu par émetteur
    nonces: BTreeMap<Address, u64>,
    validator: TransactionValidator,
    /// Reçus les plus récents, les plus anciens sont évincés
    receipts: VecDeque<Receipt>,
    receipt_retention: usize,
}

impl DaoRuntime {
    /// Crée un runtime avec une DAO vide et la supply de genèse
    pub fn new(config: &ClimateDaoConfig, owner: Address, genesis: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let dao = ClimateDao::new(owner, config.dao.clone())?;
        let token = ClimateToken::new(&config.token, owner, genesis)?;

        Ok(Self::from_parts(dao, token, BTreeMap::new()))
    }

    fn from_parts(dao: ClimateDao, token: ClimateToken, nonces: BTreeMap<Address, u64>) -> Self {
        Self {
            dao,
            token,
            nonces,
            validator: TransactionValidator::default(),
            receipts: VecDeque::new(),
            receipt_retention: DEFAULT_RECEIPT_RETENTION,
        }
    }

    /// Restaure un runtime depuis un snapshot, après contrôle d'intégrité
    pub fn from_snapshot(snapshot: RuntimeSnapshot) -> Result<Self> {
        snapshot.token.validate_integrity()?;
        Ok(Self::from_parts(snapshot.dao, snapshot.token, snapshot.nonces))
    }

    /// Capture l'état courant (les reçus ne sont pas inclus)
    pub fn snapshot(&self) -> RuntimeSnapshot {
        RuntimeSnapshot::new(self.dao.clone(), self.token.clone(), self.nonces.clone())
    }

    pub fn with_validator(mut self, validator: TransactionValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Borne le nombre de reçus conservés en mémoire
    pub fn with_receipt_retention(mut self, retention: usize) -> Self {
        self.receipt_retention = retention;
        self.trim_receipts();
        self
    }

    pub fn dao(&self) -> &ClimateDao {
        &self.dao
    }

    pub fn token(&self) -> &ClimateToken {
        &self.token
    }

    /// Prochain nonce attendu pour une adresse
    pub fn nonce_of(&self, address: &Address) -> u64 {
        self.nonces.get(address).copied().unwrap_or(0)
    }

    pub fn nonces(&self) -> &BTreeMap<Address, u64> {
        &self.nonces
    }

    pub fn receipts(&self) -> &VecDeque<Receipt> {
        &self.receipts
    }

    /// Retire et retourne les reçus accumulés
    pub fn take_receipts(&mut self) -> Vec<Receipt> {
        self.receipts.drain(..).collect()
    }

    fn record(&mut self, receipt: Receipt) {
        self.receipts.push_back(receipt);
        self.trim_receipts();
    }

    fn trim_receipts(&mut self) {
        while self.receipts.len() > self.receipt_retention {
            self.receipts.pop_front();
        }
    }

    /// Soumet une transaction signée.
    ///
    /// Une signature ou un nonce invalide rejette la transaction sans effet.
    /// Sinon le nonce est consommé et le reçu indique le succès ou la raison
    /// du revert.
    pub fn submit(&mut self, tx: &Transaction, block: &BlockContext) -> Result<Receipt> {
        self.validator.validate(tx)?;

        let sender = tx.sender_address();
        let expected = self.nonce_of(&sender);
        if tx.nonce != expected {
            return Err(TransactionError::InvalidNonce {
                expected,
                actual: tx.nonce,
            }
            .into());
        }
        let tx_hash = tx.hash()?;
        self.nonces.insert(sender, expected + 1);

        let mut receipt = self.dispatch(sender, &tx.call, block);
        receipt.tx_hash = Some(tx_hash);
        receipt.nonce = Some(tx.nonce);
        self.record(receipt.clone());

        Ok(receipt)
    }

    /// Exécute un appel de confiance, sans signature ni nonce
    pub fn execute(&mut self, sender: Address, call: &Call, block: &BlockContext) -> Receipt {
        let receipt = self.dispatch(sender, call, block);
        self.record(receipt.clone());
        receipt
    }

    fn dispatch(&mut self, sender: Address, call: &Call, block: &BlockContext) -> Receipt {
        let dao_before = self.dao.checkpoint();
        let token_before = self.token.checkpoint();
        let dao_events = self.dao.events().len();
        let token_events = self.token.events().len();

        let result = self
            .apply(sender, call, block.timestamp)
            .and_then(|outcome| {
                self.token.validate_integrity()?;
                Ok(outcome)
            });

        let (outcome, revert_reason) = match result {
            Ok(outcome) => {
                debug!("Appel {} de {} appliqué au bloc {}", call.name(), sender, block.height);
                (Some(outcome), None)
            }
            Err(err) => {
                self.dao.restore(dao_before, dao_events);
                self.token.restore(token_before, token_events);
                let reason = err.revert_reason();
                warn!("Appel {} de {} annulé: {}", call.name(), sender, reason);
                (None, Some(reason))
            }
        };

        Receipt {
            tx_hash: None,
            sender,
            nonce: None,
            call: call.name().to_string(),
            block_height: block.height,
            timestamp: block.timestamp,
            outcome,
            revert_reason,
        }
    }

    fn apply(&mut self, sender: Address, call: &Call, now: DateTime<Utc>) -> std::result::Result<CallOutcome, CoreError> {
        let outcome = match call {
            Call::CreateProposal(draft) => {
                CallOutcome::ProposalCreated(self.dao.create_proposal(sender, draft.clone(), now)?)
            }
            Call::CastVote { proposal_id, choice } => {
                let weight = self.token.voting_power(&sender);
                self.dao.cast_vote(*proposal_id, sender, *choice, weight, now)?;
                let deadline = self
                    .dao
                    .get_proposal(*proposal_id)
                    .map(|proposal| proposal.voting_deadline)
                    .ok_or(DaoError::ProposalNotFound { proposal_id: *proposal_id })?;
                self.token.lock_votes(sender, weight, deadline, now);
                CallOutcome::VoteRecorded { weight }
            }
            Call::Donate { amount } => {
                self.dao.donate(&mut self.token, sender, *amount, now)?;
                CallOutcome::Applied
            }
            Call::FinalizeProposal { proposal_id } => {
                CallOutcome::ProposalFinalized(self.dao.finalize_proposal(*proposal_id, now)?)
            }
            Call::ExecuteProposal { proposal_id } => {
                CallOutcome::ProposalExecuted(self.dao.execute_proposal(&mut self.token, *proposal_id, now)?)
            }
            Call::ClaimTokens => CallOutcome::TokensClaimed(self.token.claim(sender, now)?),
            Call::Transfer { to, amount } => {
                self.token.transfer(sender, *to, *amount, now)?;
                CallOutcome::Applied
            }
            Call::Approve { spender, amount } => {
                self.token.approve(sender, *spender, *amount, now)?;
                CallOutcome::Applied
            }
            Call::TransferFrom { from, to, amount } => {
                self.token.transfer_from(sender, *from, *to, *amount, now)?;
                CallOutcome::Applied
            }
            Call::Stake { amount } => {
                self.token.stake(sender, *amount, now)?;
                CallOutcome::Applied
            }
            Call::Unstake { amount } => {
                self.token.unstake(sender, *amount, now)?;
                CallOutcome::Applied
            }
            Call::ClaimRewards => CallOutcome::RewardsClaimed(self.token.claim_rewards(sender, now)?),
            Call::AddModerator { moderator } => {
                self.dao.add_moderator(sender, *moderator, now)?;
                CallOutcome::Applied
            }
            Call::RemoveModerator { moderator } => {
                self.dao.remove_moderator(sender, *moderator, now)?;
                CallOutcome::Applied
            }
            Call::UpdatePlatformFee { fee_bps } => {
                self.dao.update_platform_fee(sender, *fee_bps, now)?;
                CallOutcome::Applied
            }
            Call::UpdateImpactMetrics { proposal_id, metrics } => {
                self.dao.update_impact_metrics(sender, *proposal_id, metrics.clone(), now)?;
                CallOutcome::Applied
            }
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_keypair_from_seed, KeyPair};
    use crate::governance::{ClimateCategory, ProposalDraft};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap()
    }

    fn block(height: u64) -> BlockContext {
        BlockContext::new(height, t0() + Duration::minutes(height as i64))
    }

    fn owner_keys() -> KeyPair {
        generate_keypair_from_seed(&[1u8; 32])
    }

    fn create_runtime() -> DaoRuntime {
        DaoRuntime::new(&ClimateDaoConfig::default(), owner_keys().address(), t0()).unwrap()
    }

    fn draft() -> ProposalDraft {
        ProposalDraft {
            title: "Biochar".to_string(),
            description: "Unité de pyrolyse pour résidus agricoles".to_string(),
            location: "Kisumu".to_string(),
            category: ClimateCategory::CarbonCapture,
            requested_amount: 50_000,
            duration_days: 90,
            beneficiary: Address::system("coop"),
        }
    }

    #[test]
    fn test_submit_increments_nonce() {
        let mut runtime = create_runtime();
        let alice = generate_keypair_from_seed(&[2u8; 32]);

        let tx = Transaction::new(&alice, 0, Call::ClaimTokens).unwrap();
        let receipt = runtime.submit(&tx, &block(1)).unwrap();

        assert!(receipt.is_success());
        assert_eq!(receipt.outcome, Some(CallOutcome::TokensClaimed(1_000)));
        assert_eq!(receipt.tx_hash, Some(tx.hash().unwrap()));
        assert_eq!(runtime.nonce_of(&alice.address()), 1);
        assert_eq!(runtime.token().balance_of(&alice.address()), 1_000);
    }

    #[test]
    fn test_replayed_nonce_rejected() {
        let mut runtime = create_runtime();
        let alice = generate_keypair_from_seed(&[2u8; 32]);
        let tx = Transaction::new(&alice, 0, Call::ClaimTokens).unwrap();
        runtime.submit(&tx, &block(1)).unwrap();

        let err = runtime.submit(&tx, &block(2)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Transaction(TransactionError::InvalidNonce { expected: 1, actual: 0 })
        ));
        assert_eq!(runtime.receipts().len(), 1);
    }

    #[test]
    fn test_bad_signature_rejected_without_consuming_nonce() {
        let mut runtime = create_runtime();
        let alice = generate_keypair_from_seed(&[2u8; 32]);
        let mut tx = Transaction::new(&alice, 0, Call::ClaimTokens).unwrap();
        tx.call = Call::Stake { amount: 1 };

        assert!(matches!(
            runtime.submit(&tx, &block(1)),
            Err(CoreError::Transaction(TransactionError::InvalidSignature))
        ));
        assert_eq!(runtime.nonce_of(&alice.address()), 0);
    }

    #[test]
    fn test_reverted_call_consumes_nonce_and_keeps_state() {
        let mut runtime = create_runtime();
        let alice = generate_keypair_from_seed(&[2u8; 32]);
        let before = runtime.snapshot();

        let tx = Transaction::new(&alice, 0, Call::Stake { amount: 10 }).unwrap();
        let receipt = runtime.submit(&tx, &block(1)).unwrap();

        assert!(!receipt.is_success());
        assert!(receipt.revert_reason.unwrap().contains("Solde insuffisant"));
        assert_eq!(runtime.nonce_of(&alice.address()), 1);
        assert_eq!(runtime.dao(), &before.dao);
        assert_eq!(runtime.token(), &before.token);
    }

    #[test]
    fn test_vote_weight_comes_from_ledger() {
        let mut runtime = create_runtime();
        let owner = owner_keys().address();
        let alice = generate_keypair_from_seed(&[2u8; 32]).address();

        runtime.execute(owner, &Call::CreateProposal(draft()), &block(1));
        runtime.execute(alice, &Call::ClaimTokens, &block(2));
        runtime.execute(alice, &Call::Stake { amount: 400 }, &block(3));

        let receipt = runtime.execute(alice, &Call::CastVote { proposal_id: 1, choice: 1 }, &block(4));
        assert_eq!(receipt.outcome, Some(CallOutcome::VoteRecorded { weight: 1_000 }));

        let nobody = Address::system("nobody");
        let receipt = runtime.execute(nobody, &Call::CastVote { proposal_id: 1, choice: 1 }, &block(5));
        assert_eq!(receipt.revert_reason, Some(crate::error::DaoError::ZeroWeight.to_string()));
    }

    #[test]
    fn test_failed_execution_rolls_back_finalization() {
        let mut runtime = create_runtime();
        let owner = owner_keys().address();
        runtime.execute(owner, &Call::CreateProposal(draft()), &block(1));
        runtime.execute(owner, &Call::CastVote { proposal_id: 1, choice: 1 }, &block(2));

        let deadline = runtime.dao().get_proposal(1).unwrap().voting_deadline;
        let after = BlockContext::new(10, deadline);

        // Trésorerie vide
        let receipt = runtime.execute(owner, &Call::ExecuteProposal { proposal_id: 1 }, &after);
        assert!(!receipt.is_success());
        assert_eq!(runtime.dao().get_proposal(1).unwrap().status, ProposalStatus::Active);

        let receipt = runtime.execute(owner, &Call::FinalizeProposal { proposal_id: 1 }, &after);
        assert_eq!(receipt.outcome, Some(CallOutcome::ProposalFinalized(ProposalStatus::Passed)));
    }

    #[test]
    fn test_voted_tokens_cannot_vote_again_elsewhere() {
        let mut runtime = create_runtime();
        let owner = owner_keys().address();
        let alice = Address::system("alice");
        let relay = Address::system("relay");

        runtime.execute(owner, &Call::CreateProposal(draft()), &block(1));
        runtime.execute(alice, &Call::ClaimTokens, &block(2));
        runtime.execute(alice, &Call::CastVote { proposal_id: 1, choice: 1 }, &block(3));

        let receipt = runtime.execute(alice, &Call::Transfer { to: relay, amount: 1_000 }, &block(4));
        assert!(receipt.revert_reason.unwrap().contains("engagés dans un vote"));
        let receipt = runtime.execute(alice, &Call::Donate { amount: 1_000 }, &block(5));
        assert!(!receipt.is_success());

        let receipt = runtime.execute(relay, &Call::CastVote { proposal_id: 1, choice: 1 }, &block(6));
        assert!(!receipt.is_success());
        assert_eq!(runtime.dao().get_proposal(1).unwrap().tally.votes_for, 1_000);

        // Libres après l'échéance
        let deadline = runtime.dao().get_proposal(1).unwrap().voting_deadline;
        let after = BlockContext::new(7, deadline);
        let receipt = runtime.execute(alice, &Call::Transfer { to: relay, amount: 1_000 }, &after);
        assert!(receipt.is_success());
    }

    #[test]
    fn test_receipts_are_bounded_and_drained() {
        let mut runtime = create_runtime().with_receipt_retention(2);
        for height in 1..=3 {
            let claimant = Address::system(&format!("claimant-{height}"));
            runtime.execute(claimant, &Call::ClaimTokens, &block(height));
        }

        assert_eq!(runtime.receipts().len(), 2);
        assert_eq!(runtime.receipts()[0].block_height, 2);

        let drained = runtime.take_receipts();
        assert_eq!(drained.len(), 2);
        assert!(runtime.receipts().is_empty());
    }

    #[test]
    fn test_revert_truncates_event_logs() {
        let mut runtime = create_runtime();
        let owner = owner_keys().address();
        runtime.execute(owner, &Call::Donate { amount: 5_000 }, &block(1));
        let dao_events = runtime.dao().events().len();
        let token_events = runtime.token().events().len();

        let receipt = runtime.execute(owner, &Call::ExecuteProposal { proposal_id: 9 }, &block(2));
        assert!(!receipt.is_success());
        let receipt = runtime.execute(owner, &Call::Donate { amount: 0 }, &block(3));
        assert!(!receipt.is_success());

        assert_eq!(runtime.dao().events().len(), dao_events);
        assert_eq!(runtime.token().events().len(), token_events);
        assert_eq!(runtime.dao().contribution_of(&owner), 5_000);
    }
}
