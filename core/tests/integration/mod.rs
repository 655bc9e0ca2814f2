//! Utilitaires partagés des tests d'intégration ClimateDAO

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use climatedao_core::crypto::{generate_keypair_from_seed, Address, KeyPair};
use climatedao_core::governance::{ClimateCategory, ProposalDraft, ProposalId};
use climatedao_core::{BlockContext, Call, ClimateDaoConfig, DaoRuntime, Receipt, Transaction};

/// Instant de genèse commun à tous les scénarios
pub fn genesis() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
}

/// Participant avec sa paire de clés et son nonce local
pub struct Participant {
    pub keypair: KeyPair,
    nonce: u64,
}

impl Participant {
    pub fn new(seed: u8) -> Self {
        Self {
            keypair: generate_keypair_from_seed(&[seed; 32]),
            nonce: 0,
        }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// Signe un appel avec le prochain nonce
    pub fn sign(&mut self, call: Call) -> Transaction {
        let tx = Transaction::new(&self.keypair, self.nonce, call).expect("signature");
        self.nonce += 1;
        tx
    }
}

/// Chaîne de test : runtime + horloge de blocs
pub struct TestChain {
    pub runtime: DaoRuntime,
    pub owner: Participant,
    height: u64,
    now: DateTime<Utc>,
}

impl TestChain {
    pub fn new() -> Self {
        Self::with_config(ClimateDaoConfig::default())
    }

    pub fn with_config(config: ClimateDaoConfig) -> Self {
        let owner = Participant::new(0xAA);
        let runtime = DaoRuntime::new(&config, owner.address(), genesis()).expect("runtime");
        Self {
            runtime,
            owner,
            height: 0,
            now: genesis(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn advance(&mut self, delta: Duration) {
        self.now = self.now + delta;
    }

    pub fn set_time(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    fn next_block(&mut self) -> BlockContext {
        self.height += 1;
        BlockContext::new(self.height, self.now)
    }

    /// Soumet une transaction signée, panique si elle est rejetée avant exécution
    pub fn submit(&mut self, who: &mut Participant, call: Call) -> Receipt {
        let tx = who.sign(call);
        let block = self.next_block();
        self.runtime.submit(&tx, &block).expect("transaction acceptée")
    }

    /// Soumet au nom du propriétaire
    pub fn submit_as_owner(&mut self, call: Call) -> Receipt {
        let tx = self.owner.sign(call);
        let block = self.next_block();
        self.runtime.submit(&tx, &block).expect("transaction acceptée")
    }

    pub fn execute(&mut self, sender: Address, call: Call) -> Receipt {
        let block = self.next_block();
        self.runtime.execute(sender, &call, &block)
    }

    pub fn deadline_of(&self, proposal_id: ProposalId) -> DateTime<Utc> {
        self.runtime
            .dao()
            .get_proposal(proposal_id)
            .expect("proposition")
            .voting_deadline
    }
}

/// Brouillon de proposition valide
pub fn sample_draft(amount: u64, beneficiary: Address) -> ProposalDraft {
    ProposalDraft {
        title: "Reforestation du bassin versant".to_string(),
        description: "Plantation de 50 000 arbres indigènes et suivi sur trois ans".to_string(),
        location: "Madagascar".to_string(),
        category: ClimateCategory::Reforestation,
        requested_amount: amount,
        duration_days: 3 * 365,
        beneficiary,
    }
}
