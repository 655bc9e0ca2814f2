//! Types de transactions pour ClimateDAO

use serde::{Deserialize, Serialize};
use crate::crypto::{compute_blake3_parts, sign_data, verify_signature, Address, Hash, KeyPair, PublicKey, Signature};
use crate::error::TransactionError;
use crate::governance::{ImpactMetrics, ProposalDraft, ProposalId};

/// Appel d'un point d'entrée public
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// Soumission d'une proposition de financement
    CreateProposal(ProposalDraft),
    /// Vote (0 = contre, 1 = pour, 2 = abstention). Le poids est dérivé du ledger.
    CastVote { proposal_id: ProposalId, choice: u8 },
    /// Don à la trésorerie
    Donate { amount: u64 },
    /// Phase 1 : fixe l'issue du vote
    FinalizeProposal { proposal_id: ProposalId },
    /// Phase 2 : verse les fonds
    ExecuteProposal { proposal_id: ProposalId },
    /// Réclamation unique du faucet
    ClaimTokens,
    Transfer { to: Address, amount: u64 },
    Approve { spender: Address, amount: u64 },
    TransferFrom { from: Address, to: Address, amount: u64 },
    Stake { amount: u64 },
    Unstake { amount: u64 },
    ClaimRewards,
    AddModerator { moderator: Address },
    RemoveModerator { moderator: Address },
    UpdatePlatformFee { fee_bps: u16 },
    UpdateImpactMetrics { proposal_id: ProposalId, metrics: ImpactMetrics },
}

impl Call {
    /// Nom du point d'entrée, pour les logs et les reçus
    pub fn name(&self) -> &'static str {
        match self {
            Call::CreateProposal(_) => "create_proposal",
            Call::CastVote { .. } => "cast_vote",
            Call::Donate { .. } => "donate",
            Call::FinalizeProposal { .. } => "finalize_proposal",
            Call::ExecuteProposal { .. } => "execute_proposal",
            Call::ClaimTokens => "claim_tokens",
            Call::Transfer { .. } => "transfer",
            Call::Approve { .. } => "approve",
            Call::TransferFrom { .. } => "transfer_from",
            Call::Stake { .. } => "stake",
            Call::Unstake { .. } => "unstake",
            Call::ClaimRewards => "claim_rewards",
            Call::AddModerator { .. } => "add_moderator",
            Call::RemoveModerator { .. } => "remove_moderator",
            Call::UpdatePlatformFee { .. } => "update_platform_fee",
            Call::UpdateImpactMetrics { .. } => "update_impact_metrics",
        }
    }
}

/// Transaction signée
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Clé publique de l'émetteur
    pub sender: PublicKey,
    /// Nonce anti-rejeu, séquentiel par émetteur à partir de 0
    pub nonce: u64,
    pub call: Call,
    /// Signature Ed25519 des bytes de signature
    pub signature: Signature,
}

impl Transaction {
    /// Crée et signe une transaction
    pub fn new(keypair: &KeyPair, nonce: u64, call: Call) -> Result<Self, TransactionError> {
        let sender = keypair.public_key().clone();
        let bytes = signing_bytes(&sender, nonce, &call)?;
        let signature = sign_data(&bytes, keypair.private_key());

        Ok(Self {
            sender,
            nonce,
            call,
            signature,
        })
    }

    /// Adresse de l'émetteur
    pub fn sender_address(&self) -> Address {
        self.sender.address()
    }

    /// Bytes couverts par la signature
    pub fn signing_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        signing_bytes(&self.sender, self.nonce, &self.call)
    }

    /// Vérifie la signature de l'émetteur
    pub fn verify_signature(&self) -> Result<(), TransactionError> {
        let bytes = self.signing_bytes()?;
        if verify_signature(&bytes, &self.signature, &self.sender) {
            Ok(())
        } else {
            Err(TransactionError::InvalidSignature)
        }
    }

    /// Hash Blake3 des bytes de signature suivis de la signature
    pub fn hash(&self) -> Result<Hash, TransactionError> {
        let bytes = self.signing_bytes()?;
        Ok(compute_blake3_parts(&[bytes.as_slice(), self.signature.as_bytes().as_slice()]))
    }

    /// Taille encodée en bincode
    pub fn size_bytes(&self) -> usize {
        bincode::serialized_size(self).unwrap_or(u64::MAX) as usize
    }
}

fn signing_bytes(sender: &PublicKey, nonce: u64, call: &Call) -> Result<Vec<u8>, TransactionError> {
    bincode::serialize(&(sender.as_bytes(), nonce, call))
        .map_err(|e| TransactionError::Malformed(e.to_string()))
}

/// Builder pour créer des transactions de manière fluide
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    nonce: u64,
    call: Call,
}

impl TransactionBuilder {
    pub fn new(call: Call) -> Self {
        Self { nonce: 0, call }
    }

    /// Définit le nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Signe et construit la transaction
    pub fn sign(self, keypair: &KeyPair) -> Result<Transaction, TransactionError> {
        Transaction::new(keypair, self.nonce, self.call)
    }
}
