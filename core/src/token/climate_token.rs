//! Token CLIMATE principal
//!
//! Ledger ERC-20-like à supply fixe. Toute la supply est mintée à la genèse
//! vers trois comptes : la réserve du faucet, le pool de récompenses de
//! staking et le propriétaire. Aucune opération ne crée ni ne détruit de
//! tokens ensuite, d'où l'invariant :
//! `somme(soldes) + total_staké == total_supply`.
//!
//! Chaque opération vérifie toutes ses préconditions avant la première
//! écriture, une erreur laisse donc le ledger intact.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use crate::config::TokenConfig;
use crate::crypto::Address;
use crate::error::TokenError;
use super::{
    faucet_reserve_address, rewards_pool_address, StakeInfo, StakingLedger, TokenEvent,
    TokenEventType, TokenResult,
};

/// Métadonnées du token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Nom du token
    pub name: String,
    /// Symbole du token
    pub symbol: String,
    /// Nombre de décimales
    pub decimals: u8,
}

impl From<&TokenConfig> for TokenMetadata {
    fn from(config: &TokenConfig) -> Self {
        Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
        }
    }
}

/// Statistiques agrégées du token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatistics {
    pub total_supply: u64,
    pub total_staked: u64,
    pub faucet_reserve: u64,
    pub rewards_pool: u64,
    pub holders_count: usize,
    pub stakers_count: usize,
    pub claims_count: usize,
    pub total_rewards_paid: u64,
}

/// Poids engagé par une adresse dans des votes encore ouverts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLock {
    pub amount: u64,
    /// Échéance de vote la plus tardive couverte par le verrou
    pub until: DateTime<Utc>,
}

impl VoteLock {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.until
    }
}

/// Token CLIMATE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateToken {
    metadata: TokenMetadata,
    total_supply: u64,
    owner: Address,
    claim_amount: u64,
    /// Soldes liquides (les entrées nulles sont retirées)
    balances: BTreeMap<Address, u64>,
    /// owner -> spender -> montant
    allowances: BTreeMap<Address, BTreeMap<Address, u64>>,
    /// Adresses ayant déjà réclamé le faucet
    claimed: BTreeSet<Address>,
    staking: StakingLedger,
    /// Tokens qui ont servi à voter, immobilisés jusqu'à l'échéance
    vote_locks: BTreeMap<Address, VoteLock>,
    events: Vec<TokenEvent>,
    created_at: DateTime<Utc>,
}

impl ClimateToken {
    /// Crée le token et minte la supply de genèse
    pub fn new(config: &TokenConfig, owner: Address, genesis: DateTime<Utc>) -> TokenResult<Self> {
        if owner.is_zero() {
            return Err(TokenError::InvalidRecipient(owner));
        }
        let allocated = config
            .faucet_allocation
            .checked_add(config.rewards_allocation)
            .ok_or(TokenError::Overflow)?;
        if allocated > config.total_supply {
            return Err(TokenError::SupplyExceeded {
                allocated,
                supply: config.total_supply,
            });
        }

        let mut token = Self {
            metadata: TokenMetadata::from(config),
            total_supply: config.total_supply,
            owner,
            claim_amount: config.claim_amount,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            claimed: BTreeSet::new(),
            staking: StakingLedger::new(config.reward_rate_bps, config.min_stake),
            vote_locks: BTreeMap::new(),
            events: Vec::new(),
            created_at: genesis,
        };

        token.mint_genesis(faucet_reserve_address(), config.faucet_allocation, genesis);
        token.mint_genesis(rewards_pool_address(), config.rewards_allocation, genesis);
        token.mint_genesis(owner, config.total_supply - allocated, genesis);

        info!(
            "Token {} créé: supply {}, faucet {}, récompenses {}",
            token.metadata.symbol, token.total_supply, config.faucet_allocation, config.rewards_allocation
        );

        Ok(token)
    }

    fn mint_genesis(&mut self, to: Address, amount: u64, now: DateTime<Utc>) {
        if amount == 0 {
            return;
        }
        *self.balances.entry(to).or_insert(0) += amount;
        self.emit(
            TokenEventType::Transfer {
                from: Address::ZERO,
                to,
                amount,
            },
            now,
        );
    }

    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn claim_amount(&self) -> u64 {
        self.claim_amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Solde liquide d'une adresse
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Allocation accordée par `owner` à `spender`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Tokens restant dans la réserve du faucet
    pub fn faucet_reserve(&self) -> u64 {
        self.balance_of(&faucet_reserve_address())
    }

    /// Tokens restant dans le pool de récompenses
    pub fn rewards_pool(&self) -> u64 {
        self.balance_of(&rewards_pool_address())
    }

    pub fn has_claimed(&self, address: &Address) -> bool {
        self.claimed.contains(address)
    }

    pub fn staked_of(&self, address: &Address) -> u64 {
        self.staking.staked_of(address)
    }

    pub fn stake_info(&self, address: &Address) -> Option<&StakeInfo> {
        self.staking.stake_info(address)
    }

    pub fn pending_rewards(&self, address: &Address, now: DateTime<Utc>) -> u64 {
        self.staking.pending_rewards(address, now)
    }

    pub fn total_staked(&self) -> u64 {
        self.staking.total_staked()
    }

    pub fn staking(&self) -> &StakingLedger {
        &self.staking
    }

    /// Pouvoir de vote : solde liquide + montant staké
    pub fn voting_power(&self, address: &Address) -> u64 {
        self.balance_of(address).saturating_add(self.staked_of(address))
    }

    /// Historique complet des événements
    pub fn events(&self) -> &[TokenEvent] {
        &self.events
    }

    /// Événements concernant une adresse
    pub fn events_for(&self, address: &Address) -> Vec<&TokenEvent> {
        self.events
            .iter()
            .filter(|event| event.event_type.involves(address))
            .collect()
    }

    /// Verrou de vote actif à `now`
    pub fn vote_lock(&self, address: &Address, now: DateTime<Utc>) -> Option<&VoteLock> {
        self.vote_locks.get(address).filter(|lock| lock.is_active(now))
    }

    /// Part du pouvoir de vote libre de tout verrou
    pub fn unlocked_power(&self, address: &Address, now: DateTime<Utc>) -> u64 {
        let locked = self.vote_lock(address, now).map_or(0, |lock| lock.amount);
        self.voting_power(address).saturating_sub(locked)
    }

    /// Immobilise `amount` jusqu'à `until`. Un verrou encore actif est
    /// étendu au plus grand montant et à la plus tardive des échéances.
    pub(crate) fn lock_votes(&mut self, voter: Address, amount: u64, until: DateTime<Utc>, now: DateTime<Utc>) {
        let lock = match self.vote_locks.get(&voter) {
            Some(current) if current.is_active(now) => VoteLock {
                amount: current.amount.max(amount),
                until: current.until.max(until),
            },
            _ => VoteLock { amount, until },
        };
        debug!("{} engage {} jusqu'au {}", voter, lock.amount, lock.until);
        self.vote_locks.insert(voter, lock);
    }

    /// Transfère des tokens entre deux adresses
    pub fn transfer(&mut self, from: Address, to: Address, amount: u64, now: DateTime<Utc>) -> TokenResult<()> {
        if from != to {
            self.ensure_unlocked(&from, amount, now)?;
        }
        self.move_balance(from, to, amount)?;
        debug!("Transfert de {} {} de {} vers {}", amount, self.metadata.symbol, from, to);
        self.emit(TokenEventType::Transfer { from, to, amount }, now);
        Ok(())
    }

    /// Fixe l'allocation de `spender` sur les fonds de `owner`
    pub fn approve(&mut self, owner: Address, spender: Address, amount: u64, now: DateTime<Utc>) -> TokenResult<()> {
        if spender.is_zero() {
            return Err(TokenError::InvalidRecipient(spender));
        }

        if amount == 0 {
            if let Some(spenders) = self.allowances.get_mut(&owner) {
                spenders.remove(&spender);
                if spenders.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
        } else {
            self.allowances.entry(owner).or_default().insert(spender, amount);
        }

        self.emit(TokenEventType::Approval { owner, spender, amount }, now);
        Ok(())
    }

    /// Transfère depuis une allocation (transferFrom)
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u64,
        now: DateTime<Utc>,
    ) -> TokenResult<()> {
        let current_allowance = self.allowance(&from, &spender);
        if current_allowance < amount {
            return Err(TokenError::InsufficientAllowance {
                required: amount,
                available: current_allowance,
            });
        }

        self.transfer(from, to, amount, now)?;

        let remaining = current_allowance - amount;
        if let Some(spenders) = self.allowances.get_mut(&from) {
            if remaining == 0 {
                spenders.remove(&spender);
            } else {
                spenders.insert(spender, remaining);
            }
            if spenders.is_empty() {
                self.allowances.remove(&from);
            }
        }

        Ok(())
    }

    /// Réclamation unique du faucet, retourne le montant reçu
    pub fn claim(&mut self, claimant: Address, now: DateTime<Utc>) -> TokenResult<u64> {
        if self.claimed.contains(&claimant) {
            return Err(TokenError::AlreadyClaimed(claimant));
        }
        let reserve = self.faucet_reserve();
        if reserve < self.claim_amount {
            return Err(TokenError::FaucetDepleted {
                required: self.claim_amount,
                available: reserve,
            });
        }

        let amount = self.claim_amount;
        self.move_balance(faucet_reserve_address(), claimant, amount)?;
        self.claimed.insert(claimant);

        info!("{} a réclamé {} {} au faucet", claimant, amount, self.metadata.symbol);
        self.emit(TokenEventType::Claimed { claimant, amount }, now);

        Ok(amount)
    }

    /// Stake des tokens liquides
    pub fn stake(&mut self, staker: Address, amount: u64, now: DateTime<Utc>) -> TokenResult<()> {
        let balance = self.balance_of(&staker);
        if balance < amount {
            return Err(TokenError::InsufficientBalance {
                required: amount,
                available: balance,
            });
        }
        self.staking.check_deposit(&staker, amount)?;

        self.debit(staker, amount);
        let staked = self.staking.deposit(staker, amount, now)?;

        info!("{} a staké {} (total {})", staker, amount, staked);
        self.emit(TokenEventType::Staked { staker, amount }, now);
        Ok(())
    }

    /// Retire des tokens du staking vers le solde liquide
    pub fn unstake(&mut self, staker: Address, amount: u64, now: DateTime<Utc>) -> TokenResult<()> {
        let credited = self.balance_of(&staker).checked_add(amount).ok_or(TokenError::Overflow)?;
        let remaining = self.staking.withdraw(staker, amount, now)?;
        self.balances.insert(staker, credited);

        info!("{} a retiré {} du staking (reste {})", staker, amount, remaining);
        self.emit(TokenEventType::Unstaked { staker, amount }, now);
        Ok(())
    }

    /// Verse les récompenses accumulées depuis le pool
    pub fn claim_rewards(&mut self, staker: Address, now: DateTime<Utc>) -> TokenResult<u64> {
        let pending = self.staking.pending_rewards(&staker, now);
        if pending == 0 {
            return Err(TokenError::NoRewards(staker));
        }
        let pool = self.rewards_pool();
        if pool < pending {
            return Err(TokenError::InsufficientRewardPool {
                required: pending,
                available: pool,
            });
        }
        self.balance_of(&staker).checked_add(pending).ok_or(TokenError::Overflow)?;

        let reward = self.staking.take_rewards(&staker, now);
        self.move_balance(rewards_pool_address(), staker, reward)?;

        info!("{} a reçu {} de récompenses de staking", staker, reward);
        self.emit(TokenEventType::RewardsPaid { staker, amount: reward }, now);
        Ok(reward)
    }

    /// Statistiques du ledger
    pub fn statistics(&self) -> TokenStatistics {
        TokenStatistics {
            total_supply: self.total_supply,
            total_staked: self.staking.total_staked(),
            faucet_reserve: self.faucet_reserve(),
            rewards_pool: self.rewards_pool(),
            holders_count: self.balances.len(),
            stakers_count: self.staking.stakers_count(),
            claims_count: self.claimed.len(),
            total_rewards_paid: self.staking.total_rewards_paid(),
        }
    }

    /// Vérifie la conservation de la supply
    pub fn validate_integrity(&self) -> TokenResult<()> {
        let liquid: u128 = self.balances.values().map(|b| u128::from(*b)).sum();
        let accounted = liquid + u128::from(self.staking.total_staked());
        if accounted != u128::from(self.total_supply) {
            return Err(TokenError::IntegrityViolation {
                accounted,
                supply: self.total_supply,
            });
        }
        Ok(())
    }

    /// Copie de l'état sans l'historique d'événements
    pub(crate) fn checkpoint(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            total_supply: self.total_supply,
            owner: self.owner,
            claim_amount: self.claim_amount,
            balances: self.balances.clone(),
            allowances: self.allowances.clone(),
            claimed: self.claimed.clone(),
            staking: self.staking.clone(),
            vote_locks: self.vote_locks.clone(),
            events: Vec::new(),
            created_at: self.created_at,
        }
    }

    /// Revient à `checkpoint` en tronquant le journal à `events_len`
    pub(crate) fn restore(&mut self, mut checkpoint: Self, events_len: usize) {
        let mut events = std::mem::take(&mut self.events);
        events.truncate(events_len);
        checkpoint.events = events;
        *self = checkpoint;
    }

    fn ensure_unlocked(&self, from: &Address, amount: u64, now: DateTime<Utc>) -> TokenResult<()> {
        let Some(lock) = self.vote_lock(from, now) else {
            return Ok(());
        };
        let available = self.unlocked_power(from, now);
        if amount > available {
            return Err(TokenError::VotesLocked {
                required: amount,
                available,
                until: lock.until,
            });
        }
        Ok(())
    }

    /// Déplace des tokens après avoir validé toutes les préconditions
    fn move_balance(&mut self, from: Address, to: Address, amount: u64) -> TokenResult<()> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount { amount });
        }
        if to.is_zero() {
            return Err(TokenError::InvalidRecipient(to));
        }
        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(TokenError::InsufficientBalance {
                required: amount,
                available: from_balance,
            });
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self.balance_of(&to).checked_add(amount).ok_or(TokenError::Overflow)?;

        self.debit(from, amount);
        self.balances.insert(to, to_balance);
        Ok(())
    }

    // Appelant responsable de la vérification du solde
    fn debit(&mut self, address: Address, amount: u64) {
        let remaining = self.balance_of(&address).saturating_sub(amount);
        if remaining == 0 {
            self.balances.remove(&address);
        } else {
            self.balances.insert(address, remaining);
        }
    }

    fn emit(&mut self, event_type: TokenEventType, timestamp: DateTime<Utc>) {
        self.events.push(TokenEvent { event_type, timestamp });
    }
}
