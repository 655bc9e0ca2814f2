//! Sous-ledger de staking du token CLIMATE
//!
//! Les tokens stakés quittent le solde liquide et accumulent une récompense
//! linéaire : `montant * taux_bps * secondes / (10_000 * 31_536_000)`.
//! L'accumulation est soldée dans `accrued_rewards` à chaque stake, unstake
//! ou réclamation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use crate::config::{BPS_DENOMINATOR, SECONDS_PER_YEAR};
use crate::crypto::Address;
use crate::error::TokenError;
use super::TokenResult;

/// Position de staking d'une adresse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeInfo {
    /// Montant actuellement staké
    pub amount: u64,
    /// Début du stake (premier dépôt)
    pub start_time: DateTime<Utc>,
    /// Dernière accumulation soldée
    pub last_accrual: DateTime<Utc>,
    /// Récompenses accumulées non versées
    pub accrued_rewards: u64,
    /// Récompenses déjà versées
    pub total_claimed: u64,
}

impl StakeInfo {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            amount: 0,
            start_time: now,
            last_accrual: now,
            accrued_rewards: 0,
            total_claimed: 0,
        }
    }

    /// Récompenses dues à `now` (accumulées + non soldées)
    pub fn pending(&self, now: DateTime<Utc>, reward_rate_bps: u64) -> u64 {
        let elapsed = elapsed_secs(self.last_accrual, now);
        self.accrued_rewards
            .saturating_add(linear_reward(self.amount, reward_rate_bps, elapsed))
    }

    fn settle(&mut self, now: DateTime<Utc>, reward_rate_bps: u64) {
        self.accrued_rewards = self.pending(now, reward_rate_bps);
        if now > self.last_accrual {
            self.last_accrual = now;
        }
    }
}

/// Récompense linéaire pour un montant staké pendant `elapsed_secs`
pub fn linear_reward(amount: u64, reward_rate_bps: u64, elapsed_secs: u64) -> u64 {
    let numerator = u128::from(amount) * u128::from(reward_rate_bps) * u128::from(elapsed_secs);
    let denominator = u128::from(BPS_DENOMINATOR) * u128::from(SECONDS_PER_YEAR);
    u64::try_from(numerator / denominator).unwrap_or(u64::MAX)
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}

/// Ledger des positions de staking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingLedger {
    stakes: BTreeMap<Address, StakeInfo>,
    total_staked: u64,
    total_rewards_paid: u64,
    reward_rate_bps: u64,
    min_stake: u64,
}

impl StakingLedger {
    /// Crée un ledger vide
    pub fn new(reward_rate_bps: u64, min_stake: u64) -> Self {
        Self {
            stakes: BTreeMap::new(),
            total_staked: 0,
            total_rewards_paid: 0,
            reward_rate_bps,
            min_stake,
        }
    }

    pub fn staked_of(&self, staker: &Address) -> u64 {
        self.stakes.get(staker).map(|s| s.amount).unwrap_or(0)
    }

    pub fn stake_info(&self, staker: &Address) -> Option<&StakeInfo> {
        self.stakes.get(staker)
    }

    pub fn pending_rewards(&self, staker: &Address, now: DateTime<Utc>) -> u64 {
        self.stakes
            .get(staker)
            .map(|s| s.pending(now, self.reward_rate_bps))
            .unwrap_or(0)
    }

    pub fn total_staked(&self) -> u64 {
        self.total_staked
    }

    pub fn total_rewards_paid(&self) -> u64 {
        self.total_rewards_paid
    }

    pub fn reward_rate_bps(&self) -> u64 {
        self.reward_rate_bps
    }

    pub fn min_stake(&self) -> u64 {
        self.min_stake
    }

    /// Nombre d'adresses avec un montant staké non nul
    pub fn stakers_count(&self) -> usize {
        self.stakes.values().filter(|s| s.amount > 0).count()
    }

    /// Vérifie qu'un dépôt serait accepté, sans rien modifier
    pub fn check_deposit(&self, staker: &Address, amount: u64) -> TokenResult<()> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount { amount });
        }
        if amount < self.min_stake {
            return Err(TokenError::StakeBelowMinimum {
                required: self.min_stake,
                provided: amount,
            });
        }
        self.staked_of(staker).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.total_staked.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    /// Ajoute `amount` à la position, retourne le nouveau total staké de l'adresse
    pub(crate) fn deposit(&mut self, staker: Address, amount: u64, now: DateTime<Utc>) -> TokenResult<u64> {
        self.check_deposit(&staker, amount)?;

        let rate = self.reward_rate_bps;
        let info = self.stakes.entry(staker).or_insert_with(|| StakeInfo::new(now));
        if info.amount == 0 {
            info.start_time = now;
        }
        info.settle(now, rate);
        info.amount += amount;
        self.total_staked += amount;

        Ok(info.amount)
    }

    /// Retire `amount` de la position, retourne le montant restant staké
    pub(crate) fn withdraw(&mut self, staker: Address, amount: u64, now: DateTime<Utc>) -> TokenResult<u64> {
        if amount == 0 {
            return Err(TokenError::InvalidAmount { amount });
        }
        let staked = self.staked_of(&staker);
        if staked < amount {
            return Err(TokenError::InsufficientStake {
                required: amount,
                staked,
            });
        }

        let rate = self.reward_rate_bps;
        let info = self
            .stakes
            .get_mut(&staker)
            .ok_or(TokenError::InsufficientStake { required: amount, staked: 0 })?;
        info.settle(now, rate);
        info.amount -= amount;
        self.total_staked -= amount;

        Ok(info.amount)
    }

    /// Solde et remet à zéro les récompenses dues, retourne le montant
    pub(crate) fn take_rewards(&mut self, staker: &Address, now: DateTime<Utc>) -> u64 {
        let rate = self.reward_rate_bps;
        match self.stakes.get_mut(staker) {
            Some(info) => {
                info.settle(now, rate);
                let reward = info.accrued_rewards;
                info.accrued_rewards = 0;
                info.total_claimed = info.total_claimed.saturating_add(reward);
                self.total_rewards_paid = self.total_rewards_paid.saturating_add(reward);
                reward
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_linear_reward_full_year() {
        // 10% annuel sur 100_000 pendant un an
        assert_eq!(linear_reward(100_000, 1_000, SECONDS_PER_YEAR), 10_000);
        assert_eq!(linear_reward(100_000, 1_000, SECONDS_PER_YEAR / 2), 5_000);
        assert_eq!(linear_reward(100_000, 1_000, 0), 0);
    }

    #[test]
    fn test_deposit_sets_start_time_once() {
        let mut ledger = StakingLedger::new(1_000, 1);
        let staker = Address::system("staker");

        ledger.deposit(staker, 100, t0()).unwrap();
        ledger.deposit(staker, 50, t0() + Duration::days(10)).unwrap();

        let info = ledger.stake_info(&staker).unwrap();
        assert_eq!(info.amount, 150);
        assert_eq!(info.start_time, t0());
        assert_eq!(ledger.total_staked(), 150);
    }

    #[test]
    fn test_pending_rewards_accrue_linearly() {
        let mut ledger = StakingLedger::new(1_000, 1);
        let staker = Address::system("staker");
        ledger.deposit(staker, 100_000, t0()).unwrap();

        let quarter = t0() + Duration::seconds((SECONDS_PER_YEAR / 4) as i64);
        let half = t0() + Duration::seconds((SECONDS_PER_YEAR / 2) as i64);
        assert_eq!(ledger.pending_rewards(&staker, quarter), 2_500);
        assert_eq!(ledger.pending_rewards(&staker, half), 5_000);
    }

    #[test]
    fn test_withdraw_settles_rewards() {
        let mut ledger = StakingLedger::new(1_000, 1);
        let staker = Address::system("staker");
        ledger.deposit(staker, 100_000, t0()).unwrap();

        let half = t0() + Duration::seconds((SECONDS_PER_YEAR / 2) as i64);
        let remaining = ledger.withdraw(staker, 100_000, half).unwrap();
        assert_eq!(remaining, 0);

        // Plus rien ne s'accumule sur un stake vide, mais l'acquis reste
        let later = half + Duration::days(100);
        assert_eq!(ledger.pending_rewards(&staker, later), 5_000);
        assert_eq!(ledger.take_rewards(&staker, later), 5_000);
        assert_eq!(ledger.pending_rewards(&staker, later), 0);
        assert_eq!(ledger.total_rewards_paid(), 5_000);
    }

    #[test]
    fn test_withdraw_more_than_staked() {
        let mut ledger = StakingLedger::new(1_000, 1);
        let staker = Address::system("staker");
        ledger.deposit(staker, 10, t0()).unwrap();

        assert_eq!(
            ledger.withdraw(staker, 11, t0()),
            Err(TokenError::InsufficientStake { required: 11, staked: 10 })
        );
    }

    #[test]
    fn test_minimum_stake() {
        let ledger = StakingLedger::new(1_000, 100);
        let staker = Address::system("staker");
        assert_eq!(
            ledger.check_deposit(&staker, 99),
            Err(TokenError::StakeBelowMinimum { required: 100, provided: 99 })
        );
        assert_eq!(ledger.check_deposit(&staker, 0), Err(TokenError::InvalidAmount { amount: 0 }));
    }

    #[test]
    fn test_clock_going_backwards_accrues_nothing() {
        let mut ledger = StakingLedger::new(1_000, 1);
        let staker = Address::system("staker");
        ledger.deposit(staker, 100_000, t0()).unwrap();
        assert_eq!(ledger.pending_rewards(&staker, t0() - Duration::days(1)), 0);
    }
}
