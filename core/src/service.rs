//! Service asynchrone autour du runtime
//!
//! `DaoService` sérialise tous les appels derrière un `tokio::sync::Mutex` :
//! un appel modifiant l'état se termine entièrement avant que le suivant ne
//! commence. La hauteur de bloc augmente à chaque appel accepté et
//! l'horodatage vient d'une [`Clock`] injectable.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::info;
use crate::crypto::Address;
use crate::error::{CoreError, Result};
use crate::runtime::{BlockContext, DaoRuntime, Receipt};
use crate::serialization::{CompressionAlgorithm, RuntimeSnapshot, SerializationFormat};
use crate::transaction::{Call, Transaction};

/// Source de temps du service
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Horloge système
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Horloge pilotée manuellement (tests, simulations)
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = now;
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = *guard + delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct ServiceState {
    runtime: DaoRuntime,
    height: u64,
}

impl ServiceState {
    fn next_block(&self, clock: &dyn Clock) -> BlockContext {
        BlockContext::new(self.height + 1, clock.now())
    }
}

/// Service partagé, clonable entre tâches
#[derive(Clone)]
pub struct DaoService {
    state: Arc<Mutex<ServiceState>>,
    clock: Arc<dyn Clock>,
}

impl DaoService {
    pub fn new(runtime: DaoRuntime, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ServiceState { runtime, height: 0 })),
            clock,
        }
    }

    /// Restaure un service depuis un snapshot sur disque
    pub async fn load(path: PathBuf, clock: Arc<dyn Clock>) -> Result<Self> {
        let snapshot = tokio::task::spawn_blocking(move || RuntimeSnapshot::load(&path))
            .await
            .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))??;
        let runtime = DaoRuntime::from_snapshot(snapshot)?;
        Ok(Self::new(runtime, clock))
    }

    /// Soumet une transaction signée dans le bloc suivant
    pub async fn submit(&self, tx: Transaction) -> Result<Receipt> {
        let mut state = self.state.lock().await;
        let block = state.next_block(self.clock.as_ref());
        let receipt = state.runtime.submit(&tx, &block)?;
        state.height = block.height;
        Ok(receipt)
    }

    /// Exécute un appel de confiance dans le bloc suivant
    pub async fn execute(&self, sender: Address, call: Call) -> Receipt {
        let mut state = self.state.lock().await;
        let block = state.next_block(self.clock.as_ref());
        let receipt = state.runtime.execute(sender, &call, &block);
        state.height = block.height;
        receipt
    }

    /// Lecture cohérente de l'état
    pub async fn read<R>(&self, f: impl FnOnce(&DaoRuntime) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.runtime)
    }

    /// Vide le journal de reçus du runtime
    pub async fn take_receipts(&self) -> Vec<Receipt> {
        self.state.lock().await.runtime.take_receipts()
    }

    pub async fn height(&self) -> u64 {
        self.state.lock().await.height
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn snapshot(&self) -> RuntimeSnapshot {
        self.state.lock().await.runtime.snapshot()
    }

    /// Écrit un snapshot sur disque hors du thread async
    pub async fn save_snapshot(
        &self,
        path: PathBuf,
        format: SerializationFormat,
        compression: CompressionAlgorithm,
    ) -> Result<()> {
        let snapshot = self.snapshot().await;
        tokio::task::spawn_blocking(move || snapshot.save(&path, format, compression))
            .await
            .map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))??;
        info!("Snapshot du service sauvegardé");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClimateDaoConfig;
    use crate::crypto::generate_keypair_from_seed;
    use crate::runtime::CallOutcome;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 22, 8, 0, 0).unwrap()
    }

    fn create_service(clock: Arc<ManualClock>) -> DaoService {
        let runtime = DaoRuntime::new(&ClimateDaoConfig::default(), Address::system("owner"), start()).unwrap();
        DaoService::new(runtime, clock)
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(start());
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), start() + Duration::hours(2));
        clock.set(start());
        assert_eq!(clock.now(), start());
    }

    #[tokio::test]
    async fn test_concurrent_claims_are_serialized() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = create_service(clock);

        let mut handles = Vec::new();
        for seed in 1..=8u8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let keypair = generate_keypair_from_seed(&[seed; 32]);
                let tx = Transaction::new(&keypair, 0, Call::ClaimTokens).unwrap();
                service.submit(tx).await.unwrap()
            }));
        }

        let mut heights = Vec::new();
        for handle in handles {
            let receipt = handle.await.unwrap();
            assert_eq!(receipt.outcome, Some(CallOutcome::TokensClaimed(1_000)));
            heights.push(receipt.block_height);
        }
        heights.sort_unstable();
        assert_eq!(heights, (1..=8).collect::<Vec<u64>>());
        assert_eq!(service.height().await, 8);

        let claims = service.read(|runtime| runtime.token().statistics().claims_count).await;
        assert_eq!(claims, 8);
    }

    #[tokio::test]
    async fn test_rejected_transaction_does_not_advance_height() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = create_service(clock);
        let keypair = generate_keypair_from_seed(&[4u8; 32]);

        let tx = Transaction::new(&keypair, 5, Call::ClaimTokens).unwrap();
        assert!(service.submit(tx).await.is_err());
        assert_eq!(service.height().await, 0);
    }

    #[tokio::test]
    async fn test_take_receipts_drains_journal() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = create_service(clock);

        service.execute(Address::system("alice"), Call::ClaimTokens).await;
        service.execute(Address::system("alice"), Call::ClaimTokens).await;

        let receipts = service.take_receipts().await;
        assert_eq!(receipts.len(), 2);
        assert!(!receipts[1].is_success());
        assert!(service.take_receipts().await.is_empty());
    }

    #[tokio::test]
    async fn test_clock_drives_block_timestamp() {
        let clock = Arc::new(ManualClock::new(start()));
        let service = create_service(clock.clone());

        clock.advance(Duration::days(3));
        let receipt = service.execute(Address::system("alice"), Call::ClaimTokens).await;
        assert_eq!(receipt.timestamp, start() + Duration::days(3));
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.snapshot");
        let clock = Arc::new(ManualClock::new(start()));
        let service = create_service(clock.clone());

        service.execute(Address::system("alice"), Call::ClaimTokens).await;
        service
            .save_snapshot(path.clone(), SerializationFormat::Cbor, CompressionAlgorithm::Zstd)
            .await
            .unwrap();

        let restored = DaoService::load(path, clock).await.unwrap();
        let balance = restored
            .read(|runtime| runtime.token().balance_of(&Address::system("alice")))
            .await;
        assert_eq!(balance, 1_000);
    }
}
