use cipherisk_engine::EncryptedArithmetic;
use cipherisk_execution::{execute_transaction, EventSink, ExecutionContext, Outcome, RiskError};
use cipherisk_storage::Storage;
use cipherisk_types::state::GlobalState;
use cipherisk_types::transaction::Transaction;
use cipherisk_types::RiskEvent;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] RiskError),
    #[error("failed to persist committed state: {0}")]
    Persistence(anyhow::Error),
}

impl SubmitError {
    pub fn rejection(&self) -> Option<&RiskError> {
        match self {
            SubmitError::Rejected(e) => Some(e),
            SubmitError::Persistence(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub tx_id: [u8; 32],
    pub outcome: Outcome,
    pub events: Vec<RiskEvent>,
}

/// Core state together with the engine it references. Always moved as a unit.
#[derive(Debug, Clone)]
pub struct Ledger<E> {
    pub state: GlobalState,
    pub engine: E,
}

/// Runs transactions one at a time. Each transaction executes against a
/// copy of the ledger; the copy replaces the live ledger only if every
/// step succeeded and the snapshot was persisted.
pub struct RiskService<E> {
    ledger: Arc<RwLock<Ledger<E>>>,
    storage: Option<Arc<Storage>>,
    sink: Arc<dyn EventSink>,
}

impl<E> Clone for RiskService<E> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            storage: self.storage.clone(),
            sink: self.sink.clone(),
        }
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl<E> RiskService<E>
where
    E: EncryptedArithmetic + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(state: GlobalState, engine: E, sink: Arc<dyn EventSink>) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger { state, engine })),
            storage: None,
            sink,
        }
    }

    /// Restores the last committed snapshot from `storage`, falling back to
    /// `genesis` and `engine` when the store is empty.
    pub fn recover_or_init(
        storage: Arc<Storage>,
        genesis: GlobalState,
        engine: E,
        sink: Arc<dyn EventSink>,
    ) -> anyhow::Result<Self> {
        let ledger = match storage.load_ledger::<E>()? {
            Some((state, engine)) => {
                info!(root = %hex::encode(state.root_hash()), "Recovered ledger from storage");
                Ledger { state, engine }
            }
            None => {
                info!("Storage empty, starting from genesis");
                storage.commit(&genesis, &engine, &[])?;
                Ledger { state: genesis, engine }
            }
        };
        Ok(Self {
            ledger: Arc::new(RwLock::new(ledger)),
            storage: Some(storage),
            sink,
        })
    }

    pub async fn submit(&self, tx: Transaction) -> Result<Receipt, SubmitError> {
        let tx_id = tx.id();
        let mut guard = self.ledger.write().await;

        let mut next = (*guard).clone();
        let (outcome, events) = {
            let mut ctx = ExecutionContext::new(&mut next.state, &mut next.engine, unix_now());
            match execute_transaction(&tx, &mut ctx) {
                Ok(outcome) => (outcome, ctx.take_events()),
                Err(e) => {
                    warn!(
                        tx = %hex::encode(&tx_id[..8]),
                        instruction = tx.instruction.name(),
                        kind = ?e.kind(),
                        "Transaction rejected: {}",
                        e
                    );
                    return Err(e.into());
                }
            }
        };

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.commit(&next.state, &next.engine, &events) {
                error!("Failed to persist transaction {}: {}", hex::encode(&tx_id[..8]), e);
                return Err(SubmitError::Persistence(e));
            }
        }

        *guard = next;
        drop(guard);

        info!(
            tx = %hex::encode(&tx_id[..8]),
            instruction = tx.instruction.name(),
            events = events.len(),
            "Transaction committed"
        );
        for event in &events {
            self.sink.notify(event);
        }
        Ok(Receipt { tx_id, outcome, events })
    }

    /// Runs `f` against a consistent view of the ledger.
    pub async fn read<R>(&self, f: impl FnOnce(&GlobalState, &E) -> R) -> R {
        let guard = self.ledger.read().await;
        f(&guard.state, &guard.engine)
    }

    pub async fn state_root(&self) -> [u8; 32] {
        self.read(|state, _| state.root_hash()).await
    }

    pub fn storage(&self) -> Option<&Arc<Storage>> {
        self.storage.as_ref()
    }
}
