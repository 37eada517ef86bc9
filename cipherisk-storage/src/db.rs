#[cfg(not(feature = "rocksdb"))]
use anyhow::Context;
use anyhow::{anyhow, Result};
use cipherisk_types::state::GlobalState;
use cipherisk_types::RiskEvent;
use serde::de::DeserializeOwned;
use serde::Serialize;
#[cfg(not(feature = "rocksdb"))]
use std::path::PathBuf;

/// Single commit point: `(event_count, state, engine)`.
const LEDGER_KEY: &str = "ledger";

fn event_key(seq: u64) -> String {
    format!("event_{:016x}", seq)
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| anyhow!("Serialization error: {}", e))
}

/// Snapshot store for the core state, the engine state and the
/// committed event log. Values are bincode-encoded.
///
/// State, engine and event count travel in one ledger record, so a
/// snapshot is either fully written or not at all. Event entries past the
/// recorded count belong to a commit that never landed and are overwritten
/// by the next one.
pub struct Storage {
    #[cfg(feature = "rocksdb")]
    db: rocksdb::DB,
    #[cfg(not(feature = "rocksdb"))]
    dir: PathBuf,
}

impl Storage {
    #[cfg(feature = "rocksdb")]
    pub fn new(path: &str) -> Result<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        let db = rocksdb::DB::open(&opts, path).map_err(|e| anyhow!("Failed to open DB: {}", e))?;
        Ok(Self { db })
    }

    #[cfg(not(feature = "rocksdb"))]
    pub fn new(path: &str) -> Result<Self> {
        let dir = PathBuf::from(path);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data dir {}", path))?;
        Ok(Self { dir })
    }

    #[cfg(feature = "rocksdb")]
    fn write_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()> {
        let mut batch = rocksdb::WriteBatch::default();
        for (key, value) in entries {
            batch.put(key.as_bytes(), value);
        }
        self.db.write(batch).map_err(|e| anyhow!("DB write error: {}", e))
    }

    #[cfg(feature = "rocksdb")]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db.get(key.as_bytes()).map_err(|e| anyhow!("DB read error: {}", e))
    }

    /// Writes entries in order, each through a temp file and a rename. The
    /// ledger record goes last.
    #[cfg(not(feature = "rocksdb"))]
    fn write_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<()> {
        for (key, value) in entries {
            let target = self.dir.join(format!("{}.bin", key));
            let tmp = self.dir.join(format!("{}.bin.tmp", key));
            std::fs::write(&tmp, value).with_context(|| format!("write {}", tmp.display()))?;
            std::fs::rename(&tmp, &target)
                .with_context(|| format!("rename into {}", target.display()))?;
        }
        Ok(())
    }

    #[cfg(not(feature = "rocksdb"))]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let target = self.dir.join(format!("{}.bin", key));
        match std::fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("read error on {}: {}", target.display(), e)),
        }
    }

    /// Persists the ledger together with the events the transition produced.
    pub fn commit<E: Serialize>(
        &self,
        state: &GlobalState,
        engine: &E,
        events: &[RiskEvent],
    ) -> Result<()> {
        let first = self.event_count()?;
        let mut entries = Vec::with_capacity(events.len() + 1);
        for (seq, event) in (first..).zip(events) {
            entries.push((event_key(seq), encode(event)?));
        }
        let event_count = first + events.len() as u64;
        entries.push((LEDGER_KEY.to_string(), encode(&(event_count, state, engine))?));
        self.write_all(entries)
    }

    /// Last committed state and engine, if any.
    pub fn load_ledger<E: DeserializeOwned>(&self) -> Result<Option<(GlobalState, E)>> {
        match self.get(LEDGER_KEY)? {
            Some(bytes) => {
                let (_, state, engine): (u64, GlobalState, E) = bincode::deserialize(&bytes)
                    .map_err(|e| anyhow!("Deserialization error: {}", e))?;
                Ok(Some((state, engine)))
            }
            None => Ok(None),
        }
    }

    pub fn event_count(&self) -> Result<u64> {
        match self.get(LEDGER_KEY)? {
            // The count leads the ledger record; read just that prefix.
            Some(bytes) => bincode::deserialize_from(bytes.as_slice())
                .map_err(|e| anyhow!("Deserialization error: {}", e)),
            None => Ok(0),
        }
    }

    pub fn load_events(&self, from: u64, limit: u64) -> Result<Vec<RiskEvent>> {
        let end = self.event_count()?.min(from.saturating_add(limit));
        let mut out = Vec::new();
        for seq in from..end {
            let bytes = self.get(&event_key(seq))?.ok_or_else(|| anyhow!("missing event {}", seq))?;
            let event = bincode::deserialize(&bytes)
                .map_err(|e| anyhow!("Deserialization error: {}", e))?;
            out.push(event);
        }
        Ok(out)
    }
}
