pub mod batch;
pub mod delete;
pub mod export;
pub mod health;
pub mod history;
pub mod infer;
pub mod record;
pub mod stats;
pub mod validate;

use serde::Serialize;
use sitecheck_core::{Config, RecordStore};
use sitecheck_records::{read_jsonl, with_file_lock, write_jsonl, DetectionEvent, Paths};
use std::future::Future;
use std::path::Path;

/// Data directory plus the store loaded from its snapshot file
pub struct Workspace {
    pub paths: Paths,
    pub store: RecordStore,
    capacity: usize,
}

impl Workspace {
    pub fn open(data_dir: Option<&Path>) -> anyhow::Result<Self> {
        let paths = match data_dir {
            Some(dir) => Paths::at(dir),
            None => Paths::new()?,
        };
        let capacity = Config::store_capacity_from_env()?;
        let store = load_store(&paths, capacity)?;
        Ok(Self {
            paths,
            store,
            capacity,
        })
    }

    /// Detector settings, read only by commands that reach the detector
    pub fn detector_config(&self) -> anyhow::Result<Config> {
        Ok(Config::from_env()?)
    }

    /// Apply `mutate` to the latest snapshot while holding the data-dir lock,
    /// then write it back. Concurrent runs queue on the lock, so none of
    /// their changes are lost.
    pub fn update<T, F>(&self, mutate: F) -> anyhow::Result<T>
    where
        F: FnOnce(&RecordStore) -> anyhow::Result<T>,
    {
        with_file_lock(&self.paths.lock_file(), || {
            let store = load_store(&self.paths, self.capacity)?;
            let out = mutate(&store)?;
            write_jsonl(&self.paths.records_file(), &store.list())?;
            Ok(out)
        })
    }
}

fn load_store(paths: &Paths, capacity: usize) -> anyhow::Result<RecordStore> {
    let snapshot: Vec<DetectionEvent> = read_jsonl(&paths.records_file())?;
    tracing::debug!(records = snapshot.len(), dir = %paths.data_dir.display(), "loaded snapshot");
    Ok(RecordStore::from_snapshot(snapshot, capacity))
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Drive an async detector call to completion from a sync command
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(fut))
}
