use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use mockall::automock;
use parking_lot::Mutex;

use pagepack_core::types::{Batch, Chain};
use pagepack_filesystem::FileSystemRef;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
  #[error("Queue state I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("Queue state is corrupt: {0}")]
  Corrupt(#[from] serde_json::Error),
}

/// Persistence boundary of the merge worker.
///
/// A batch saved here must survive the process terminating before or during
/// dispatch; a later invocation resumes from exactly this state. `update_batch`
/// is called after every processed item so items are never replayed.
#[automock]
pub trait QueueStore {
  fn save_batch(&self, batch: &Batch) -> Result<(), QueueError>;

  /// The oldest pending batch of one chain, left in place. The store is
  /// shared by every concurrently dispatched worker, so consumption must be
  /// scoped to the caller's chain; a worker never sees another chain's work.
  fn peek_batch(&self, chain_id: &str) -> Result<Option<Batch>, QueueError>;

  fn update_batch(&self, batch: &Batch) -> Result<(), QueueError>;

  fn remove_batch(&self, batch_id: &str) -> Result<(), QueueError>;

  fn pending_batches(&self) -> Result<usize, QueueError>;

  fn load_chain(&self, chain_id: &str) -> Result<Option<Chain>, QueueError>;

  fn save_chain(&self, chain: &Chain) -> Result<(), QueueError>;

  fn clear_chain(&self, chain_id: &str) -> Result<(), QueueError>;
}

pub type QueueStoreRef = Arc<dyn QueueStore + Send + Sync>;

/// In-memory queue store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
  batches: Mutex<VecDeque<Batch>>,
  chains: Mutex<HashMap<String, Chain>>,
}

impl InMemoryQueueStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl QueueStore for InMemoryQueueStore {
  fn save_batch(&self, batch: &Batch) -> Result<(), QueueError> {
    self.batches.lock().push_back(batch.clone());
    Ok(())
  }

  fn peek_batch(&self, chain_id: &str) -> Result<Option<Batch>, QueueError> {
    Ok(
      self
        .batches
        .lock()
        .iter()
        .find(|batch| batch.chain_id == chain_id)
        .cloned(),
    )
  }

  fn update_batch(&self, batch: &Batch) -> Result<(), QueueError> {
    let mut batches = self.batches.lock();
    if let Some(stored) = batches.iter_mut().find(|stored| stored.id == batch.id) {
      *stored = batch.clone();
    }
    Ok(())
  }

  fn remove_batch(&self, batch_id: &str) -> Result<(), QueueError> {
    self.batches.lock().retain(|batch| batch.id != batch_id);
    Ok(())
  }

  fn pending_batches(&self) -> Result<usize, QueueError> {
    Ok(self.batches.lock().len())
  }

  fn load_chain(&self, chain_id: &str) -> Result<Option<Chain>, QueueError> {
    Ok(self.chains.lock().get(chain_id).cloned())
  }

  fn save_chain(&self, chain: &Chain) -> Result<(), QueueError> {
    self.chains.lock().insert(chain.chain_id.clone(), chain.clone());
    Ok(())
  }

  fn clear_chain(&self, chain_id: &str) -> Result<(), QueueError> {
    self.chains.lock().remove(chain_id);
    Ok(())
  }
}

/// Queue store persisting batches and chains as JSON files under a state
/// directory, so worker state survives process restarts.
///
/// Batch file names start with the zero-padded sequence number embedded in
/// the batch id, so lexicographic order is dispatch order.
pub struct JsonFileQueueStore {
  file_system: FileSystemRef,
  batches_dir: PathBuf,
  chains_dir: PathBuf,
  // File listing goes through std::fs; the FileSystem trait only covers the
  // operations bundles need. Tracked ids keep the two in sync.
  batch_ids: Mutex<Vec<String>>,
}

impl JsonFileQueueStore {
  pub fn new(file_system: FileSystemRef, state_dir: PathBuf) -> Self {
    let batches_dir = state_dir.join("batches");
    let chains_dir = state_dir.join("chains");

    let mut batch_ids: Vec<String> = std::fs::read_dir(&batches_dir)
      .map(|entries| {
        entries
          .filter_map(|entry| entry.ok())
          .filter_map(|entry| {
            entry
              .path()
              .file_stem()
              .map(|stem| stem.to_string_lossy().into_owned())
          })
          .collect()
      })
      .unwrap_or_default();
    batch_ids.sort();

    Self {
      file_system,
      batches_dir,
      chains_dir,
      batch_ids: Mutex::new(batch_ids),
    }
  }

  fn batch_path(&self, batch_id: &str) -> PathBuf {
    self.batches_dir.join(format!("{batch_id}.json"))
  }

  fn chain_path(&self, chain_id: &str) -> PathBuf {
    self.chains_dir.join(format!("{chain_id}.json"))
  }
}

impl QueueStore for JsonFileQueueStore {
  fn save_batch(&self, batch: &Batch) -> Result<(), QueueError> {
    let contents = serde_json::to_vec_pretty(batch)?;
    self.file_system.write(&self.batch_path(&batch.id), &contents)?;

    let mut batch_ids = self.batch_ids.lock();
    if !batch_ids.contains(&batch.id) {
      batch_ids.push(batch.id.clone());
      batch_ids.sort();
    }
    Ok(())
  }

  fn peek_batch(&self, chain_id: &str) -> Result<Option<Batch>, QueueError> {
    // Ids sort in dispatch order; the chain linkage lives inside the JSON,
    // so candidates are deserialized until the chain's oldest batch shows up.
    let batch_ids = self.batch_ids.lock().clone();
    for batch_id in batch_ids {
      let contents = self.file_system.read(&self.batch_path(&batch_id))?;
      let batch: Batch = serde_json::from_slice(&contents)?;
      if batch.chain_id == chain_id {
        return Ok(Some(batch));
      }
    }
    Ok(None)
  }

  fn update_batch(&self, batch: &Batch) -> Result<(), QueueError> {
    let contents = serde_json::to_vec_pretty(batch)?;
    self.file_system.write(&self.batch_path(&batch.id), &contents)?;
    Ok(())
  }

  fn remove_batch(&self, batch_id: &str) -> Result<(), QueueError> {
    self.batch_ids.lock().retain(|id| id != batch_id);
    let path = self.batch_path(batch_id);
    if self.file_system.exists(&path) {
      self.file_system.delete_file(&path)?;
    }
    Ok(())
  }

  fn pending_batches(&self) -> Result<usize, QueueError> {
    Ok(self.batch_ids.lock().len())
  }

  fn load_chain(&self, chain_id: &str) -> Result<Option<Chain>, QueueError> {
    let path = self.chain_path(chain_id);
    if !self.file_system.exists(&path) {
      return Ok(None);
    }
    let contents = self.file_system.read(&path)?;
    Ok(Some(serde_json::from_slice(&contents)?))
  }

  fn save_chain(&self, chain: &Chain) -> Result<(), QueueError> {
    let contents = serde_json::to_vec_pretty(chain)?;
    self.file_system.write(&self.chain_path(&chain.chain_id), &contents)?;
    Ok(())
  }

  fn clear_chain(&self, chain_id: &str) -> Result<(), QueueError> {
    let path = self.chain_path(chain_id);
    if self.file_system.exists(&path) {
      self.file_system.delete_file(&path)?;
    }
    Ok(())
  }
}
