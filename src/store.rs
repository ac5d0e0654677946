use super::*;

/// Transactional persistence for committed BRC-20 state. A block's worth of mutations (new
/// deploys, balance changes, mint-total changes, operation log entries, and the processed-block
/// marker) is handed to [`commit_block`](Store::commit_block) as one unit; implementations must
/// make that unit atomic so a crash mid-commit never leaves a partially-applied block visible.
pub trait Store {
  fn get_deploy(&self, ticker_normalized: &str) -> anyhow::Result<Option<Deploy>>;
  fn get_balance(&self, address: &str, ticker_normalized: &str) -> anyhow::Result<Option<Num>>;
  fn get_total_minted(&self, ticker_normalized: &str) -> anyhow::Result<Option<Num>>;

  /// The highest `(height, hash)` previously committed, used by the CLI driver to resume.
  fn highest_processed_block(&self) -> anyhow::Result<Option<(u64, BlockHash)>>;

  fn commit_block(&self, commit: BlockCommit) -> anyhow::Result<()>;
}

/// Everything produced while processing one block, ready to be applied atomically.
pub struct BlockCommit {
  pub height: u64,
  pub hash: BlockHash,
  pub deploys: HashMap<String, Deploy>,
  pub balances: HashMap<(String, String), Num>,
  pub minted: HashMap<String, Num>,
  pub operations: Vec<OperationLogEntry>,
}

/// An in-memory [`Store`] backed by `Mutex<HashMap<...>>`, used by unit and scenario tests and
/// as a reference implementation for anyone embedding the crate without `redb`.
#[derive(Default)]
pub struct MemoryStore {
  deploys: Mutex<HashMap<String, Deploy>>,
  balances: Mutex<HashMap<(String, String), Num>>,
  minted: Mutex<HashMap<String, Num>>,
  operations: Mutex<Vec<OperationLogEntry>>,
  processed: Mutex<Option<(u64, BlockHash)>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot of the operation log in replay order, for assertions in scenario tests.
  pub fn operations(&self) -> Vec<OperationLogEntry> {
    let mut ops = self.operations.lock().unwrap().clone();
    ops.sort_by_key(|entry| entry.sort_key());
    ops
  }

  /// Every committed `(ticker, Deploy)` pair, for the `replay` subcommand's bit-identical
  /// comparison against the live store (testable property 5).
  pub fn all_deploys(&self) -> HashMap<String, Deploy> {
    self.deploys.lock().unwrap().clone()
  }

  /// Every committed `((address, ticker), balance)` entry.
  pub fn all_balances(&self) -> HashMap<(String, String), Num> {
    self.balances.lock().unwrap().clone()
  }

  /// Every committed `(ticker, cumulative_minted)` entry.
  pub fn all_minted(&self) -> HashMap<String, Num> {
    self.minted.lock().unwrap().clone()
  }
}

impl Store for MemoryStore {
  fn get_deploy(&self, ticker_normalized: &str) -> anyhow::Result<Option<Deploy>> {
    Ok(self.deploys.lock().unwrap().get(ticker_normalized).cloned())
  }

  fn get_balance(&self, address: &str, ticker_normalized: &str) -> anyhow::Result<Option<Num>> {
    Ok(
      self
        .balances
        .lock()
        .unwrap()
        .get(&(address.to_string(), ticker_normalized.to_string()))
        .cloned(),
    )
  }

  fn get_total_minted(&self, ticker_normalized: &str) -> anyhow::Result<Option<Num>> {
    Ok(self.minted.lock().unwrap().get(ticker_normalized).cloned())
  }

  fn highest_processed_block(&self) -> anyhow::Result<Option<(u64, BlockHash)>> {
    Ok(*self.processed.lock().unwrap())
  }

  fn commit_block(&self, commit: BlockCommit) -> anyhow::Result<()> {
    self.deploys.lock().unwrap().extend(commit.deploys);
    self.balances.lock().unwrap().extend(commit.balances);
    self.minted.lock().unwrap().extend(commit.minted);
    self
      .operations
      .lock()
      .unwrap()
      .extend(commit.operations);
    *self.processed.lock().unwrap() = Some((commit.height, commit.hash));
    Ok(())
  }
}
