use super::*;

/// Block-scoped staging area layered over a [`Store`](crate::store::Store). Reads fall through
/// to the store when the overlay has no entry; writes land only in the overlay until the owning
/// block is committed, so a crash or early return never leaves partial block state visible.
#[derive(Default)]
pub struct BlockOverlay {
  balances: HashMap<(String, String), Num>,
  minted: HashMap<String, Num>,
  deploys: HashMap<String, Deploy>,
  operations: Vec<OperationLogEntry>,
}

impl BlockOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get_deploy(&self, store: &dyn Store, ticker_normalized: &str) -> anyhow::Result<Option<Deploy>> {
    if let Some(deploy) = self.deploys.get(ticker_normalized) {
      return Ok(Some(deploy.clone()));
    }
    store.get_deploy(ticker_normalized)
  }

  pub fn insert_deploy(&mut self, ticker_normalized: String, deploy: Deploy) {
    self.deploys.insert(ticker_normalized, deploy);
  }

  pub fn get_balance(
    &self,
    store: &dyn Store,
    address: &str,
    ticker_normalized: &str,
  ) -> anyhow::Result<Num> {
    let key = (address.to_string(), ticker_normalized.to_string());
    if let Some(balance) = self.balances.get(&key) {
      return Ok(balance.clone());
    }
    Ok(store.get_balance(address, ticker_normalized)?.unwrap_or_else(Num::zero))
  }

  pub fn set_balance(&mut self, address: &str, ticker_normalized: &str, balance: Num) {
    self
      .balances
      .insert((address.to_string(), ticker_normalized.to_string()), balance);
  }

  pub fn get_total_minted(&self, store: &dyn Store, ticker_normalized: &str) -> anyhow::Result<Num> {
    if let Some(minted) = self.minted.get(ticker_normalized) {
      return Ok(minted.clone());
    }
    Ok(store.get_total_minted(ticker_normalized)?.unwrap_or_else(Num::zero))
  }

  pub fn set_total_minted(&mut self, ticker_normalized: &str, minted: Num) {
    self.minted.insert(ticker_normalized.to_string(), minted);
  }

  pub fn push_operation(&mut self, entry: OperationLogEntry) {
    self.operations.push(entry);
  }

  /// Snapshots the overlay's current staged values, used by multi-transfer simulation to try a
  /// batch of steps and roll back cleanly on failure without touching the real overlay.
  pub fn snapshot(&self) -> OverlaySnapshot {
    OverlaySnapshot {
      balances: self.balances.clone(),
      minted: self.minted.clone(),
    }
  }

  pub fn restore(&mut self, snapshot: OverlaySnapshot) {
    self.balances = snapshot.balances;
    self.minted = snapshot.minted;
  }

  pub fn into_parts(
    self,
  ) -> (
    HashMap<(String, String), Num>,
    HashMap<String, Num>,
    HashMap<String, Deploy>,
    Vec<OperationLogEntry>,
  ) {
    (self.balances, self.minted, self.deploys, self.operations)
  }

  pub fn operations(&self) -> &[OperationLogEntry] {
    &self.operations
  }
}

pub struct OverlaySnapshot {
  balances: HashMap<(String, String), Num>,
  minted: HashMap<String, Num>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  #[test]
  fn falls_through_to_store_then_shadows() {
    let store = MemoryStore::new();
    let mut overlay = BlockOverlay::new();
    assert_eq!(
      overlay.get_balance(&store, "addr", "ORDI").unwrap(),
      Num::zero()
    );
    overlay.set_balance("addr", "ORDI", Num::from_str("5").unwrap());
    assert_eq!(
      overlay.get_balance(&store, "addr", "ORDI").unwrap().to_string(),
      "5"
    );
  }

  #[test]
  fn snapshot_restore_round_trips() {
    let store = MemoryStore::new();
    let mut overlay = BlockOverlay::new();
    overlay.set_balance("addr", "ORDI", Num::from_str("5").unwrap());
    let snap = overlay.snapshot();
    overlay.set_balance("addr", "ORDI", Num::from_str("999").unwrap());
    overlay.restore(snap);
    assert_eq!(
      overlay.get_balance(&store, "addr", "ORDI").unwrap().to_string(),
      "5"
    );
  }
}
