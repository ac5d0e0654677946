use super::*;

use redb::{Database, ReadableTable, TableDefinition};

const DEPLOYS: TableDefinition<&str, &[u8]> = TableDefinition::new("DEPLOYS");
const BALANCES: TableDefinition<&str, &[u8]> = TableDefinition::new("BALANCES");
const MINT_TOTALS: TableDefinition<&str, &[u8]> = TableDefinition::new("MINT_TOTALS");
const OPERATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("OPERATIONS");
const PROCESSED_BLOCKS: TableDefinition<&str, &[u8]> = TableDefinition::new("PROCESSED_BLOCKS");

const TIP_KEY: &str = "tip";

fn balance_key(address: &str, ticker_normalized: &str) -> String {
  format!("{address}\u{0}{ticker_normalized}")
}

/// A [`Store`] backed by `redb`, one table per entity, following the teacher's
/// one-table-per-datastore `redb` convention. Every commit runs inside a single write
/// transaction so a block's balance/deploy/mint-total/operation-log writes and its
/// processed-block marker become visible atomically.
pub struct RedbStore {
  db: Database,
}

impl RedbStore {
  pub fn open(path: &std::path::Path) -> anyhow::Result<Self> {
    let db = Database::create(path)?;
    let wtx = db.begin_write()?;
    wtx.open_table(DEPLOYS)?;
    wtx.open_table(BALANCES)?;
    wtx.open_table(MINT_TOTALS)?;
    wtx.open_table(OPERATIONS)?;
    wtx.open_table(PROCESSED_BLOCKS)?;
    wtx.commit()?;
    Ok(Self { db })
  }
}

impl Store for RedbStore {
  fn get_deploy(&self, ticker_normalized: &str) -> anyhow::Result<Option<Deploy>> {
    let rtx = self.db.begin_read()?;
    let table = rtx.open_table(DEPLOYS)?;
    Ok(match table.get(ticker_normalized)? {
      Some(value) => Some(bincode::deserialize(value.value())?),
      None => None,
    })
  }

  fn get_balance(&self, address: &str, ticker_normalized: &str) -> anyhow::Result<Option<Num>> {
    let rtx = self.db.begin_read()?;
    let table = rtx.open_table(BALANCES)?;
    Ok(match table.get(balance_key(address, ticker_normalized).as_str())? {
      Some(value) => Some(bincode::deserialize(value.value())?),
      None => None,
    })
  }

  fn get_total_minted(&self, ticker_normalized: &str) -> anyhow::Result<Option<Num>> {
    let rtx = self.db.begin_read()?;
    let table = rtx.open_table(MINT_TOTALS)?;
    Ok(match table.get(ticker_normalized)? {
      Some(value) => Some(bincode::deserialize(value.value())?),
      None => None,
    })
  }

  fn highest_processed_block(&self) -> anyhow::Result<Option<(u64, BlockHash)>> {
    let rtx = self.db.begin_read()?;
    let table = rtx.open_table(PROCESSED_BLOCKS)?;
    Ok(match table.get(TIP_KEY)? {
      Some(value) => Some(bincode::deserialize(value.value())?),
      None => None,
    })
  }

  fn commit_block(&self, commit: BlockCommit) -> anyhow::Result<()> {
    let wtx = self.db.begin_write()?;
    {
      let mut table = wtx.open_table(DEPLOYS)?;
      for (ticker_normalized, deploy) in &commit.deploys {
        table.insert(
          ticker_normalized.as_str(),
          bincode::serialize(deploy)?.as_slice(),
        )?;
      }
    }
    {
      let mut table = wtx.open_table(BALANCES)?;
      for ((address, ticker_normalized), balance) in &commit.balances {
        table.insert(
          balance_key(address, ticker_normalized).as_str(),
          bincode::serialize(balance)?.as_slice(),
        )?;
      }
    }
    {
      let mut table = wtx.open_table(MINT_TOTALS)?;
      for (ticker_normalized, minted) in &commit.minted {
        table.insert(
          ticker_normalized.as_str(),
          bincode::serialize(minted)?.as_slice(),
        )?;
      }
    }
    {
      let mut table = wtx.open_table(OPERATIONS)?;
      let key = format!("{:012}", commit.height);
      table.insert(key.as_str(), bincode::serialize(&commit.operations)?.as_slice())?;
    }
    {
      let mut table = wtx.open_table(PROCESSED_BLOCKS)?;
      table.insert(
        TIP_KEY,
        bincode::serialize(&(commit.height, commit.hash))?.as_slice(),
      )?;
    }
    wtx.commit()?;
    Ok(())
  }
}
