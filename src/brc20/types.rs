use super::*;

/// An immutable record of a successful `deploy` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deploy {
  pub ticker: String,
  pub max_supply: Num,
  pub limit_per_op: Option<Num>,
  pub deploy_txid: Txid,
  pub deploy_height: u64,
  pub deploy_timestamp: u32,
  pub deployer_address: Option<String>,
}

/// What kind of BRC-20 operation a transaction's OP_RETURN payload decoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
  Deploy,
  Mint,
  Transfer,
  Invalid,
}

/// How a valid transfer operation was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
  Simple,
  Marketplace,
}

/// One row of the append-only operation log: written for every BRC-20-shaped OP_RETURN
/// encountered, whether or not it turned out to be valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLogEntry {
  pub txid: Txid,
  pub vout_index: u32,
  pub operation: OperationKind,
  pub ticker: Option<String>,
  pub amount: Option<Num>,
  pub from_address: Option<String>,
  pub to_address: Option<String>,
  pub block_height: u64,
  pub block_hash: BlockHash,
  pub tx_index: u32,
  pub timestamp: u32,
  pub raw_op_return: String,
  pub parsed_json: Option<String>,
  pub is_valid: bool,
  pub error_code: Option<&'static str>,
  pub error_message: Option<String>,
  pub is_marketplace: bool,
  pub is_multi_transfer: bool,
  pub multi_transfer_step: Option<u32>,
}

impl OperationLogEntry {
  pub fn sort_key(&self) -> (u64, u32, u32, u32) {
    (
      self.block_height,
      self.tx_index,
      self.vout_index,
      self.multi_transfer_step.unwrap_or(0),
    )
  }
}

/// Outcome of processing one transaction, returned to the caller of
/// [`crate::brc20::processor::Processor::process_transaction`] for observability/testing.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
  pub operation_found: bool,
  pub is_valid: bool,
  pub error_code: Option<&'static str>,
  pub error_message: Option<String>,
  pub operation_type: Option<OperationKind>,
  pub ticker: Option<String>,
  pub amount: Option<Num>,
  pub txid: Txid,
}

impl ProcessingResult {
  pub fn not_found(txid: Txid) -> Self {
    Self {
      operation_found: false,
      is_valid: false,
      error_code: None,
      error_message: None,
      operation_type: None,
      ticker: None,
      amount: None,
      txid,
    }
  }
}
