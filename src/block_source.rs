use super::*;

/// The classification and payload of an output's `scriptPubKey`, mirroring the shape
/// `bitcoincore_rpc`'s JSON-RPC responses use for `scriptPubKey` (`type`, `hex`,
/// `addresses`/`address`) so a real `BlockSource` can be backed directly by RPC calls.
#[derive(Debug, Clone)]
pub struct ScriptPubKey {
  pub script_type: String,
  pub hex: String,
  pub addresses: Vec<String>,
  pub address: Option<String>,
}

impl ScriptPubKey {
  pub fn is_op_return(&self) -> bool {
    self.script_type == "nulldata" || self.hex.starts_with("6a")
  }
}

#[derive(Debug, Clone)]
pub struct TxOutView {
  pub script_pubkey: ScriptPubKey,
}

/// Where a signature was found on an input: legacy scriptSig or segwit witness.
#[derive(Debug, Clone)]
pub enum SignatureSource {
  ScriptSig(Vec<u8>),
  Witness(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct TxInView {
  pub is_coinbase: bool,
  pub prev_txid: Option<Txid>,
  pub prev_vout: Option<u32>,
  /// The raw signature bytes (DER + trailing sighash-type byte), when resolvable.
  pub signature: Option<SignatureSource>,
}

#[derive(Debug, Clone)]
pub struct TxView {
  pub txid: Txid,
  pub vin: Vec<TxInView>,
  pub vout: Vec<TxOutView>,
}

#[derive(Debug, Clone)]
pub struct BlockView {
  pub height: u64,
  pub hash: BlockHash,
  pub timestamp: u32,
  pub transactions: Vec<TxView>,
}

/// Supplies confirmed blocks in ascending height order. Implementations typically wrap a
/// Bitcoin Core RPC client or a flat-file block store; this crate only depends on the trait.
pub trait BlockSource {
  /// The highest height currently available from this source.
  fn tip_height(&self) -> anyhow::Result<u64>;

  /// Fetches the block at `height`, or `None` if it does not (yet) exist.
  fn block_at(&self, height: u64) -> anyhow::Result<Option<BlockView>>;
}
