use super::*;

/// Resolves the address that controlled a previously-created output, i.e. the owner of a UTXO
/// before it was spent. The processor uses this to find the sender of a mint/transfer.
pub trait UTXOResolver {
  fn get_input_address(&self, prev_txid: Txid, vout: u32) -> anyhow::Result<Option<String>>;
}
