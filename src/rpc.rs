use super::*;

use bitcoincore_rpc::{Auth, Client, RpcApi};

/// A [`BlockSource`]/[`UTXOResolver`] pair backed by a single `bitcoincore_rpc::Client`. This is
/// the one concrete integration this crate ships; any caller can substitute their own by
/// implementing both traits directly against whatever block/UTXO access they already have.
pub struct BitcoinRpc {
  client: Client,
  network: Network,
}

impl BitcoinRpc {
  pub fn connect(url: &str, user: &str, pass: &str, network: Network) -> anyhow::Result<Self> {
    let client = Client::new(url, Auth::UserPass(user.to_string(), pass.to_string()))
      .with_context(|| format!("failed to connect to bitcoind at `{url}`"))?;
    Ok(Self { client, network })
  }

  fn to_tx_view(&self, tx: &Transaction) -> TxView {
    TxView {
      txid: tx.txid(),
      vin: tx.input.iter().map(|input| self.to_txin_view(input)).collect(),
      vout: tx.output.iter().map(|output| self.to_txout_view(output)).collect(),
    }
  }

  fn to_txin_view(&self, input: &TxIn) -> TxInView {
    if input.previous_output.is_null() {
      return TxInView {
        is_coinbase: true,
        prev_txid: None,
        prev_vout: None,
        signature: None,
      };
    }

    let signature = if let Some(witness_sig) = input.witness.iter().next() {
      Some(SignatureSource::Witness(witness_sig.to_vec()))
    } else {
      brc20::script::first_push(&input.script_sig).map(SignatureSource::ScriptSig)
    };

    TxInView {
      is_coinbase: false,
      prev_txid: Some(input.previous_output.txid),
      prev_vout: Some(input.previous_output.vout),
      signature,
    }
  }

  fn to_txout_view(&self, output: &TxOut) -> TxOutView {
    let hex = hex::encode(output.script_pubkey.as_bytes());
    let address = Address::from_script(&output.script_pubkey, self.network)
      .ok()
      .map(|a| a.to_string());
    TxOutView {
      script_pubkey: ScriptPubKey {
        script_type: if output.script_pubkey.is_op_return() {
          "nulldata".to_string()
        } else {
          "unknown".to_string()
        },
        hex,
        addresses: address.clone().into_iter().collect(),
        address,
      },
    }
  }
}

impl BlockSource for BitcoinRpc {
  fn tip_height(&self) -> anyhow::Result<u64> {
    Ok(self.client.get_block_count()?)
  }

  fn block_at(&self, height: u64) -> anyhow::Result<Option<BlockView>> {
    let hash = match self.client.get_block_hash(height) {
      Ok(hash) => hash,
      Err(_) => return Ok(None),
    };
    let block = self.client.get_block(&hash)?;
    Ok(Some(BlockView {
      height,
      hash,
      timestamp: block.header.time,
      transactions: block.txdata.iter().map(|tx| self.to_tx_view(tx)).collect(),
    }))
  }
}

impl UTXOResolver for BitcoinRpc {
  fn get_input_address(&self, prev_txid: Txid, vout: u32) -> anyhow::Result<Option<String>> {
    let prev_tx = match self.client.get_raw_transaction(&prev_txid, None) {
      Ok(tx) => tx,
      Err(_) => return Ok(None),
    };
    Ok(prev_tx
      .output
      .get(vout as usize)
      .and_then(|out| Address::from_script(&out.script_pubkey, self.network).ok())
      .map(|a| a.to_string()))
  }
}
