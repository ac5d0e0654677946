use std::collections::HashMap;
use std::sync::Mutex;

use bitcoin::hashes::Hash;
use bitcoin::{BlockHash, Network, Txid};

use brc20_indexer::block_source::{ScriptPubKey, SignatureSource, TxInView, TxOutView, TxView};
use brc20_indexer::brc20::{BlockOverlay, Processor};
use brc20_indexer::store::MemoryStore;
use brc20_indexer::utxo::UTXOResolver;

/// A fixed lookup table from `(prev_txid, prev_vout)` to the address that controlled that
/// output, standing in for a real UTXO set during these scenarios.
struct FixtureResolver(Mutex<HashMap<(Txid, u32), String>>);

impl FixtureResolver {
  fn new() -> Self {
    Self(Mutex::new(HashMap::new()))
  }

  fn register(&self, txid: Txid, vout: u32, address: &str) {
    self.0.lock().unwrap().insert((txid, vout), address.to_string());
  }
}

impl UTXOResolver for FixtureResolver {
  fn get_input_address(&self, prev_txid: Txid, vout: u32) -> anyhow::Result<Option<String>> {
    Ok(self.0.lock().unwrap().get(&(prev_txid, vout)).cloned())
  }
}

fn op_return_out(json: &str) -> TxOutView {
  let mut script = Vec::new();
  script.push(0x6a); // OP_RETURN
  let bytes = json.as_bytes();
  assert!(bytes.len() < 76, "fixture payload must fit a single push");
  script.push(bytes.len() as u8);
  script.extend_from_slice(bytes);
  TxOutView {
    script_pubkey: ScriptPubKey {
      script_type: "nulldata".into(),
      hex: hex::encode(script),
      addresses: vec![],
      address: None,
    },
  }
}

fn standard_out(address: &str) -> TxOutView {
  TxOutView {
    script_pubkey: ScriptPubKey {
      script_type: "pubkeyhash".into(),
      hex: "76a914000000000000000000000000000000000000000088ac".into(),
      addresses: vec![address.to_string()],
      address: None,
    },
  }
}

fn txid_from_byte(b: u8) -> Txid {
  Txid::from_slice(&[b; 32]).unwrap()
}

fn spending_input(prev: Txid, vout: u32) -> TxInView {
  TxInView {
    is_coinbase: false,
    prev_txid: Some(prev),
    prev_vout: Some(vout),
    signature: None,
  }
}

fn signed_input(prev: Txid, vout: u32, sighash_byte: u8) -> TxInView {
  TxInView {
    is_coinbase: false,
    prev_txid: Some(prev),
    prev_vout: Some(vout),
    signature: Some(SignatureSource::ScriptSig(vec![0x30, sighash_byte])),
  }
}

const BLOCK_HASH: BlockHash = BlockHash::all_zeros();

#[test]
fn s1_deploy_then_mint_then_transfer() {
  let store = MemoryStore::new();
  let resolver = FixtureResolver::new();
  let processor = Processor::new(&store, &resolver, Network::Bitcoin);
  let mut overlay = BlockOverlay::new();

  let deploy_prev = txid_from_byte(0xAA);
  let mint_prev = txid_from_byte(0xBB);

  resolver.register(deploy_prev, 0, "addr_deployer");
  resolver.register(mint_prev, 0, "addr_B");

  let tx1 = TxView {
    txid: txid_from_byte(1),
    vin: vec![spending_input(deploy_prev, 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"deploy","tick":"ORDI","m":"21000000","l":"1000"}"#),
      standard_out("addr_A"),
    ],
  };
  let result1 = processor.process_transaction(&tx1, 800_000, BLOCK_HASH, 0, 0, &mut overlay);
  assert!(result1.is_valid);

  let mint_tx_id = txid_from_byte(2);
  resolver.register(mint_tx_id, 0, "addr_B");
  let tx2 = TxView {
    txid: mint_tx_id,
    vin: vec![spending_input(mint_prev, 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"1000"}"#),
      standard_out("addr_B"),
    ],
  };
  let result2 = processor.process_transaction(&tx2, 800_000, BLOCK_HASH, 1, 0, &mut overlay);
  assert!(result2.is_valid);

  let tx3 = TxView {
    txid: txid_from_byte(3),
    vin: vec![spending_input(mint_tx_id, 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"transfer","tick":"ORDI","amt":"400"}"#),
      standard_out("addr_C"),
    ],
  };
  let result3 = processor.process_transaction(&tx3, 800_000, BLOCK_HASH, 2, 0, &mut overlay);
  assert!(result3.is_valid);

  assert_eq!(
    overlay.get_balance(&store, "addr_B", "ordi").unwrap().to_string(),
    "600"
  );
  assert_eq!(
    overlay.get_balance(&store, "addr_C", "ordi").unwrap().to_string(),
    "400"
  );
  assert_eq!(
    overlay.get_total_minted(&store, "ordi").unwrap().to_string(),
    "1000"
  );
  assert!(overlay.operations().iter().all(|entry| entry.is_valid));
  assert_eq!(overlay.operations().len(), 3);
}

#[test]
fn s2_mint_exceeding_limit() {
  let store = MemoryStore::new();
  let resolver = FixtureResolver::new();
  let processor = Processor::new(&store, &resolver, Network::Bitcoin);
  let mut overlay = BlockOverlay::new();

  let deploy_tx = TxView {
    txid: txid_from_byte(10),
    vin: vec![spending_input(txid_from_byte(0xAA), 0)],
    vout: vec![op_return_out(
      r#"{"p":"brc-20","op":"deploy","tick":"ORDI","m":"21000000","l":"1000"}"#,
    )],
  };
  processor.process_transaction(&deploy_tx, 800_000, BLOCK_HASH, 0, 0, &mut overlay);

  let mint_tx_id = txid_from_byte(11);
  resolver.register(mint_tx_id, 0, "addr_B");
  let over_limit_tx = TxView {
    txid: mint_tx_id,
    vin: vec![spending_input(txid_from_byte(0xBB), 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"1001"}"#),
      standard_out("addr_B"),
    ],
  };
  let result = processor.process_transaction(&over_limit_tx, 800_000, BLOCK_HASH, 1, 0, &mut overlay);

  assert!(!result.is_valid);
  assert_eq!(result.error_code, Some("EXCEEDS_MINT_LIMIT"));
  assert_eq!(overlay.get_balance(&store, "addr_B", "ordi").unwrap(), brc20_indexer::brc20::Num::zero());
  assert_eq!(overlay.get_total_minted(&store, "ordi").unwrap(), brc20_indexer::brc20::Num::zero());
}

#[test]
fn s3_mint_exceeding_max_supply_uses_intra_block_total() {
  let store = MemoryStore::new();
  let resolver = FixtureResolver::new();
  let processor = Processor::new(&store, &resolver, Network::Bitcoin);
  let mut overlay = BlockOverlay::new();

  let deploy_tx = TxView {
    txid: txid_from_byte(20),
    vin: vec![spending_input(txid_from_byte(0xAA), 0)],
    vout: vec![op_return_out(r#"{"p":"brc-20","op":"deploy","tick":"XYZ","m":"100"}"#)],
  };
  processor.process_transaction(&deploy_tx, 800_000, BLOCK_HASH, 0, 0, &mut overlay);

  let mint1_id = txid_from_byte(21);
  resolver.register(mint1_id, 0, "addr_1");
  let mint1 = TxView {
    txid: mint1_id,
    vin: vec![spending_input(txid_from_byte(0xBB), 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"mint","tick":"xyz","amt":"60"}"#),
      standard_out("addr_1"),
    ],
  };
  let result1 = processor.process_transaction(&mint1, 800_000, BLOCK_HASH, 1, 0, &mut overlay);
  assert!(result1.is_valid);

  let mint2_id = txid_from_byte(22);
  resolver.register(mint2_id, 0, "addr_2");
  let mint2 = TxView {
    txid: mint2_id,
    vin: vec![spending_input(txid_from_byte(0xCC), 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"mint","tick":"xyz","amt":"50"}"#),
      standard_out("addr_2"),
    ],
  };
  let result2 = processor.process_transaction(&mint2, 800_000, BLOCK_HASH, 2, 0, &mut overlay);

  assert!(!result2.is_valid);
  assert_eq!(result2.error_code, Some("EXCEEDS_MAX_SUPPLY"));
  assert_eq!(
    overlay.get_total_minted(&store, "xyz").unwrap().to_string(),
    "60"
  );
}

#[test]
fn s4_case_insensitive_duplicate_deploy() {
  let store = MemoryStore::new();
  let resolver = FixtureResolver::new();
  let processor = Processor::new(&store, &resolver, Network::Bitcoin);
  let mut overlay = BlockOverlay::new();

  let deploy1 = TxView {
    txid: txid_from_byte(30),
    vin: vec![spending_input(txid_from_byte(0xAA), 0)],
    vout: vec![op_return_out(r#"{"p":"brc-20","op":"deploy","tick":"FOO","m":"100"}"#)],
  };
  let result1 = processor.process_transaction(&deploy1, 800_000, BLOCK_HASH, 0, 0, &mut overlay);
  assert!(result1.is_valid);

  let deploy2 = TxView {
    txid: txid_from_byte(31),
    vin: vec![spending_input(txid_from_byte(0xBB), 0)],
    vout: vec![op_return_out(r#"{"p":"brc-20","op":"deploy","tick":"foo","m":"50"}"#)],
  };
  let result2 = processor.process_transaction(&deploy2, 800_001, BLOCK_HASH, 0, 0, &mut overlay);

  assert!(!result2.is_valid);
  assert_eq!(result2.error_code, Some("TICKER_ALREADY_EXISTS"));
}

#[test]
fn s5_multi_transfer_atomic_failure() {
  let store = MemoryStore::new();
  let resolver = FixtureResolver::new();
  let processor = Processor::new(&store, &resolver, Network::Bitcoin);
  let mut overlay = BlockOverlay::new();

  let deploy_tx = TxView {
    txid: txid_from_byte(40),
    vin: vec![spending_input(txid_from_byte(0xAA), 0)],
    vout: vec![op_return_out(r#"{"p":"brc-20","op":"deploy","tick":"T","m":"100000"}"#)],
  };
  processor.process_transaction(&deploy_tx, 800_000, BLOCK_HASH, 0, 0, &mut overlay);

  overlay.set_balance("addr_sender", "t", brc20_indexer::brc20::Num::from_scaled(100 * 100_000_000));

  let sender_prev = txid_from_byte(0xDD);
  resolver.register(sender_prev, 0, "addr_sender");

  let multi_tx = TxView {
    txid: txid_from_byte(41),
    vin: vec![spending_input(sender_prev, 0)],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"transfer","tick":"T","amt":"40"}"#),
      standard_out("addr_r1"),
      op_return_out(r#"{"p":"brc-20","op":"transfer","tick":"t","amt":"40"}"#),
      standard_out("addr_r2"),
      op_return_out(r#"{"p":"brc-20","op":"transfer","tick":"t","amt":"40"}"#),
      standard_out("addr_r3"),
    ],
  };
  let result = processor.process_transaction(&multi_tx, 800_002, BLOCK_HASH, 0, 0, &mut overlay);

  assert!(!result.is_valid);
  let entries: Vec<_> = overlay
    .operations()
    .iter()
    .filter(|e| e.txid == multi_tx.txid)
    .collect();
  assert_eq!(entries.len(), 3);
  assert!(entries.iter().all(|e| !e.is_valid));
  assert!(entries
    .iter()
    .all(|e| e.error_code == Some("MULTI_TRANSFER_INSUFFICIENT_TOTAL_BALANCE")));
  assert_eq!(
    overlay.get_balance(&store, "addr_sender", "t").unwrap().to_string(),
    "100"
  );
}

#[test]
fn s6_marketplace_transfer_recognition() {
  let store = MemoryStore::new();
  let resolver = FixtureResolver::new();
  let processor = Processor::new(&store, &resolver, Network::Bitcoin);
  let mut overlay = BlockOverlay::new();

  let deploy_tx = TxView {
    txid: txid_from_byte(50),
    vin: vec![spending_input(txid_from_byte(0xAA), 0)],
    vout: vec![op_return_out(r#"{"p":"brc-20","op":"deploy","tick":"MKT","m":"1000"}"#)],
  };
  processor.process_transaction(&deploy_tx, 800_000, BLOCK_HASH, 0, 0, &mut overlay);
  overlay.set_balance("addr_S", "mkt", brc20_indexer::brc20::Num::from_scaled(500 * 100_000_000));

  let input0_prev = txid_from_byte(0x10);
  let input1_prev = txid_from_byte(0x11);
  let input2_prev = txid_from_byte(0x12);
  resolver.register(input0_prev, 0, "addr_S");
  resolver.register(input1_prev, 0, "addr_S");
  resolver.register(input2_prev, 0, "addr_buyer");

  const SIGHASH_SINGLE_ANYONECANPAY: u8 = 0x83;
  const SIGHASH_ALL: u8 = 0x01;

  let tx = TxView {
    txid: txid_from_byte(51),
    vin: vec![
      signed_input(input0_prev, 0, SIGHASH_SINGLE_ANYONECANPAY),
      signed_input(input1_prev, 0, SIGHASH_SINGLE_ANYONECANPAY),
      signed_input(input2_prev, 0, SIGHASH_ALL),
    ],
    vout: vec![
      op_return_out(r#"{"p":"brc-20","op":"transfer","tick":"mkt","amt":"100"}"#),
      standard_out("addr_buyer"),
    ],
  };

  // addr_S is also the spender of input[0], so the sender address resolves via inputs[0].
  let result = processor.process_transaction(&tx, 950_000, BLOCK_HASH, 0, 0, &mut overlay);

  assert!(result.is_valid);
  let entry = overlay
    .operations()
    .iter()
    .find(|e| e.txid == tx.txid)
    .unwrap();
  assert!(entry.is_marketplace);
  assert_eq!(
    overlay.get_balance(&store, "addr_S", "mkt").unwrap().to_string(),
    "400"
  );
  assert_eq!(
    overlay.get_balance(&store, "addr_buyer", "mkt").unwrap().to_string(),
    "100"
  );
}
