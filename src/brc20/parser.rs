use super::*;

const PROTOCOL_LITERAL: &str = "brc-20";

/// A single decoded BRC-20 operation, prior to validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOperation {
  Deploy {
    tick: String,
    max_supply: Num,
    limit_per_op: Option<Num>,
  },
  Mint {
    tick: String,
    amt: Num,
  },
  Transfer {
    tick: String,
    amt: Num,
  },
}

impl ParsedOperation {
  pub fn kind(&self) -> OperationKind {
    match self {
      Self::Deploy { .. } => OperationKind::Deploy,
      Self::Mint { .. } => OperationKind::Mint,
      Self::Transfer { .. } => OperationKind::Transfer,
    }
  }

  pub fn tick(&self) -> &str {
    match self {
      Self::Deploy { tick, .. } | Self::Mint { tick, .. } | Self::Transfer { tick, .. } => tick,
    }
  }
}

#[derive(Deserialize)]
struct Envelope {
  p: String,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum RawOperation {
  Deploy {
    tick: String,
    #[serde(rename = "m")]
    max_supply: Num,
    #[serde(rename = "l")]
    limit_per_op: Option<Num>,
  },
  Mint {
    tick: String,
    amt: Num,
  },
  Transfer {
    tick: String,
    amt: Num,
  },
}

/// Extracts the raw UTF-8 text of the OP_RETURN payload at `vout_index`, if any, independent of
/// whether it goes on to parse as valid BRC-20 JSON. Used so invalid-operation log entries still
/// carry the `raw_op_return` fact even when decoding failed partway through.
pub fn raw_text(tx: &TxView, vout_index: u32) -> String {
  tx.vout
    .get(vout_index as usize)
    .and_then(|out| script::op_return_payload(&out.script_pubkey))
    .and_then(|bytes| String::from_utf8(bytes).ok())
    .unwrap_or_default()
}

/// Re-serializes a raw OP_RETURN payload into a canonical JSON string for the `parsed_json` log
/// fact, or `None` if the raw text is not valid JSON (should only happen for entries that were
/// never logged in the first place, since `INVALID_JSON` payloads are silently dropped).
pub fn canonical_json(raw: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(raw).ok()?;
  Some(value.to_string())
}

/// Ascending-`vout`-order indices of every OP_RETURN output in a transaction.
pub fn locate_op_returns(tx: &TxView) -> Vec<u32> {
  tx.vout
    .iter()
    .enumerate()
    .filter(|(_, out)| out.script_pubkey.is_op_return())
    .map(|(index, _)| index as u32)
    .collect()
}

/// Decodes the OP_RETURN payload at `vout_index` as a BRC-20 operation.
///
/// `INVALID_JSON` is returned for payloads that are not UTF-8, not JSON, or whose `"p"` field
/// is not exactly `"brc-20"` (the field-name match is intentionally case-sensitive, matching
/// every known deployed indexer). Any other structural problem (unknown `op`, missing
/// `tick`/`amt`/`m`, or a malformed amount) is reported as the more specific error.
pub fn decode_operation(
  tx: &TxView,
  vout_index: u32,
) -> Result<(ParsedOperation, String), BRC20Error> {
  let out = tx
    .vout
    .get(vout_index as usize)
    .ok_or(BRC20Error::InvalidJson)?;
  let payload_bytes =
    script::op_return_payload(&out.script_pubkey).ok_or(BRC20Error::InvalidJson)?;
  let raw = String::from_utf8(payload_bytes).map_err(|_| BRC20Error::InvalidJson)?;

  let value: serde_json::Value = serde_json::from_str(&raw).map_err(|_| BRC20Error::InvalidJson)?;

  let envelope: Envelope =
    serde_json::from_value(value.clone()).map_err(|_| BRC20Error::InvalidJson)?;
  if envelope.p != PROTOCOL_LITERAL {
    return Err(BRC20Error::InvalidJson);
  }

  let raw_op: RawOperation = match serde_json::from_value(value) {
    Ok(op) => op,
    Err(err) => {
      // A recognizable envelope with a bad `op`/missing required field is a protocol-level
      // mistake, not silent noise: distinguish "no op tag at all" from "malformed fields".
      return Err(classify_deserialize_error(&err));
    }
  };

  let parsed = match raw_op {
    RawOperation::Deploy {
      tick,
      max_supply,
      limit_per_op,
    } => {
      if tick.is_empty() {
        return Err(BRC20Error::MissingField);
      }
      ParsedOperation::Deploy {
        tick,
        max_supply,
        limit_per_op,
      }
    }
    RawOperation::Mint { tick, amt } => {
      if tick.is_empty() {
        return Err(BRC20Error::MissingField);
      }
      ParsedOperation::Mint { tick, amt }
    }
    RawOperation::Transfer { tick, amt } => {
      if tick.is_empty() {
        return Err(BRC20Error::MissingField);
      }
      ParsedOperation::Transfer { tick, amt }
    }
  };

  Ok((parsed, raw))
}

fn classify_deserialize_error(err: &serde_json::Error) -> BRC20Error {
  let message = err.to_string();
  if message.contains("unknown variant") {
    BRC20Error::InvalidOperation
  } else if message.contains("missing field") {
    BRC20Error::MissingField
  } else {
    BRC20Error::InvalidAmount
  }
}

/// A structurally-valid multi-transfer: two or more `transfer` OP_RETURNs sharing one ticker,
/// each paired with the output immediately following its own OP_RETURN.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTransferStep {
  pub op_return_vout: u32,
  pub destination_vout: u32,
  pub amt: Num,
  pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiTransferPlan {
  pub tick: String,
  pub steps: Vec<MultiTransferStep>,
}

/// Attempts to recognize `tx` as a multi-transfer: every OP_RETURN must parse as `transfer` on
/// a single shared ticker. Returns `None` when fewer than two OP_RETURNs are present, or a
/// single-operation parse should be attempted instead.
///
/// When `Some(Err(_))` is returned, the transaction *is* shaped like a multi-transfer attempt
/// but fails a structural rule, and every step must be logged with that error.
pub fn try_multi_transfer(tx: &TxView) -> Option<Result<MultiTransferPlan, BRC20Error>> {
  let op_returns = locate_op_returns(tx);
  if op_returns.len() < 2 {
    return None;
  }

  let mut steps = Vec::with_capacity(op_returns.len());
  let mut shared_tick: Option<String> = None;

  for vout_index in op_returns {
    let (parsed, raw) = match decode_operation(tx, vout_index) {
      Ok((op, raw)) => (op, raw),
      Err(BRC20Error::InvalidJson) => continue,
      Err(err) => return Some(Err(err)),
    };

    let (tick, amt) = match parsed {
      ParsedOperation::Transfer { tick, amt } => (tick, amt),
      _ => return Some(Err(BRC20Error::InvalidOperation)),
    };

    match &shared_tick {
      Some(existing) if existing.to_uppercase() != tick.to_uppercase() => {
        return Some(Err(BRC20Error::InvalidOperation));
      }
      None => shared_tick = Some(tick.clone()),
      _ => {}
    }

    let destination_vout = vout_index + 1;
    if tx
      .vout
      .get(destination_vout as usize)
      .map(|out| out.script_pubkey.is_op_return())
      .unwrap_or(true)
    {
      return Some(Err(BRC20Error::NoStandardOutput));
    }

    steps.push(MultiTransferStep {
      op_return_vout: vout_index,
      destination_vout,
      amt,
      raw,
    });
  }

  if steps.len() < 2 {
    // Every but one OP_RETURN turned out to be non-BRC-20 noise; fall back to single-op parsing.
    return None;
  }

  Some(Ok(MultiTransferPlan {
    tick: shared_tick.expect("at least one transfer step parsed"),
    steps,
  }))
}
