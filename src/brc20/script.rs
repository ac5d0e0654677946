use super::*;

/// The sighash-type byte trailing an ECDSA signature, decoded down to the one bit the
/// marketplace-transfer template cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashFlags(u8);

const ANYONECANPAY_FLAG: u8 = 0x80;
const SIGHASH_SINGLE: u8 = 0x03;

impl SighashFlags {
  pub fn from_byte(byte: u8) -> Self {
    Self(byte)
  }

  /// `SIGHASH_SINGLE | SIGHASH_ANYONECANPAY`: the flag combination every known marketplace
  /// transfer template signs with, since it commits to exactly one input and one output.
  pub fn is_single_anyonecanpay(self) -> bool {
    self.0 & !ANYONECANPAY_FLAG == SIGHASH_SINGLE && self.0 & ANYONECANPAY_FLAG != 0
  }
}

/// Extracts the trailing sighash-type byte from a raw ECDSA signature (DER signature with one
/// byte appended). Schnorr/Taproot signatures append the sighash byte only when it is not
/// `SIGHASH_DEFAULT`; a 64-byte signature is treated as `SIGHASH_DEFAULT` (never marketplace).
pub fn sighash_flags_of(signature: &[u8]) -> Option<SighashFlags> {
  if signature.len() == 64 {
    return None;
  }
  signature.last().copied().map(SighashFlags::from_byte)
}

pub fn signature_bytes(input: &TxInView) -> Option<&[u8]> {
  match &input.signature {
    Some(SignatureSource::ScriptSig(bytes)) | Some(SignatureSource::Witness(bytes)) => {
      Some(bytes.as_slice())
    }
    None => None,
  }
}

/// Attempts to resolve the address controlling an output, trying the conventional JSON-RPC
/// fields first and falling back to deriving the address from the raw script.
pub fn extract_address(script_pubkey: &ScriptPubKey, network: Network) -> Option<String> {
  if let Some(addr) = script_pubkey.addresses.first() {
    return Some(addr.clone());
  }
  if let Some(addr) = &script_pubkey.address {
    return Some(addr.clone());
  }
  let raw = hex::decode(&script_pubkey.hex).ok()?;
  let script = ScriptBuf::from_bytes(raw);
  Address::from_script(&script, network)
    .ok()
    .map(|a| a.to_string())
}

/// Returns the bytes of the first push-data instruction in a script, used to pull a legacy
/// ECDSA signature out of a `scriptSig` (whose first push is conventionally the signature).
pub fn first_push(script: &Script) -> Option<Vec<u8>> {
  script.instructions().find_map(|instruction| match instruction {
    Ok(Instruction::PushBytes(bytes)) => Some(bytes.as_bytes().to_vec()),
    _ => None,
  })
}

/// Concatenates the pushed payload bytes of an OP_RETURN script, handling inscribers that split
/// the JSON across more than one push.
pub fn op_return_payload(script_pubkey: &ScriptPubKey) -> Option<Vec<u8>> {
  let raw = hex::decode(&script_pubkey.hex).ok()?;
  let script = Script::from_bytes(&raw);
  let mut payload = Vec::new();
  for instruction in script.instructions() {
    if let Ok(Instruction::PushBytes(bytes)) = instruction {
      payload.extend_from_slice(bytes.as_bytes());
    }
  }
  if payload.is_empty() {
    None
  } else {
    Some(payload)
  }
}
