use {
  crate::block_source::{ScriptPubKey, SignatureSource, TxInView, TxOutView, TxView},
  crate::store::Store,
  crate::utxo::UTXOResolver,
  bitcoin::{
    blockdata::script::Instruction, hash_types::BlockHash, hashes::Hash, Address, Network, Script,
    ScriptBuf, Txid,
  },
  serde::{Deserialize, Deserializer, Serialize, Serializer},
  std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::Mutex,
  },
};

mod amount;
mod error;
pub mod overlay;
pub mod parser;
pub mod processor;
pub(crate) mod script;
mod tick;
mod types;
pub mod validator;

pub use amount::{Num, SCALE};
pub use error::BRC20Error;
pub use overlay::BlockOverlay;
pub use parser::ParsedOperation;
pub use processor::{Processor, TransferClassification, MARKETPLACE_TEMPLATE_HEIGHT};
pub use tick::Tick;
pub use types::{Deploy, OperationKind, OperationLogEntry, ProcessingResult, TransferKind};
pub use validator::{Recipient, Validator};
