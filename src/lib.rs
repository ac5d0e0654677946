#![allow(clippy::too_many_arguments, clippy::type_complexity)]
#![deny(
  clippy::cast_lossless,
  clippy::cast_possible_truncation,
  clippy::cast_possible_wrap,
  clippy::cast_sign_loss
)]

use {
  self::{
    arguments::Arguments,
    block_source::{BlockSource, BlockView, ScriptPubKey, SignatureSource, TxInView, TxOutView, TxView},
    brc20::{BRC20Error, Deploy, Num, OperationKind, OperationLogEntry},
    config::Config,
    options::Options,
    store::{BlockCommit, Store},
    subcommand::Subcommand,
    utxo::UTXOResolver,
  },
  anyhow::{anyhow, Context, Error},
  bitcoin::{hash_types::BlockHash, Address, Network, Transaction, TxIn, TxOut, Txid},
  clap::Parser,
  serde::{Deserialize, Serialize},
  std::{
    collections::HashMap,
    env,
    fmt,
    fs,
    path::{Path, PathBuf},
    process,
    str::FromStr,
    sync::{
      atomic::{self, AtomicBool},
      Mutex,
    },
  },
};

pub mod arguments;
pub mod block_source;
pub mod brc20;
mod config;
mod logger;
mod options;
pub mod redb_store;
pub mod rpc;
pub mod store;
mod subcommand;
pub mod utxo;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

pub fn main() {
  let args = Arguments::parse();

  let log_dir = match args.options.log_dir() {
    Ok(dir) => dir,
    Err(err) => panic!("failed to resolve log directory: {err}"),
  };
  if let Err(err) = logger::init(args.options.log_level(), log_dir) {
    panic!("failed to initialize logger: {err}");
  }

  ctrlc::set_handler(move || {
    if SHUTTING_DOWN.fetch_or(true, atomic::Ordering::Relaxed) {
      process::exit(1);
    }
    eprintln!("Shutting down gracefully. Press <CTRL-C> again to exit immediately.");
  })
  .expect("error setting <CTRL-C> handler");

  if let Err(err) = args.run() {
    eprintln!("error: {err}");
    err
      .chain()
      .skip(1)
      .for_each(|cause| eprintln!("because: {cause}"));
    if env::var_os("RUST_BACKTRACE")
      .map(|val| val == "1")
      .unwrap_or_default()
    {
      eprintln!("{}", err.backtrace());
    }
    process::exit(1);
  }
}
