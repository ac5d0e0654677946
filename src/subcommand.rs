use super::*;

mod index;

/// Top-level CLI actions. `Index` drives the block-by-block consensus loop to chain tip (or to
/// `--until`); `Replay` re-derives state from height 0 against a scratch store, the mechanism
/// behind the bit-identical-replay property.
#[derive(Debug, Parser)]
pub enum Subcommand {
  #[clap(about = "Index blocks into the BRC-20 store")]
  Index(index::Index),
  #[clap(about = "Re-derive state from genesis and compare against the live store")]
  Replay(index::Replay),
}

impl Subcommand {
  pub fn run(self, options: Options) -> Result {
    match self {
      Self::Index(index) => index.run(options),
      Self::Replay(replay) => replay.run(options),
    }
  }
}
