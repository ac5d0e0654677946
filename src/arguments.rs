use super::*;

#[derive(Debug, Parser)]
#[clap(version, about = "BRC-20 consensus engine and indexer")]
pub struct Arguments {
  #[clap(flatten)]
  pub options: Options,
  #[clap(subcommand)]
  pub subcommand: Subcommand,
}

impl Arguments {
  pub fn run(self) -> Result {
    self.subcommand.run(self.options)
  }
}
