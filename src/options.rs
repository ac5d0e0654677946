use super::*;

/// Flags shared by every subcommand, mirroring the teacher's split between a flattened
/// `Options` struct and a `#[clap(subcommand)]` enum.
#[derive(Debug, Parser, Clone)]
pub struct Options {
  #[clap(long, help = "Load configuration from <CONFIG>")]
  pub config: Option<PathBuf>,
  #[clap(long, help = "Store index and logs in <DATA_DIR>")]
  pub data_dir: Option<PathBuf>,
  #[clap(long, default_value = "info", help = "Log at <LOG_LEVEL>")]
  pub log_level: String,
  #[clap(long, help = "Write logs to <LOG_DIR> instead of stderr only")]
  pub log_dir: Option<PathBuf>,
  #[clap(long, default_value = "bitcoin", help = "Index <NETWORK>")]
  pub network: String,
}

impl Options {
  pub fn config(&self) -> anyhow::Result<Config> {
    match &self.config {
      Some(path) => Config::load(path),
      None => Ok(Config::default()),
    }
  }

  pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
    let base = match &self.data_dir {
      Some(path) => path.clone(),
      None => dirs::data_dir()
        .ok_or_else(|| anyhow!("could not find data directory"))?
        .join("brc20-indexer"),
    };
    fs::create_dir_all(&base)
      .with_context(|| format!("failed to create data dir `{}`", base.display()))?;
    Ok(base)
  }

  pub fn log_dir(&self) -> anyhow::Result<Option<PathBuf>> {
    match &self.log_dir {
      Some(path) => {
        fs::create_dir_all(path)
          .with_context(|| format!("failed to create log dir `{}`", path.display()))?;
        Ok(Some(path.clone()))
      }
      None => Ok(None),
    }
  }

  pub fn log_level(&self) -> log::LevelFilter {
    self.log_level.parse().unwrap_or(log::LevelFilter::Info)
  }

  pub fn network(&self) -> Network {
    match self.network.as_str() {
      "testnet" => Network::Testnet,
      "signet" => Network::Signet,
      "regtest" => Network::Regtest,
      _ => Network::Bitcoin,
    }
  }
}
