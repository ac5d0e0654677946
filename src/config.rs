use super::*;

/// On-disk configuration, loaded via `serde_yaml` and overridden by CLI flags the way the
/// teacher's `Options`/`Config` split works: CLI flags win when both are present.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
  pub data_dir: Option<PathBuf>,
  pub bitcoin_rpc_url: Option<String>,
  pub bitcoin_rpc_user: Option<String>,
  pub bitcoin_rpc_pass: Option<String>,
  pub start_height: Option<u64>,
  pub network: Option<String>,
}

impl Config {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("failed to read config file `{}`", path.display()))?;
    serde_yaml::from_str(&content)
      .with_context(|| format!("failed to parse config file `{}`", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_minimal_yaml() {
    let config: Config = serde_yaml::from_str("start-height: 800000\n").unwrap();
    assert_eq!(config.start_height, Some(800000));
    assert_eq!(config.data_dir, None);
  }
}
