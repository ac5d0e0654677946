use super::*;

use log4rs::{
  append::{console::ConsoleAppender, rolling_file::RollingFileAppender},
  append::rolling_file::policy::compound::{
    roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
  },
  config::{Appender, Config as LogConfig, Root},
  encode::pattern::PatternEncoder,
};

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} [{M}] {m}{n}";
const MAX_LOG_FILE_BYTES: u64 = 64 * 1024 * 1024;
const MAX_LOG_FILES: u32 = 10;

/// Initializes the global logger: always a console appender, plus a gzip-rolled file appender
/// when a log directory is supplied.
pub fn init(level: log::LevelFilter, log_dir: Option<PathBuf>) -> anyhow::Result<()> {
  let console = ConsoleAppender::builder()
    .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
    .build();

  let mut builder =
    LogConfig::builder().appender(Appender::builder().build("console", Box::new(console)));
  let mut root = Root::builder().appender("console");

  if let Some(dir) = log_dir {
    let roller = FixedWindowRoller::builder()
      .build(
        dir.join("indexer.{}.log.gz").to_str().unwrap_or("indexer.{}.log.gz"),
        MAX_LOG_FILES,
      )
      .map_err(|err| anyhow!("failed to build log roller: {err}"))?;
    let trigger = SizeTrigger::new(MAX_LOG_FILE_BYTES);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let file = RollingFileAppender::builder()
      .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
      .build(dir.join("indexer.log"), Box::new(policy))
      .with_context(|| format!("failed to open log file in `{}`", dir.display()))?;

    builder = builder.appender(Appender::builder().build("file", Box::new(file)));
    root = root.appender("file");
  }

  let config = builder
    .build(root.build(level))
    .map_err(|err| anyhow!("failed to build logger config: {err}"))?;

  log4rs::init_config(config).map_err(|err| anyhow!("failed to initialize logger: {err}"))?;
  Ok(())
}
