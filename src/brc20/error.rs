use super::*;

/// Stable, wire-format error codes attached to every invalid operation log entry.
///
/// These strings are persisted by the [`Store`](crate::store::Store) and are part of the
/// public contract of the indexer: renaming a variant's `as_code()` output is a breaking change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BRC20Error {
  #[error("invalid json")]
  InvalidJson,
  #[error("missing field")]
  MissingField,
  #[error("invalid operation")]
  InvalidOperation,
  #[error("invalid amount")]
  InvalidAmount,
  #[error("tick already exists")]
  TickerAlreadyExists,
  #[error("tick not deployed")]
  TickerNotDeployed,
  #[error("exceeds mint limit")]
  ExceedsMintLimit,
  #[error("exceeds max supply")]
  ExceedsMaxSupply,
  #[error("insufficient balance")]
  InsufficientBalance,
  #[error("no standard output")]
  NoStandardOutput,
  #[error("invalid address")]
  InvalidAddress,
  #[error("invalid sighash type")]
  InvalidSighashType,
  #[error("invalid marketplace transaction")]
  InvalidMarketplaceTransaction,
  #[error("multi transfer insufficient total balance")]
  MultiTransferInsufficientTotalBalance,
  #[error("unhandled exception")]
  UnhandledException,
}

impl BRC20Error {
  /// The stable string identifier persisted alongside an invalid operation log entry.
  pub fn as_code(self) -> &'static str {
    match self {
      Self::InvalidJson => "INVALID_JSON",
      Self::MissingField => "MISSING_FIELD",
      Self::InvalidOperation => "INVALID_OPERATION",
      Self::InvalidAmount => "INVALID_AMOUNT",
      Self::TickerAlreadyExists => "TICKER_ALREADY_EXISTS",
      Self::TickerNotDeployed => "TICKER_NOT_DEPLOYED",
      Self::ExceedsMintLimit => "EXCEEDS_MINT_LIMIT",
      Self::ExceedsMaxSupply => "EXCEEDS_MAX_SUPPLY",
      Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
      Self::NoStandardOutput => "NO_STANDARD_OUTPUT",
      Self::InvalidAddress => "INVALID_ADDRESS",
      Self::InvalidSighashType => "INVALID_SIGHASH_TYPE",
      Self::InvalidMarketplaceTransaction => "INVALID_MARKETPLACE_TRANSACTION",
      Self::MultiTransferInsufficientTotalBalance => "MULTI_TRANSFER_INSUFFICIENT_TOTAL_BALANCE",
      Self::UnhandledException => "UNHANDLED_EXCEPTION",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_are_stable() {
    assert_eq!(BRC20Error::InvalidJson.as_code(), "INVALID_JSON");
    assert_eq!(
      BRC20Error::MultiTransferInsufficientTotalBalance.as_code(),
      "MULTI_TRANSFER_INSUFFICIENT_TOTAL_BALANCE"
    );
  }
}
