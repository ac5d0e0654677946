use super::*;

/// Stateless-given-context rule checks. Every `validate_*` function reads only what it is
/// handed (deploy record, current balance, current minted total) and returns a `BRC20Error`
/// rather than raising, so the processor can always produce a log entry.
pub struct Validator;

impl Validator {
  pub fn validate_deploy(
    overlay: &BlockOverlay,
    store: &dyn Store,
    ticker_normalized: &str,
    max_supply: Num,
    limit_per_op: Option<Num>,
  ) -> Result<(), BRC20Error> {
    if overlay
      .get_deploy(store, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?
      .is_some()
    {
      return Err(BRC20Error::TickerAlreadyExists);
    }
    if max_supply.is_zero() {
      return Err(BRC20Error::InvalidAmount);
    }
    if let Some(limit) = &limit_per_op {
      if limit.is_zero() {
        return Err(BRC20Error::InvalidAmount);
      }
    }
    Ok(())
  }

  /// Limit-per-mint check only; overflow against max supply is a separate check
  /// ([`validate_mint_overflow`]) because it must be re-evaluated with the *current* overlay
  /// total, which can change between when a mint is parsed and when it is finally applied.
  pub fn validate_mint(
    overlay: &BlockOverlay,
    store: &dyn Store,
    deploy: &Deploy,
    amt: Num,
  ) -> Result<(), BRC20Error> {
    let _ = (overlay, store);
    if amt.is_zero() {
      return Err(BRC20Error::InvalidAmount);
    }
    if let Some(limit) = &deploy.limit_per_op {
      if amt > *limit {
        return Err(BRC20Error::ExceedsMintLimit);
      }
    }
    Ok(())
  }

  pub fn validate_mint_overflow(
    overlay: &BlockOverlay,
    store: &dyn Store,
    deploy: &Deploy,
    amt: Num,
  ) -> Result<(), BRC20Error> {
    let current_minted = overlay
      .get_total_minted(store, &deploy.ticker)
      .map_err(|_| BRC20Error::UnhandledException)?;
    let projected = current_minted
      .checked_add(amt)
      .map_err(|_| BRC20Error::ExceedsMaxSupply)?;
    if projected > deploy.max_supply {
      return Err(BRC20Error::ExceedsMaxSupply);
    }
    Ok(())
  }

  /// Transfers have no per-operation limit check, unlike mints.
  pub fn validate_transfer(
    deploy_exists: bool,
    sender_balance: Num,
    amt: Num,
  ) -> Result<(), BRC20Error> {
    if !deploy_exists {
      return Err(BRC20Error::TickerNotDeployed);
    }
    if amt.is_zero() {
      return Err(BRC20Error::InvalidAmount);
    }
    if sender_balance < amt {
      return Err(BRC20Error::InsufficientBalance);
    }
    Ok(())
  }

  /// Deploys may be OP_RETURN-only; mint and transfer require a resolvable recipient output. A
  /// transaction missing a standard output entirely is `NoStandardOutput`, while one whose output
  /// exists but whose script does not resolve to a known address type is `InvalidAddress` — the
  /// two are distinguished because they come from different failure modes downstream.
  pub fn validate_output_addresses(
    operation: OperationKind,
    recipient: &Recipient,
  ) -> Result<(), BRC20Error> {
    match operation {
      OperationKind::Deploy => Ok(()),
      OperationKind::Mint | OperationKind::Transfer => match recipient {
        Recipient::Address(_) => Ok(()),
        Recipient::Missing => Err(BRC20Error::NoStandardOutput),
        Recipient::Unaddressable => Err(BRC20Error::InvalidAddress),
      },
      OperationKind::Invalid => Err(BRC20Error::InvalidOperation),
    }
  }

  /// Finds the recipient address for a mint/transfer: the output immediately after the first
  /// OP_RETURN. [`Recipient::Missing`] means that slot does not exist or is itself an OP_RETURN;
  /// [`Recipient::Unaddressable`] means the slot exists but its script has no resolvable address.
  pub fn resolve_recipient(tx: &TxView, network: Network) -> Recipient {
    let Some(&op_return_vout) = parser::locate_op_returns(tx).first() else {
      return Recipient::Missing;
    };
    let Some(next) = tx.vout.get(op_return_vout as usize + 1) else {
      return Recipient::Missing;
    };
    if next.script_pubkey.is_op_return() {
      return Recipient::Missing;
    }
    match script::extract_address(&next.script_pubkey, network) {
      Some(address) => Recipient::Address(address),
      None => Recipient::Unaddressable,
    }
  }
}

/// The resolved recipient output for a mint/transfer, distinguishing "no candidate output at all"
/// from "output exists but isn't addressable" so each maps to the correct [`BRC20Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
  Missing,
  Unaddressable,
  Address(String),
}

impl Recipient {
  pub fn as_deref(&self) -> Option<&str> {
    match self {
      Recipient::Address(address) => Some(address.as_str()),
      Recipient::Missing | Recipient::Unaddressable => None,
    }
  }

  pub fn into_address(self) -> Option<String> {
    match self {
      Recipient::Address(address) => Some(address),
      Recipient::Missing | Recipient::Unaddressable => None,
    }
  }
}
