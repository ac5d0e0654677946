use super::*;

/// The height at which the marketplace-transfer template changed. Transactions below this
/// height are checked against the early template (three distinct input addresses, any one
/// input signed `SIGHASH_SINGLE|ANYONECANPAY`); at or above it, the new template additionally
/// requires the first two inputs to share an address and both sign `SIGHASH_SINGLE|ANYONECANPAY`.
pub const MARKETPLACE_TEMPLATE_HEIGHT: u64 = 901_350;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferClassification {
  Simple,
  Marketplace,
  InvalidMarketplace(BRC20Error),
}

fn any_single_anyonecanpay(tx: &TxView) -> bool {
  tx.vin.iter().any(|input| {
    script::signature_bytes(input)
      .and_then(script::sighash_flags_of)
      .map(|f| f.is_single_anyonecanpay())
      .unwrap_or(false)
  })
}

fn input_is_single_anyonecanpay(input: &TxInView) -> bool {
  script::signature_bytes(input)
    .and_then(script::sighash_flags_of)
    .map(|f| f.is_single_anyonecanpay())
    .unwrap_or(false)
}

fn distinct_address_count(addresses: &[Option<String>]) -> usize {
  addresses
    .iter()
    .flatten()
    .collect::<std::collections::HashSet<_>>()
    .len()
}

/// Checks the pre-height-`MARKETPLACE_TEMPLATE_HEIGHT` marketplace template. Checks run in the
/// same order as the original implementation so the first one to fail determines the error:
/// input count, then the sighash flag itself (`InvalidSighashType`), then distinct addresses.
fn validate_early_marketplace_template(
  tx: &TxView,
  input_addresses: &[Option<String>],
) -> Result<(), BRC20Error> {
  if tx.vin.len() < 3 {
    return Err(BRC20Error::InvalidMarketplaceTransaction);
  }
  if !any_single_anyonecanpay(tx) {
    return Err(BRC20Error::InvalidSighashType);
  }
  if distinct_address_count(input_addresses) < 3 {
    return Err(BRC20Error::InvalidMarketplaceTransaction);
  }
  Ok(())
}

/// Checks the post-height template: first two inputs share an address and both sign
/// `SIGHASH_SINGLE|ANYONECANPAY`, then three distinct addresses overall. As in
/// [`validate_early_marketplace_template`], the sighash check reports `InvalidSighashType`
/// specifically so callers can tell "wrong template shape" from "right shape, wrong signature".
fn validate_new_marketplace_template(
  tx: &TxView,
  input_addresses: &[Option<String>],
) -> Result<(), BRC20Error> {
  if tx.vin.len() < 3 || input_addresses.len() < 2 {
    return Err(BRC20Error::InvalidMarketplaceTransaction);
  }
  let same_first_two_address = matches!(
    (&input_addresses[0], &input_addresses[1]),
    (Some(a), Some(b)) if a == b
  );
  if !same_first_two_address {
    return Err(BRC20Error::InvalidMarketplaceTransaction);
  }
  let first_two_single_anyonecanpay =
    input_is_single_anyonecanpay(&tx.vin[0]) && input_is_single_anyonecanpay(&tx.vin[1]);
  if !first_two_single_anyonecanpay {
    return Err(BRC20Error::InvalidSighashType);
  }
  if distinct_address_count(input_addresses) < 3 {
    return Err(BRC20Error::InvalidMarketplaceTransaction);
  }
  Ok(())
}

/// Ties the parser, validator, and overlay together for one transaction.
pub struct Processor<'a> {
  pub store: &'a dyn Store,
  pub resolver: &'a dyn UTXOResolver,
  pub network: Network,
}

struct Context {
  height: u64,
  hash: BlockHash,
  tx_index: u32,
  timestamp: u32,
}

impl<'a> Processor<'a> {
  pub fn new(store: &'a dyn Store, resolver: &'a dyn UTXOResolver, network: Network) -> Self {
    Self {
      store,
      resolver,
      network,
    }
  }

  pub fn process_transaction(
    &self,
    tx: &TxView,
    height: u64,
    block_hash: BlockHash,
    tx_index: u32,
    timestamp: u32,
    overlay: &mut BlockOverlay,
  ) -> ProcessingResult {
    let ctx = Context {
      height,
      hash: block_hash,
      tx_index,
      timestamp,
    };

    if let Some(plan) = parser::try_multi_transfer(tx) {
      return self.process_multi_transfer(tx, plan, &ctx, overlay);
    }

    let Some(&vout_index) = parser::locate_op_returns(tx).first() else {
      return ProcessingResult::not_found(tx.txid);
    };

    match parser::decode_operation(tx, vout_index) {
      Ok((op, raw)) => self.process_single(tx, vout_index, op, raw, &ctx, overlay),
      Err(BRC20Error::InvalidJson) => ProcessingResult::not_found(tx.txid),
      Err(err) => {
        let raw = parser::raw_text(tx, vout_index);
        let entry = self.invalid_entry(tx, vout_index, &ctx, err, raw);
        overlay.push_operation(entry);
        ProcessingResult {
          operation_found: true,
          is_valid: false,
          error_code: Some(err.as_code()),
          error_message: Some(err.to_string()),
          operation_type: Some(OperationKind::Invalid),
          ticker: None,
          amount: None,
          txid: tx.txid,
        }
      }
    }
  }

  fn sender_address(&self, tx: &TxView) -> Option<String> {
    let first = tx.vin.first()?;
    if first.is_coinbase {
      return None;
    }
    let prev_txid = first.prev_txid?;
    let prev_vout = first.prev_vout?;
    self.resolver.get_input_address(prev_txid, prev_vout).ok().flatten()
  }

  fn input_address(&self, input: &TxInView) -> Option<String> {
    if input.is_coinbase {
      return None;
    }
    let prev_txid = input.prev_txid?;
    let prev_vout = input.prev_vout?;
    self.resolver.get_input_address(prev_txid, prev_vout).ok().flatten()
  }

  /// Classifies a transfer transaction as a plain wallet-to-wallet transfer, a recognized
  /// marketplace transfer, or a transaction that *attempted* the marketplace signature pattern
  /// but does not satisfy the full template.
  ///
  /// Order matters: the sighash-flag check runs before any address/input-count check, so a
  /// transaction lacking the `SIGHASH_SINGLE|ANYONECANPAY` flag entirely is `Simple`, while one
  /// that has the flag but fails the template reports `InvalidMarketplaceTransaction` — the
  /// sighash check is what determined this was a marketplace *attempt* in the first place.
  pub fn classify_transfer_type(&self, tx: &TxView, height: u64) -> TransferClassification {
    if !any_single_anyonecanpay(tx) {
      return TransferClassification::Simple;
    }

    let input_addresses: Vec<Option<String>> =
      tx.vin.iter().map(|input| self.input_address(input)).collect();

    let result = if height < MARKETPLACE_TEMPLATE_HEIGHT {
      validate_early_marketplace_template(tx, &input_addresses)
    } else {
      validate_new_marketplace_template(tx, &input_addresses)
    };

    match result {
      Ok(()) => TransferClassification::Marketplace,
      Err(err) => TransferClassification::InvalidMarketplace(err),
    }
  }

  fn invalid_entry(
    &self,
    tx: &TxView,
    vout_index: u32,
    ctx: &Context,
    error: BRC20Error,
    raw: String,
  ) -> OperationLogEntry {
    let parsed_json = parser::canonical_json(&raw);
    OperationLogEntry {
      txid: tx.txid,
      vout_index,
      operation: OperationKind::Invalid,
      ticker: None,
      amount: None,
      from_address: None,
      to_address: None,
      block_height: ctx.height,
      block_hash: ctx.hash,
      tx_index: ctx.tx_index,
      timestamp: ctx.timestamp,
      raw_op_return: raw,
      parsed_json,
      is_valid: false,
      error_code: Some(error.as_code()),
      error_message: Some(error.to_string()),
      is_marketplace: false,
      is_multi_transfer: false,
      multi_transfer_step: None,
    }
  }

  fn process_single(
    &self,
    tx: &TxView,
    vout_index: u32,
    op: ParsedOperation,
    raw: String,
    ctx: &Context,
    overlay: &mut BlockOverlay,
  ) -> ProcessingResult {
    let kind = op.kind();
    let tick_raw = op.tick().to_string();
    let tick = match Tick::new(&tick_raw) {
      Ok(tick) => tick,
      Err(err) => {
        let entry = self.invalid_entry(tx, vout_index, ctx, err, raw);
        overlay.push_operation(entry);
        return self.failure_result(tx.txid, kind, err);
      }
    };

    let sender = self.sender_address(tx);
    let recipient = Validator::resolve_recipient(tx, self.network);

    let outcome = match &op {
      ParsedOperation::Deploy {
        max_supply,
        limit_per_op,
        ..
      } => self.try_deploy(
        tx,
        ctx,
        &tick,
        max_supply.clone(),
        limit_per_op.clone(),
        sender.as_deref(),
        overlay,
      ),
      ParsedOperation::Mint { amt, .. } => {
        self.try_mint(tx, ctx, tick.normalized(), amt.clone(), recipient.clone(), overlay)
      }
      ParsedOperation::Transfer { amt, .. } => self.try_transfer(
        tx,
        ctx,
        tick.normalized(),
        amt.clone(),
        sender.as_deref(),
        recipient.clone(),
        overlay,
      ),
    };

    let (is_valid, error, is_marketplace, amount) = match outcome {
      Ok((marketplace, amt)) => (true, None, marketplace, Some(amt)),
      Err(err) => (false, Some(err), false, op_amount(&op)),
    };

    let parsed_json = parser::canonical_json(&raw);
    let entry = OperationLogEntry {
      txid: tx.txid,
      vout_index,
      operation: kind,
      ticker: Some(tick.as_str().to_string()),
      amount: amount.clone(),
      from_address: sender.clone(),
      to_address: recipient.as_deref().map(str::to_string),
      block_height: ctx.height,
      block_hash: ctx.hash,
      tx_index: ctx.tx_index,
      timestamp: ctx.timestamp,
      raw_op_return: raw,
      parsed_json,
      is_valid,
      error_code: error.map(BRC20Error::as_code),
      error_message: error.map(|e| e.to_string()),
      is_marketplace,
      is_multi_transfer: false,
      multi_transfer_step: None,
    };
    overlay.push_operation(entry);

    ProcessingResult {
      operation_found: true,
      is_valid,
      error_code: error.map(BRC20Error::as_code),
      error_message: error.map(|e| e.to_string()),
      operation_type: Some(kind),
      ticker: Some(tick.as_str().to_string()),
      amount,
      txid: tx.txid,
    }
  }

  fn failure_result(&self, txid: Txid, kind: OperationKind, err: BRC20Error) -> ProcessingResult {
    ProcessingResult {
      operation_found: true,
      is_valid: false,
      error_code: Some(err.as_code()),
      error_message: Some(err.to_string()),
      operation_type: Some(kind),
      ticker: None,
      amount: None,
      txid,
    }
  }

  fn try_deploy(
    &self,
    tx: &TxView,
    ctx: &Context,
    tick: &Tick,
    max_supply: Num,
    limit_per_op: Option<Num>,
    deployer_address: Option<&str>,
    overlay: &mut BlockOverlay,
  ) -> Result<(bool, Num), BRC20Error> {
    Validator::validate_deploy(
      overlay,
      self.store,
      tick.normalized(),
      max_supply.clone(),
      limit_per_op.clone(),
    )?;
    overlay.insert_deploy(
      tick.normalized().to_string(),
      Deploy {
        ticker: tick.as_str().to_string(),
        max_supply: max_supply.clone(),
        limit_per_op,
        deploy_txid: tx.txid,
        deploy_height: ctx.height,
        deploy_timestamp: ctx.timestamp,
        deployer_address: deployer_address.map(str::to_string),
      },
    );
    Ok((false, max_supply))
  }

  fn try_mint(
    &self,
    tx: &TxView,
    ctx: &Context,
    ticker_normalized: &str,
    amt: Num,
    recipient: Recipient,
    overlay: &mut BlockOverlay,
  ) -> Result<(bool, Num), BRC20Error> {
    Validator::validate_output_addresses(OperationKind::Mint, &recipient)?;
    let deploy = overlay
      .get_deploy(self.store, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?
      .ok_or(BRC20Error::TickerNotDeployed)?;
    Validator::validate_mint(overlay, self.store, &deploy, amt.clone())?;
    Validator::validate_mint_overflow(overlay, self.store, &deploy, amt.clone())?;

    let recipient = recipient.into_address().expect("checked by validate_output_addresses");
    let current_minted = overlay
      .get_total_minted(self.store, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?;
    overlay.set_total_minted(ticker_normalized, current_minted.checked_add(amt.clone())?);

    let current_balance = overlay
      .get_balance(self.store, &recipient, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?;
    overlay.set_balance(&recipient, ticker_normalized, current_balance.checked_add(amt.clone())?);

    let _ = (tx, ctx);
    Ok((false, amt))
  }

  fn try_transfer(
    &self,
    tx: &TxView,
    ctx: &Context,
    ticker_normalized: &str,
    amt: Num,
    sender: Option<&str>,
    recipient: Recipient,
    overlay: &mut BlockOverlay,
  ) -> Result<(bool, Num), BRC20Error> {
    Validator::validate_output_addresses(OperationKind::Transfer, &recipient)?;
    let sender = sender.ok_or(BRC20Error::InvalidAddress)?;

    let classification = self.classify_transfer_type(tx, ctx.height);
    let is_marketplace = match classification {
      TransferClassification::Simple => false,
      TransferClassification::Marketplace => true,
      TransferClassification::InvalidMarketplace(err) => return Err(err),
    };

    let deploy = overlay
      .get_deploy(self.store, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?;
    let sender_balance = overlay
      .get_balance(self.store, sender, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?;
    Validator::validate_transfer(deploy.is_some(), sender_balance.clone(), amt.clone())?;

    let recipient = recipient.into_address().expect("checked by validate_output_addresses");
    overlay.set_balance(sender, ticker_normalized, sender_balance.checked_sub(amt.clone())?);
    let recipient_balance = overlay
      .get_balance(self.store, &recipient, ticker_normalized)
      .map_err(|_| BRC20Error::UnhandledException)?;
    overlay.set_balance(
      &recipient,
      ticker_normalized,
      recipient_balance.checked_add(amt.clone())?,
    );

    Ok((is_marketplace, amt))
  }

  fn process_multi_transfer(
    &self,
    tx: &TxView,
    plan: Result<parser::MultiTransferPlan, BRC20Error>,
    ctx: &Context,
    overlay: &mut BlockOverlay,
  ) -> ProcessingResult {
    let plan = match plan {
      Ok(plan) => plan,
      Err(err) => {
        // Structural failure: log one entry per OP_RETURN with the same error, no mutation.
        for vout_index in parser::locate_op_returns(tx) {
          let raw = parser::raw_text(tx, vout_index);
          let entry = self.invalid_entry(tx, vout_index, ctx, err, raw);
          overlay.push_operation(entry);
        }
        return self.failure_result(tx.txid, OperationKind::Transfer, err);
      }
    };

    let tick = match Tick::new(&plan.tick) {
      Ok(tick) => tick,
      Err(err) => return self.failure_result(tx.txid, OperationKind::Transfer, err),
    };

    let sender = self.sender_address(tx);
    let total: Result<Num, BRC20Error> = plan
      .steps
      .iter()
      .try_fold(Num::zero(), |acc, step| acc.checked_add(step.amt.clone()));

    let log_all_steps = |overlay: &mut BlockOverlay, err: BRC20Error| {
      for (i, step) in plan.steps.iter().enumerate() {
        let entry = OperationLogEntry {
          txid: tx.txid,
          vout_index: step.op_return_vout,
          operation: OperationKind::Transfer,
          ticker: Some(tick.as_str().to_string()),
          amount: Some(step.amt.clone()),
          from_address: sender.clone(),
          to_address: None,
          block_height: ctx.height,
          block_hash: ctx.hash,
          tx_index: ctx.tx_index,
          timestamp: ctx.timestamp,
          raw_op_return: step.raw.clone(),
          parsed_json: parser::canonical_json(&step.raw),
          is_valid: false,
          error_code: Some(err.as_code()),
          error_message: Some(err.to_string()),
          is_marketplace: false,
          is_multi_transfer: true,
          multi_transfer_step: Some(i as u32),
        };
        overlay.push_operation(entry);
      }
    };

    let Some(sender) = sender else {
      log_all_steps(overlay, BRC20Error::InvalidAddress);
      return self.failure_result(tx.txid, OperationKind::Transfer, BRC20Error::InvalidAddress);
    };

    let total = match total {
      Ok(total) => total,
      Err(err) => {
        log_all_steps(overlay, err);
        return self.failure_result(tx.txid, OperationKind::Transfer, err);
      }
    };

    let sender_balance = match overlay.get_balance(self.store, &sender, tick.normalized()) {
      Ok(balance) => balance,
      Err(_) => {
        log_all_steps(overlay, BRC20Error::UnhandledException);
        return self.failure_result(tx.txid, OperationKind::Transfer, BRC20Error::UnhandledException);
      }
    };

    if sender_balance < total {
      log_all_steps(overlay, BRC20Error::MultiTransferInsufficientTotalBalance);
      return self.failure_result(
        tx.txid,
        OperationKind::Transfer,
        BRC20Error::MultiTransferInsufficientTotalBalance,
      );
    }

    // Simulate on a snapshot so a mid-plan failure never leaves a partial mutation behind.
    let snapshot = overlay.snapshot();
    let mut step_failure = None;
    let mut recipients = Vec::with_capacity(plan.steps.len());
    let mut running_sender_balance = sender_balance;

    for step in &plan.steps {
      let recipient = tx
        .vout
        .get(step.destination_vout as usize)
        .and_then(|out| script::extract_address(&out.script_pubkey, self.network));

      let Some(recipient) = recipient else {
        step_failure = Some(BRC20Error::InvalidAddress);
        break;
      };

      running_sender_balance = match running_sender_balance.checked_sub(step.amt.clone()) {
        Ok(balance) => balance,
        Err(err) => {
          step_failure = Some(err);
          break;
        }
      };
      overlay.set_balance(&sender, tick.normalized(), running_sender_balance.clone());

      let recipient_balance = match overlay.get_balance(self.store, &recipient, tick.normalized()) {
        Ok(balance) => balance,
        Err(_) => {
          step_failure = Some(BRC20Error::UnhandledException);
          break;
        }
      };
      let new_recipient_balance = match recipient_balance.checked_add(step.amt.clone()) {
        Ok(balance) => balance,
        Err(err) => {
          step_failure = Some(err);
          break;
        }
      };
      overlay.set_balance(&recipient, tick.normalized(), new_recipient_balance);

      recipients.push(recipient);
    }

    if let Some(err) = step_failure {
      overlay.restore(snapshot);
      log_all_steps(overlay, err);
      return self.failure_result(tx.txid, OperationKind::Transfer, err);
    }

    for (i, (step, recipient)) in plan.steps.iter().zip(recipients.iter()).enumerate() {
      let entry = OperationLogEntry {
        txid: tx.txid,
        vout_index: step.op_return_vout,
        operation: OperationKind::Transfer,
        ticker: Some(tick.as_str().to_string()),
        amount: Some(step.amt.clone()),
        from_address: Some(sender.clone()),
        to_address: Some(recipient.clone()),
        block_height: ctx.height,
        block_hash: ctx.hash,
        tx_index: ctx.tx_index,
        timestamp: ctx.timestamp,
        raw_op_return: step.raw.clone(),
        parsed_json: parser::canonical_json(&step.raw),
        is_valid: true,
        error_code: None,
        error_message: None,
        is_marketplace: false,
        is_multi_transfer: true,
        multi_transfer_step: Some(i as u32),
      };
      overlay.push_operation(entry);
    }

    ProcessingResult {
      operation_found: true,
      is_valid: true,
      error_code: None,
      error_message: None,
      operation_type: Some(OperationKind::Transfer),
      ticker: Some(tick.as_str().to_string()),
      amount: Some(total),
      txid: tx.txid,
    }
  }
}

fn op_amount(op: &ParsedOperation) -> Option<Num> {
  match op {
    ParsedOperation::Deploy { max_supply, .. } => Some(max_supply.clone()),
    ParsedOperation::Mint { amt, .. } | ParsedOperation::Transfer { amt, .. } => Some(amt.clone()),
  }
}
