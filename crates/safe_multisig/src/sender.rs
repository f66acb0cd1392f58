//! Drives one Safe transaction from raw input to an on-chain outcome.
//!
//! ```text
//! Created -> Prepared -> Finalizing -> Submitted -> Confirmed | Failed
//!                     \-> Proposed  -/
//! ```

use std::{future::Future, sync::Arc};

use alloy_primitives::{Address, Bytes, B256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    calls::{approve_hash, exec_transaction},
    chain::{ChainReader, SafeInfo},
    config::SafeConfig,
    error::{ErrorCode, SafeError},
    gateway::{ProposeTransactionBody, Recorder, TransactionDetails},
    hasher::{SafeTxHasher, SafeTypedData},
    lifecycle::{EventBus, EventKind, Subscription, TransactionEvent, TransactionStatus},
    signatures::{SignatureSet, SignerExpectation},
    transaction_data::{Confirmation, SafeTransactionData},
    validation::{validate, TransactionForm},
    wallet::{CallOptions, CallRequest, WalletProvider},
};

#[derive(Debug, Clone, Default)]
pub struct PrepareParams {
    pub safe_address: Address,
    pub form: TransactionForm,
    /// Provenance recorded with the proposal. Defaults to the client description.
    pub origin: Option<String>,
    pub confirmations: Vec<Confirmation>,
    /// Execute (or approve on-chain) instead of only proposing.
    pub approve_and_execute: bool,
    /// Owner whose approval is implied, usually the account sending the execution.
    pub pre_approving_owner: Option<Address>,
    pub call_options: CallOptions,
    pub tx_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTransaction {
    pub tx_id: String,
    pub safe: SafeInfo,
    pub data: SafeTransactionData,
    pub typed_data: SafeTypedData,
    pub origin: String,
    pub signatures: SignatureSet,
    pub approve_and_execute: bool,
    pub pre_approving_owner: Option<Address>,
    pub call_options: CallOptions,
}

impl PreparedTransaction {
    pub fn safe_tx_hash(&self) -> B256 {
        self.typed_data.hash
    }

    /// Distinct owners approving, counting the pre-approving owner.
    pub fn approvals(&self) -> usize {
        let implied = self
            .pre_approving_owner
            .filter(|owner| !self.signatures.contains(owner))
            .is_some();
        self.signatures.len() + usize::from(implied)
    }

    pub fn threshold_reached(&self) -> bool {
        self.signatures.len() >= self.safe.threshold
    }

    pub fn can_execute(&self) -> bool {
        self.approvals() >= self.safe.threshold
    }

    /// Whether submitting goes to the chain rather than to the recorder.
    pub fn is_finalization(&self) -> bool {
        self.approve_and_execute && (self.threshold_reached() || self.pre_approving_owner.is_some())
    }

    fn packed_signatures(&self) -> Result<Bytes, SafeError> {
        let mut set = self.signatures.clone();
        let expectation = match self.pre_approving_owner {
            Some(owner) => {
                set.pre_approve(owner);
                SignerExpectation::AllowEmpty
            }
            None => SignerExpectation::AtLeastOne,
        };
        set.pack_checked(expectation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainAction {
    Execute,
    ApproveHash,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Proposed(TransactionDetails),
    Dispatched { action: ChainAction, chain_tx_hash: B256 },
}

async fn with_cancellation<F, R>(token: &CancellationToken, future: F) -> Result<R, SafeError>
where
    F: Future<Output = Result<R, SafeError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SafeError::Cancelled),
        result = future => {
            if token.is_cancelled() {
                Err(SafeError::Cancelled)
            } else {
                result
            }
        }
    }
}

pub struct TransactionSender {
    chain: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletProvider>,
    recorder: Arc<dyn Recorder>,
    config: Arc<SafeConfig>,
    hasher: SafeTxHasher,
    events: EventBus,
    cancel: CancellationToken,
    status: TransactionStatus,
    prepared: Option<PreparedTransaction>,
    attempt: u32,
    last_error: Option<SafeError>,
    nonce_conflict: Option<SafeError>,
    chain_tx_hash: Option<B256>,
}

impl TransactionSender {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        wallet: Arc<dyn WalletProvider>,
        recorder: Arc<dyn Recorder>,
        config: Arc<SafeConfig>,
    ) -> Self {
        Self {
            chain,
            wallet,
            recorder,
            hasher: SafeTxHasher::new(config.chain_id),
            config,
            events: EventBus::default(),
            cancel: CancellationToken::new(),
            status: TransactionStatus::Created,
            prepared: None,
            attempt: 0,
            last_error: None,
            nonce_conflict: None,
            chain_tx_hash: None,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn prepared(&self) -> Option<&PreparedTransaction> {
        self.prepared.as_ref()
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_error(&self) -> Option<&SafeError> {
        self.last_error.as_ref()
    }

    pub fn chain_tx_hash(&self) -> Option<B256> {
        self.chain_tx_hash
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stops waiting on any in-flight request. Late results are discarded.
    pub fn dismiss(&self) {
        debug!("Dismissing transaction sender");
        self.cancel.cancel();
    }

    fn invalid_state(&self, action: &'static str) -> SafeError {
        SafeError::InvalidState { action, status: self.status }
    }

    fn emit(&self, kind: EventKind, error: Option<SafeError>) {
        let Some(prepared) = &self.prepared else { return };

        let mut event = TransactionEvent::new(prepared.tx_id.clone(), kind)
            .with_safe_tx_hash(prepared.safe_tx_hash())
            .with_chain_tx_hash(self.chain_tx_hash);
        if let Some(error) = error {
            event = event.with_error(error);
        }
        self.events.emit(event);
    }

    fn fail(&mut self, err: SafeError) -> SafeError {
        error!(
            code = %ErrorCode::SubmitTransaction,
            cause = %err.code(),
            attempt = self.attempt,
            "Transaction failed: {err}"
        );
        self.status = TransactionStatus::Failed;
        self.last_error = Some(err.clone());
        self.emit(EventKind::Failed, Some(err.clone()));
        err
    }

    /// Validates the input, reads the Safe and computes the transaction hash.
    pub async fn prepare(&mut self, params: PrepareParams) -> Result<&PreparedTransaction, SafeError> {
        if !matches!(self.status, TransactionStatus::Created | TransactionStatus::Prepared) {
            return Err(self.invalid_state("prepare"));
        }

        let prepared = match self.build(params).await {
            Ok(prepared) => prepared,
            Err(err) => {
                error!(code = %ErrorCode::PrepareTransaction, cause = %err.code(), "{err}");
                return Err(err);
            }
        };

        info!(
            tx_id = %prepared.tx_id,
            safe_tx_hash = %prepared.safe_tx_hash(),
            nonce = %prepared.data.nonce,
            approvals = prepared.approvals(),
            threshold = prepared.safe.threshold,
            "Transaction prepared"
        );

        self.status = TransactionStatus::Prepared;
        self.nonce_conflict = None;
        self.last_error = None;
        self.chain_tx_hash = None;
        let prepared = self.prepared.insert(prepared);

        self.events.emit(
            TransactionEvent::new(prepared.tx_id.clone(), EventKind::Prepared)
                .with_safe_tx_hash(prepared.typed_data.hash),
        );

        Ok(prepared)
    }

    async fn build(&self, params: PrepareParams) -> Result<PreparedTransaction, SafeError> {
        let draft = validate(&params.form)?;
        let safe_address = params.safe_address;

        let safe = with_cancellation(&self.cancel, self.chain.safe_info(safe_address)).await?;

        let nonce = match draft.nonce {
            Some(nonce) if nonce < safe.nonce => {
                return Err(SafeError::NonceConflict { expected: nonce, onchain: safe.nonce });
            }
            Some(nonce) => nonce,
            None => safe.nonce,
        };

        if let Some(owner) = params.pre_approving_owner {
            if !safe.is_owner(&owner) {
                return Err(SafeError::encoding(
                    "pre_approving_owner",
                    format!("{owner} is not an owner of {safe_address}"),
                ));
            }
            // The Safe only honours a pre-approval from `msg.sender`.
            let sender = self.wallet.address();
            if owner != sender {
                return Err(SafeError::encoding(
                    "pre_approving_owner",
                    format!("{owner} is not the sending account {sender}"),
                ));
            }
        }

        let data = draft.into_transaction(nonce);
        let typed_data = self.hasher.typed_data(safe_address, &safe.version, &data)?;

        let mut signatures = SignatureSet::new(typed_data.hash);
        for confirmation in &params.confirmations {
            match signatures.insert(confirmation) {
                Ok(()) => {}
                Err(err @ SafeError::StaleHash { .. }) => {
                    warn!(owner = %confirmation.owner, code = %err.code(), "Dropping confirmation: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        signatures.retain_owners(|owner| {
            let is_owner = safe.is_owner(owner);
            if !is_owner {
                warn!(%owner, "Dropping confirmation from an address that is not an owner");
            }
            is_owner
        });

        let tx_id = params
            .tx_id
            .unwrap_or_else(|| format!("multisig_{}_{}", safe_address, typed_data.hash));

        Ok(PreparedTransaction {
            tx_id,
            safe,
            data,
            typed_data,
            origin: params.origin.unwrap_or_else(|| self.config.client.origin()),
            signatures,
            approve_and_execute: params.approve_and_execute,
            pre_approving_owner: params.pre_approving_owner,
            call_options: params.call_options,
        })
    }

    /// Proposes the transaction or sends it to the chain, depending on
    /// [`PreparedTransaction::is_finalization`].
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SafeError> {
        if self.status != TransactionStatus::Prepared {
            return Err(self.invalid_state("submit"));
        }
        if let Some(conflict) = &self.nonce_conflict {
            return Err(conflict.clone());
        }
        let Some(prepared) = self.prepared.clone() else {
            return Err(self.invalid_state("submit"));
        };

        if prepared.is_finalization() {
            self.finalize(&prepared).await
        } else {
            self.propose(&prepared).await
        }
    }

    async fn propose(&mut self, prepared: &PreparedTransaction) -> Result<SubmitOutcome, SafeError> {
        self.status = TransactionStatus::Proposed;

        let result = with_cancellation(&self.cancel, async {
            let signature = self.wallet.sign_typed_data(prepared.typed_data.clone()).await?;
            let sender = self.wallet.address();
            let body = ProposeTransactionBody::new(
                &prepared.data,
                prepared.safe_tx_hash(),
                sender,
                Some(signature.clone()),
                Some(prepared.origin.clone()),
            );
            let details = self.recorder.propose_transaction(prepared.safe.address, body).await?;
            Ok((sender, signature, details))
        })
        .await;

        let (sender, signature, details) = match result {
            Ok(proposed) => proposed,
            Err(SafeError::Cancelled) => {
                self.status = TransactionStatus::Prepared;
                return Err(SafeError::Cancelled);
            }
            Err(err) => return Err(self.fail(err)),
        };

        if let Some(current) = self.prepared.as_mut() {
            if current.safe.is_owner(&sender) {
                let own = Confirmation::signed(sender, signature, current.safe_tx_hash());
                if let Err(err) = current.signatures.insert(&own) {
                    warn!(%sender, code = %err.code(), "Own signature not kept: {err}");
                }
            }
        }

        info!(tx_id = %details.tx_id, status = %details.tx_status, "Transaction proposed");
        self.emit(EventKind::Proposed, None);
        self.status = TransactionStatus::Submitted;
        self.emit(EventKind::Submitted, None);

        Ok(SubmitOutcome::Proposed(details))
    }

    async fn finalize(&mut self, prepared: &PreparedTransaction) -> Result<SubmitOutcome, SafeError> {
        self.status = TransactionStatus::Finalizing;
        let safe = prepared.safe.address;

        let onchain = match with_cancellation(&self.cancel, self.chain.nonce(safe)).await {
            Ok(onchain) => onchain,
            Err(SafeError::Cancelled) => {
                self.status = TransactionStatus::Prepared;
                return Err(SafeError::Cancelled);
            }
            Err(err) => return Err(self.fail(err)),
        };

        if onchain != prepared.data.nonce {
            let err = SafeError::NonceConflict { expected: prepared.data.nonce, onchain };
            warn!(%safe, code = %err.code(), "Prepare the transaction again: {err}");
            self.status = TransactionStatus::Prepared;
            self.nonce_conflict = Some(err.clone());
            self.last_error = Some(err.clone());
            return Err(err);
        }

        let (action, executable) = if prepared.can_execute() {
            let signatures = match prepared.packed_signatures() {
                Ok(signatures) => signatures,
                Err(err) => return Err(self.fail(err)),
            };
            (ChainAction::Execute, exec_transaction(&prepared.data, &signatures, safe))
        } else {
            (ChainAction::ApproveHash, approve_hash(prepared.safe_tx_hash(), safe))
        };
        debug!(?action, approvals = prepared.approvals(), "Dispatching to the Safe");

        let call = CallRequest::new(executable.safe_address, executable.calldata)
            .with_options(prepared.call_options);

        let chain_tx_hash = match with_cancellation(&self.cancel, self.wallet.send_call(call)).await {
            Ok(chain_tx_hash) => chain_tx_hash,
            Err(SafeError::Cancelled) => {
                self.status = TransactionStatus::Prepared;
                return Err(SafeError::Cancelled);
            }
            Err(err) => return Err(self.fail(err)),
        };

        info!(tx_id = %prepared.tx_id, %chain_tx_hash, ?action, "Transaction submitted");
        self.chain_tx_hash = Some(chain_tx_hash);
        self.status = TransactionStatus::Submitted;
        self.emit(EventKind::Submitted, None);

        Ok(SubmitOutcome::Dispatched { action, chain_tx_hash })
    }

    /// Waits for the dispatched transaction to be mined.
    ///
    /// Proposals have nothing to wait for and stay `Submitted`.
    pub async fn await_outcome(&mut self) -> Result<TransactionStatus, SafeError> {
        if self.status != TransactionStatus::Submitted {
            return Err(self.invalid_state("await"));
        }
        let Some(chain_tx_hash) = self.chain_tx_hash else {
            return Ok(self.status);
        };

        match with_cancellation(&self.cancel, self.chain.wait_for_receipt(chain_tx_hash)).await {
            Ok(true) => {
                info!(%chain_tx_hash, "Transaction confirmed");
                self.status = TransactionStatus::Confirmed;
                self.emit(EventKind::Confirmed, None);
            }
            Ok(false) => {
                self.fail(SafeError::chain(format!("transaction {chain_tx_hash} reverted")));
            }
            Err(SafeError::Cancelled) => return Err(SafeError::Cancelled),
            Err(err) => return Err(self.fail(err)),
        }

        Ok(self.status)
    }

    /// Adds a confirmation that arrived after preparation. Returns whether the
    /// transaction can now be executed.
    pub fn observe_confirmation(&mut self, confirmation: &Confirmation) -> Result<bool, SafeError> {
        let status = self.status;
        let Some(prepared) = self.prepared.as_mut() else {
            return Err(SafeError::InvalidState { action: "confirm", status });
        };

        if !prepared.safe.is_owner(&confirmation.owner) {
            return Err(SafeError::encoding(
                "owner",
                format!("{} is not an owner of {}", confirmation.owner, prepared.safe.address),
            ));
        }

        prepared.signatures.insert(confirmation)?;
        debug!(owner = %confirmation.owner, approvals = prepared.approvals(), "Confirmation added");

        Ok(prepared.can_execute())
    }

    /// Signs the prepared transaction with the wallet and records the confirmation.
    pub async fn confirm(&mut self) -> Result<Bytes, SafeError> {
        if !matches!(self.status, TransactionStatus::Prepared | TransactionStatus::Submitted) {
            return Err(self.invalid_state("confirm"));
        }
        let Some(prepared) = self.prepared.clone() else {
            return Err(self.invalid_state("confirm"));
        };

        let owner = self.wallet.address();
        if !prepared.safe.is_owner(&owner) {
            return Err(SafeError::encoding(
                "sender",
                format!("{owner} is not an owner of {}", prepared.safe.address),
            ));
        }

        let signature = with_cancellation(&self.cancel, async {
            let signature = self.wallet.sign_typed_data(prepared.typed_data.clone()).await?;
            self.recorder.confirm_transaction(prepared.safe_tx_hash(), signature.clone()).await?;
            Ok(signature)
        })
        .await?;

        self.observe_confirmation(&Confirmation::signed(owner, signature.clone(), prepared.safe_tx_hash()))?;
        Ok(signature)
    }

    /// Retries a failed submission with the same transaction.
    pub async fn resubmit(&mut self) -> Result<SubmitOutcome, SafeError> {
        if self.status != TransactionStatus::Failed {
            return Err(self.invalid_state("resubmit"));
        }

        self.attempt += 1;
        info!(attempt = self.attempt, "Resubmitting transaction");
        self.status = TransactionStatus::Prepared;
        self.last_error = None;
        self.chain_tx_hash = None;

        self.submit().await
    }
}
