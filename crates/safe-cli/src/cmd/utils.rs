use alloy_primitives::{utils::format_ether, U256};
use clap::Parser;
use colored::Colorize;
use safe_multisig::{
    CallOptions, ChainAction, PrepareParams, PreparedTransaction, SafeInfo, SubmitOutcome,
};

use crate::common::TransactionFile;

/// Overrides for the outer Ethereum transaction sent by the signer.
#[derive(Debug, Parser, Clone, Default)]
pub struct CallArgs {
    #[arg(long, value_name = "GAS", help = "Gas limit for the outer transaction.")]
    pub gas_limit: Option<u64>,

    #[arg(long, value_name = "WEI", help = "Max fee per gas for the outer transaction.")]
    pub max_fee_per_gas: Option<u128>,

    #[arg(long, value_name = "WEI", help = "Max priority fee per gas for the outer transaction.")]
    pub priority_fee: Option<u128>,

    #[arg(long, value_name = "NONCE", help = "Nonce of the signer account, not of the Safe.")]
    pub signer_nonce: Option<u64>,
}

impl CallArgs {
    pub fn options(&self) -> CallOptions {
        CallOptions {
            gas_limit: self.gas_limit,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.priority_fee,
            nonce: self.signer_nonce,
        }
    }
}

pub fn prepare_params(file: TransactionFile, call_options: CallOptions) -> PrepareParams {
    PrepareParams {
        safe_address: file.safe,
        form: file.transaction,
        origin: file.origin,
        confirmations: file.confirmations,
        call_options,
        ..Default::default()
    }
}

pub fn format_value(value: U256) -> String {
    format!("{} ETH", format_ether(value))
}

pub fn print_safe_info(info: &SafeInfo) {
    println!("{}", format!("Safe {}", info.address.to_checksum(None)).bold());
    println!("  {:<12} {}", "version".bright_cyan(), info.version);
    println!("  {:<12} {}", "nonce".bright_cyan(), info.nonce);
    println!("  {:<12} {} of {}", "threshold".bright_cyan(), info.threshold, info.owners.len());
    println!("  {}", "owners".bright_cyan());
    for owner in &info.owners {
        println!("    {}", owner.to_checksum(None));
    }
}

pub fn print_prepared(prepared: &PreparedTransaction) {
    println!("{}", "Transaction".bold());
    println!("  {:<12} {}", "safeTxHash".bright_cyan(), prepared.safe_tx_hash());
    println!("  {:<12} {}", "to".bright_cyan(), prepared.data.to.to_checksum(None));
    println!("  {:<12} {}", "value".bright_cyan(), format_value(prepared.data.value));
    println!("  {:<12} {}", "nonce".bright_cyan(), prepared.data.nonce);

    let approvals = format!("{} of {}", prepared.approvals(), prepared.safe.threshold);
    let approvals =
        if prepared.can_execute() { approvals.bright_green() } else { approvals.bright_yellow() };
    println!("  {:<12} {}", "approvals".bright_cyan(), approvals);
}

pub fn print_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Proposed(details) => {
            println!("{}", format!("Proposed transaction {}", details.tx_id).bright_green());
            println!("  {:<12} {}", "status".bright_cyan(), details.tx_status);
        }
        SubmitOutcome::Dispatched { action: ChainAction::Execute, chain_tx_hash } => {
            println!("{}", format!("Execution sent in {chain_tx_hash}").bright_green());
        }
        SubmitOutcome::Dispatched { action: ChainAction::ApproveHash, chain_tx_hash } => {
            println!("{}", format!("On-chain approval sent in {chain_tx_hash}").bright_green());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_args_map_to_options() {
        let args = CallArgs { gas_limit: Some(10), priority_fee: Some(2), ..Default::default() };

        assert_eq!(
            args.options(),
            CallOptions {
                gas_limit: Some(10),
                max_fee_per_gas: None,
                max_priority_fee_per_gas: Some(2),
                nonce: None
            }
        );
    }

    #[test]
    fn value_in_ether() {
        assert_eq!(format_value(U256::from(1_500_000_000_000_000_000u128)), "1.500000000000000000 ETH");
    }
}
