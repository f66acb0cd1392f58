use std::{path::PathBuf, sync::Arc};

use alloy_primitives::U256;
use clap::Parser;
use colored::Colorize;
use eyre::WrapErr;
use safe_multisig::{
    validate, BatchExecutor, ExecutionReadyTransaction, SafeTxHasher, WalletProvider,
};
use tracing::warn;

use crate::{
    cmd::utils::CallArgs,
    common::{BatchFile, EthArgs},
    runner::CliContext,
    utils::print_loading_until_async,
};

#[derive(Debug, Parser)]
#[clap(about = "Execute several confirmed transactions of one Safe atomically through MultiSendCallOnly.")]
pub struct BatchExecuteCommand {
    #[arg(value_name = "FILE", help = "Batch file (JSON).")]
    file: PathBuf,

    #[arg(long, help = "Return once the batch is sent instead of waiting for the receipt.")]
    no_wait: bool,

    #[clap(flatten)]
    call: CallArgs,

    #[clap(flatten)]
    eth: EthArgs,
}

impl BatchExecuteCommand {
    pub async fn execute(self, ctx: CliContext) -> eyre::Result<()> {
        let Self { file, no_wait, call, eth } = self;

        let file = BatchFile::load(&file)?;
        let context = eth.connect(ctx.client).await?;
        let wallet = eth.wallet(context.config.chain_id)?;
        wallet.connect().await?;

        let info = print_loading_until_async("Loading Safe", context.chain.safe_info(file.safe)).await?;
        let hasher = SafeTxHasher::new(context.config.chain_id);

        let mut txs = Vec::with_capacity(file.transactions.len());
        for (i, entry) in file.transactions.into_iter().enumerate() {
            let draft = validate(&entry.transaction).wrap_err_with(|| format!("transactions[{i}]"))?;
            let nonce = draft.nonce.unwrap_or(info.nonce + U256::from(i));

            let confirmations = entry
                .confirmations
                .into_iter()
                .filter(|confirmation| {
                    let is_owner = info.is_owner(&confirmation.owner);
                    if !is_owner {
                        warn!(owner = %confirmation.owner, index = i, "Dropping confirmation from a non-owner");
                    }
                    is_owner
                })
                .collect();

            txs.push(ExecutionReadyTransaction::new(
                &hasher,
                file.safe,
                &info.version,
                draft.into_transaction(nonce),
                confirmations,
                info.threshold,
            )?);
        }

        let executor =
            BatchExecutor::new(context.chain.clone(), Arc::new(wallet), context.config.multi_send_address);
        let tx_hash = print_loading_until_async(
            "Submitting batch",
            executor.submit(file.safe, &txs, call.options()),
        )
        .await?;
        println!("{}", format!("Batch of {} sent in {tx_hash}", txs.len()).bright_green());

        if no_wait {
            return Ok(());
        }

        if print_loading_until_async("Waiting for receipt", executor.await_receipt(tx_hash)).await? {
            println!("{}", "Batch confirmed".bright_green());
            Ok(())
        } else {
            eyre::bail!("Batch transaction {tx_hash} reverted")
        }
    }
}
