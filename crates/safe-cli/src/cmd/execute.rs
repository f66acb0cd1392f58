use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use safe_multisig::{SubmitOutcome, TransactionStatus, WalletProvider};

use crate::{
    cmd::utils::{prepare_params, print_outcome, print_prepared, CallArgs},
    common::{EthArgs, TransactionFile},
    runner::CliContext,
    utils::print_loading_until_async,
};

#[derive(Debug, Parser)]
#[clap(
    about = "Execute a transaction, or approve it on-chain when more confirmations are needed."
)]
pub struct ExecuteCommand {
    #[arg(value_name = "FILE", help = "Transaction file (JSON).")]
    file: PathBuf,

    #[arg(
        long,
        help = "Count the signer as an approving owner without an off-chain signature."
    )]
    pre_approve: bool,

    #[arg(long, help = "Return once the transaction is sent instead of waiting for the receipt.")]
    no_wait: bool,

    #[clap(flatten)]
    call: CallArgs,

    #[clap(flatten)]
    eth: EthArgs,
}

impl ExecuteCommand {
    pub async fn execute(self, ctx: CliContext) -> eyre::Result<()> {
        let Self { file, pre_approve, no_wait, call, eth } = self;

        let file = TransactionFile::load(&file)?;
        let context = eth.connect(ctx.client).await?;
        let wallet = eth.wallet(context.config.chain_id)?;
        let (mut sender, wallet) = context.sender(wallet).await?;

        let mut params = prepare_params(file, call.options());
        params.approve_and_execute = true;
        params.pre_approving_owner = pre_approve.then(|| wallet.address());

        print_prepared(sender.prepare(params).await?);

        let outcome = print_loading_until_async("Submitting transaction", sender.submit()).await?;
        print_outcome(&outcome);

        if no_wait || !matches!(outcome, SubmitOutcome::Dispatched { .. }) {
            return Ok(());
        }

        match print_loading_until_async("Waiting for receipt", sender.await_outcome()).await? {
            TransactionStatus::Confirmed => println!("{}", "Transaction confirmed".bright_green()),
            status => {
                let reason = sender.last_error().map(ToString::to_string).unwrap_or_default();
                eyre::bail!("Transaction {status}: {reason}");
            }
        }

        Ok(())
    }
}
