use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use safe_multisig::CallOptions;

use crate::{
    cmd::utils::{prepare_params, print_prepared},
    common::{EthArgs, TransactionFile},
    runner::CliContext,
    utils::print_loading_until_async,
};

#[derive(Debug, Parser)]
#[clap(about = "Add your signature to a proposed transaction.")]
pub struct ConfirmCommand {
    #[arg(value_name = "FILE", help = "Transaction file (JSON).")]
    file: PathBuf,

    #[clap(flatten)]
    eth: EthArgs,
}

impl ConfirmCommand {
    pub async fn execute(self, ctx: CliContext) -> eyre::Result<()> {
        let Self { file, eth } = self;

        let file = TransactionFile::load(&file)?;
        let context = eth.connect(ctx.client).await?;
        let wallet = eth.wallet(context.config.chain_id)?;
        let (mut sender, _) = context.sender(wallet).await?;

        sender.prepare(prepare_params(file, CallOptions::default())).await?;

        let signature = print_loading_until_async("Confirming transaction", sender.confirm()).await?;
        println!("{}", format!("Signature {signature}").bright_green());

        if let Some(prepared) = sender.prepared() {
            print_prepared(prepared);
        }

        Ok(())
    }
}
