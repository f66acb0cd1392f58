use std::path::PathBuf;

use clap::Parser;
use safe_multisig::CallOptions;

use crate::{
    cmd::utils::{prepare_params, print_outcome, print_prepared},
    common::{EthArgs, TransactionFile},
    runner::CliContext,
    utils::print_loading_until_async,
};

#[derive(Debug, Parser)]
#[clap(about = "Sign a transaction and propose it to the other owners.")]
pub struct ProposeCommand {
    #[arg(value_name = "FILE", help = "Transaction file (JSON).")]
    file: PathBuf,

    #[clap(flatten)]
    eth: EthArgs,
}

impl ProposeCommand {
    pub async fn execute(self, ctx: CliContext) -> eyre::Result<()> {
        let Self { file, eth } = self;

        let file = TransactionFile::load(&file)?;
        let context = eth.connect(ctx.client).await?;
        let wallet = eth.wallet(context.config.chain_id)?;
        let (mut sender, _) = context.sender(wallet).await?;

        let params = prepare_params(file, CallOptions::default());
        print_prepared(sender.prepare(params).await?);

        let outcome = print_loading_until_async("Proposing transaction", sender.submit()).await?;
        print_outcome(&outcome);

        Ok(())
    }
}
