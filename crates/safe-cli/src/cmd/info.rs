use alloy_primitives::Address;
use clap::Parser;

use crate::{
    cmd::utils::print_safe_info,
    common::EthArgs,
    runner::CliContext,
    utils::print_loading_until_async,
};

#[derive(Debug, Parser)]
#[clap(about = "Show the owners, threshold, nonce and version of a Safe.")]
pub struct InfoCommand {
    #[arg(value_name = "SAFE", help = "The address of the Safe.")]
    safe: Address,

    #[clap(flatten)]
    eth: EthArgs,
}

impl InfoCommand {
    pub async fn execute(self, ctx: CliContext) -> eyre::Result<()> {
        let Self { safe, eth } = self;

        let context = eth.connect(ctx.client).await?;
        let info = print_loading_until_async("Loading Safe", context.chain.safe_info(safe)).await?;

        print_safe_info(&info);

        Ok(())
    }
}
