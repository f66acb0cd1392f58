use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use safe_multisig::{validate, verify_transaction_hash, SafeTxHasher};

use crate::{common::{EthArgs, TransactionFile}, runner::CliContext};

#[derive(Debug, Parser)]
#[clap(about = "Compute the safeTxHash of a transaction without signing it.")]
pub struct HashCommand {
    #[arg(value_name = "FILE", help = "Transaction file (JSON).")]
    file: PathBuf,

    #[arg(long, help = "Print the EIP-712 typed data instead of only the hash.")]
    typed_data: bool,

    #[arg(
        long,
        conflicts_with = "typed_data",
        help = "Check the hash against the Safe contract and list owners that approved it on-chain."
    )]
    verify: bool,

    #[clap(flatten)]
    eth: EthArgs,
}

impl HashCommand {
    pub async fn execute(self, ctx: CliContext) -> eyre::Result<()> {
        let Self { file, typed_data, verify, eth } = self;

        let file = TransactionFile::load(&file)?;
        let draft = validate(&file.transaction)?;

        let context = eth.connect(ctx.client).await?;
        let info = context.chain.safe_info(file.safe).await?;
        let nonce = draft.nonce.unwrap_or(info.nonce);
        let data = draft.into_transaction(nonce);

        let hasher = SafeTxHasher::new(context.config.chain_id);
        let typed = hasher.typed_data(file.safe, &info.version, &data)?;

        if typed_data {
            println!("{}", serde_json::to_string_pretty(&typed.document)?);
            return Ok(());
        }

        println!("{}", typed.hash);

        if verify {
            let approved = verify_transaction_hash(context.chain.as_ref(), &info, &data, typed.hash).await?;
            println!("{}", "Hash matches the Safe contract".bright_green());
            println!("  {:<12} {} of {}", "approved".bright_cyan(), approved.len(), info.threshold);
            for owner in approved {
                println!("    {}", owner.to_checksum(None));
            }
        }

        Ok(())
    }
}
