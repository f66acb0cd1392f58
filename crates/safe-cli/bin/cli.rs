use clap::{
    builder::{styling::AnsiColor, Styles},
    ArgAction, Parser, Subcommand,
};
use safe_cli::{
    cmd::{
        batch_execute::BatchExecuteCommand, confirm::ConfirmCommand, execute::ExecuteCommand,
        hash::HashCommand, info::InfoCommand, propose::ProposeCommand,
    },
    logging::init_tracing,
    runner::CliRunner,
};
use safe_version::SHORT_VERSION;

/// The verbosity level.
pub type Verbosity = u8;

#[derive(Debug, Parser)]
#[command(
    name = "safe",
    about = "Propose, confirm and execute Safe multi-signature transactions.",
    author = "The Safe CLI developers",
    version = SHORT_VERSION.as_str(),
    term_width = 80,
    styles = get_color_style()
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable debug logging")]
    pub debug: bool,

    /// Verbosity level of the log messages.
    ///
    /// Pass multiple times to increase the verbosity (e.g. -v, -vv, -vvv).
    /// `RUST_LOG` takes precedence when set.
    ///
    /// - 1 (-v): Info.
    /// - 2 (-vv): Debug.
    /// - 3 (-vvv): Trace.
    #[arg(help_heading = "Display options", global = true, short, long, verbatim_doc_comment, action = ArgAction::Count)]
    verbosity: Verbosity,
}

impl Cli {
    pub fn run(self) -> eyre::Result<()> {
        init_tracing(self.verbosity, self.debug)?;

        let runner = CliRunner::default();
        match self.command {
            Commands::Info(info) => runner.run_command_until_exit(|ctx| info.execute(ctx)),
            Commands::Hash(hash) => runner.run_command_until_exit(|ctx| hash.execute(ctx)),
            Commands::Propose(propose) => runner.run_command_until_exit(|ctx| propose.execute(ctx)),
            Commands::Confirm(confirm) => runner.run_command_until_exit(|ctx| confirm.execute(ctx)),
            Commands::Execute(execute) => runner.run_command_until_exit(|ctx| execute.execute(ctx)),
            Commands::BatchExecute(batch) => runner.run_command_until_exit(|ctx| batch.execute(ctx)),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(name = "info")]
    Info(InfoCommand),

    #[command(name = "hash")]
    Hash(HashCommand),

    #[command(name = "propose")]
    Propose(ProposeCommand),

    #[command(name = "confirm")]
    Confirm(ConfirmCommand),

    #[command(name = "execute")]
    Execute(ExecuteCommand),

    #[command(name = "batch-execute")]
    BatchExecute(BatchExecuteCommand),
}

fn get_color_style() -> Styles {
    Styles::styled()
        .usage(AnsiColor::Green.on_default().bold().underline())
        .header(AnsiColor::Yellow.on_default().bold().underline())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}
