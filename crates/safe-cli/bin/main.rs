mod cli;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use safe_multisig::SafeError;

fn main() {
    if let Err(err) = Cli::parse().run() {
        let label = "Error:".bright_red().bold();
        match err.downcast_ref::<SafeError>() {
            Some(safe_err) => eprintln!("{label} {}", safe_err.user_message()),
            None => eprintln!("{label} {err:?}"),
        }
        std::process::exit(1);
    }
}
