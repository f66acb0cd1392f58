//! Runs one command on a single-threaded tokio runtime until it finishes or the user
//! interrupts it.

use std::future::Future;

use safe_multisig::ClientMeta;
use safe_version::{client_app_name, client_platform, CLIENT_NAME};
use tracing::{debug, warn};

const CLIENT_URL: &str = "https://github.com/safe-global/safe-cli-rs";

/// Shared state handed to every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub client: ClientMeta,
}

impl Default for CliContext {
    fn default() -> Self {
        Self { client: ClientMeta::new(CLIENT_NAME, &client_platform(), &client_app_name(), CLIENT_URL) }
    }
}

#[derive(Debug, Default)]
pub struct CliRunner {
    context: CliContext,
}

impl CliRunner {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    /// Executes the command returned by `command` on a fresh runtime.
    ///
    /// Ctrl-C drops the command future, which discards any in-flight request.
    pub fn run_command_until_exit<F, Fut>(self, command: F) -> eyre::Result<()>
    where
        F: FnOnce(CliContext) -> Fut,
        Fut: Future<Output = eyre::Result<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        debug!(client = %self.context.client.user_agent(), "Starting command");

        runtime.block_on(async move {
            tokio::select! {
                result = command(self.context) => result,
                _ = tokio::signal::ctrl_c() => {
                    warn!("Received ctrl-c, shutting down");
                    Ok(())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_describes_the_client() {
        let context = CliContext::default();

        assert_eq!(context.client.name, CLIENT_NAME);
        assert!(context.client.description.contains(';'));
        assert_eq!(context.client.url, CLIENT_URL);
    }

    #[test]
    fn runs_command_to_completion() {
        let result = CliRunner::default().run_command_until_exit(|ctx| async move {
            assert_eq!(ctx.client.name, CLIENT_NAME);
            Ok(())
        });

        assert!(result.is_ok());
    }

    #[test]
    fn propagates_command_errors() {
        let result = CliRunner::default().run_command_until_exit(|_| async { eyre::bail!("boom") });

        assert_eq!(result.unwrap_err().to_string(), "boom");
    }
}
