use std::time::Duration;

use multicall::is_supported_chain;

use crate::error::SafeError;

pub mod urls {
    /// Client gateway serving every supported chain under `/v1/chains/{chain_id}`.
    pub const GATEWAY_URL: &str = "https://safe-client.safe.global";
}

pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);

pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(4);

pub fn get_gateway_url(chain_id: u64) -> Result<String, SafeError> {
    if !is_supported_chain(chain_id) {
        return Err(SafeError::UnsupportedChain(chain_id));
    }

    Ok(urls::GATEWAY_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_url_for_supported_chains() {
        assert_eq!(get_gateway_url(1).unwrap(), urls::GATEWAY_URL);
        assert_eq!(get_gateway_url(11155111).unwrap(), urls::GATEWAY_URL);
        assert_eq!(get_gateway_url(424242), Err(SafeError::UnsupportedChain(424242)));
    }
}
