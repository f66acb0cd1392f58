use std::time::Duration;

use alloy_primitives::Address;
use multicall::multi_send_call_only_address;
use serde_json::json;
use url::Url;

use crate::{
    consts::{get_gateway_url, DEFAULT_RECEIPT_POLL_INTERVAL, DEFAULT_RECEIPT_TIMEOUT},
    error::SafeError,
};

/// Describes this client to the gateway and to wallets. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMeta {
    pub name: String,
    /// `{platform};{app name}`
    pub description: String,
    pub url: String,
}

impl ClientMeta {
    pub fn new(name: impl Into<String>, platform: &str, app: &str, url: impl Into<String>) -> Self {
        Self { name: name.into(), description: format!("{platform};{app}"), url: url.into() }
    }

    pub fn user_agent(&self) -> String {
        format!("{} ({})", self.name, self.description)
    }

    /// Provenance recorded with proposals that do not carry their own origin.
    pub fn origin(&self) -> String {
        json!({ "name": self.name, "url": self.url }).to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SafeConfig {
    pub chain_id: u64,
    pub gateway_url: Url,
    pub multi_send_address: Address,
    pub client: ClientMeta,
    pub receipt_timeout: Duration,
    pub receipt_poll_interval: Duration,
}

impl SafeConfig {
    /// Defaults for a supported chain: the public gateway and the canonical `MultiSendCallOnly`.
    pub fn for_chain(chain_id: u64, client: ClientMeta) -> Result<Self, SafeError> {
        let gateway_url = get_gateway_url(chain_id)?;
        let gateway_url = Url::parse(&gateway_url).map_err(|err| SafeError::encoding("gateway_url", err))?;

        Ok(Self {
            chain_id,
            gateway_url,
            multi_send_address: multi_send_call_only_address(chain_id)?,
            client,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        })
    }

    pub fn with_gateway_url(self, gateway_url: Url) -> Self {
        Self { gateway_url, ..self }
    }

    pub fn with_multi_send_address(self, multi_send_address: Address) -> Self {
        Self { multi_send_address, ..self }
    }

    pub fn with_receipt_timeout(self, receipt_timeout: Duration) -> Self {
        Self { receipt_timeout, ..self }
    }
}
