use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultiSendError {
    #[error("cannot encode an empty batch")]
    EmptyBatch,

    #[error("multi-send is not deployed on chain {0}")]
    UnsupportedChain(u64),
}
