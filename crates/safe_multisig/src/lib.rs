//! Multi-signature transaction lifecycle for Safe accounts: hashing, signature
//! aggregation, batching, proposal and execution.

pub mod batch;
pub mod calls;
pub mod chain;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hasher;
pub mod lifecycle;
pub mod sender;
pub mod signatures;
pub mod transaction_data;
pub mod validation;
pub mod wallet;

mod consts;
mod contracts;
mod utils;

pub use batch::{build_batch, BatchExecutor, EncodedBatch, ExecutionReadyTransaction};
pub use chain::{verify_transaction_hash, ChainReader, RpcChainReader, SafeInfo};
pub use config::{ClientMeta, SafeConfig};
pub use consts::get_gateway_url;
pub use error::{ErrorCode, SafeError};
pub use gateway::{Recorder, SafeClient};
pub use hasher::{Eip712Schema, SafeTxHasher};
pub use lifecycle::{EventKind, Subscription, TransactionEvent, TransactionStatus};
pub use sender::{ChainAction, PrepareParams, PreparedTransaction, SubmitOutcome, TransactionSender};
pub use signatures::{aggregate, SignatureSet, SignerExpectation};
pub use transaction_data::{Confirmation, Operation, SafeTransactionData};
pub use validation::{validate, TransactionForm};
pub use wallet::{CallOptions, LocalWallet, UnlockedWallet, Wallet, WalletProvider};

#[cfg(any(test, feature = "mock"))]
pub use chain::MockChainReader;
#[cfg(any(test, feature = "mock"))]
pub use gateway::MockRecorder;
#[cfg(any(test, feature = "mock"))]
pub use wallet::MockWalletProvider;
