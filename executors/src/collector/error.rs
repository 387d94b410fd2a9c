use alloy::primitives::{B256, U256};
use collector_core::error::CollectorError;
use collector_gas_station::GasStationError;
use serde::{Deserialize, Serialize};

use crate::transactor::TransactorError;

/// Why an account ended up as `FAIL`.
#[derive(Serialize, Deserialize, Debug, Clone, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "errorCode")]
pub enum CollectError {
    #[error("Failed to read token balance: {inner_error}")]
    TokenBalance { inner_error: CollectorError },

    #[error("Invalid amount {amount:?}: expected a base-10 unsigned integer")]
    InvalidAmount { amount: String },

    #[error("Token balance {balance} is below the requested amount {amount}")]
    InsufficientTokenBalance { balance: U256, amount: U256 },

    #[error("Failed to get a gas fee quote: {inner_error}")]
    GasQuote { inner_error: GasStationError },

    #[error("Failed to read native balance: {inner_error}")]
    NativeBalance { inner_error: CollectorError },

    #[error("Failed to build {purpose} transaction: {inner_error}")]
    Build {
        purpose: String,
        inner_error: TransactorError,
    },

    #[error("Funding transaction broadcast failed: {inner_error}")]
    FundingBroadcast { inner_error: CollectorError },

    #[error("Funding transaction {transaction_hash} reverted")]
    FundingReverted { transaction_hash: B256 },

    #[error("Funding transaction {transaction_hash} was not mined in time")]
    FundingNotMined { transaction_hash: B256 },

    #[error("Token transfer {transaction_hash} reverted")]
    TransferReverted { transaction_hash: B256 },

    #[error("Confirmation failed: {inner_error}")]
    Confirmation { inner_error: TransactorError },

    #[error("Token transfer broadcast failed: {inner_error}")]
    TransferBroadcast { inner_error: CollectorError },

    #[error("Estimated fee overflows: gas limit {gas_limit} at max fee {max_fee}")]
    FeeOverflow { gas_limit: u64, max_fee: U256 },

    #[error("Collection interrupted: {inner_error}")]
    Interrupted { inner_error: CollectorError },
}

impl CollectError {
    /// Polling cut short by the run's cancellation or deadline is an interruption.
    pub fn from_confirmation(error: TransactorError) -> Self {
        match error {
            TransactorError::ConfirmationInterrupted { inner_error, .. } => {
                CollectError::Interrupted { inner_error }
            }
            inner_error => CollectError::Confirmation { inner_error },
        }
    }

    /// Hash worth reporting alongside a failure, if one was mined.
    pub fn transaction_hash(&self) -> Option<B256> {
        match self {
            CollectError::TransferReverted { transaction_hash } => Some(*transaction_hash),
            _ => None,
        }
    }
}
