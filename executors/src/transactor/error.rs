use alloy::primitives::{Address, B256};
use collector_core::error::{CollectorError, RpcErrorKind};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, thiserror::Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "errorCode")]
pub enum TransactorError {
    #[error("Failed to resolve nonce for {address}: {message}")]
    NonceError {
        address: Address,
        message: String,
        inner_error: CollectorError,
    },

    #[error("Transaction simulation failed: {message}")]
    TransactionSimulationFailed {
        message: String,
        inner_error: CollectorError,
    },

    #[error("Gas estimation failed: {message}")]
    GasEstimationFailed {
        message: String,
        inner_error: CollectorError,
    },

    #[error("Transaction build failed: {message}")]
    TransactionBuildFailed { message: String },

    #[error("Transaction signing failed: {message}")]
    SigningError {
        message: String,
        inner_error: CollectorError,
    },

    #[error("Receipt polling requires a deadline on the context")]
    MissingDeadline,

    #[error("Confirmation of {transaction_hash} interrupted: {inner_error}")]
    ConfirmationInterrupted {
        transaction_hash: B256,
        inner_error: CollectorError,
    },
}

impl TransactorError {
    /// Classifies a failed `eth_estimateGas`. A revert means the transaction itself is broken.
    pub fn from_estimation(error: CollectorError) -> Self {
        if let CollectorError::RpcError {
            kind: RpcErrorKind::ErrorResp(resp),
            ..
        } = &error
        {
            if resp.message.to_lowercase().contains("revert") {
                return TransactorError::TransactionSimulationFailed {
                    message: format!(
                        "Transaction reverted during gas estimation: {}",
                        resp.as_display()
                    ),
                    inner_error: error,
                };
            }
        }

        TransactorError::GasEstimationFailed {
            message: error.to_string(),
            inner_error: error,
        }
    }
}
