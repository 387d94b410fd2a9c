use std::fmt::Debug;

use alloy::{
    primitives::Address,
    transports::{
        RpcError as AlloyRpcError, TransportErrorKind,
        http::reqwest::header::{InvalidHeaderName, InvalidHeaderValue},
    },
};
use alloy_signer_aws::AwsSignerError;
use aws_sdk_kms::error::SdkError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::ChainClient;

#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcErrorKind {
    /// Server returned an error response.
    #[error("server returned an error response: {}", .0.as_display())]
    ErrorResp(RpcErrorResponse),

    /// Server returned a null response when a non-null response was expected.
    #[error("server returned a null response when a non-null response was expected")]
    NullResp,

    #[error("unsupported feature: {message}")]
    UnsupportedFeature { message: String },

    /// A local pre-processing step failed before the request was sent.
    #[error("local usage error: {message}")]
    InternalError { message: String },

    #[error("serialization error: {message}")]
    SerError { message: String },

    #[error("deserialization error: {message}, text: {text}")]
    DeserError { message: String, text: String },

    #[error("HTTP error {status}")]
    TransportHttpError { status: u16, body: String },

    #[error("Other transport error: {message}")]
    OtherTransportError { message: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcErrorResponse {
    /// The error code.
    pub code: i64,
    /// The error message (if any).
    pub message: String,
    /// The error data (if any).
    pub data: Option<String>,
}

impl RpcErrorResponse {
    pub fn as_display(&self) -> String {
        format!(
            "code {}: {}{}",
            self.code,
            self.message,
            self.data
                .as_ref()
                .map(|data| format!(", data: {data}"))
                .unwrap_or_default()
        )
    }
}

/// Failures talking to a token contract through `eth_call`
#[derive(Debug, Error, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractInteractionErrorKind {
    /// The contract returned no data.
    #[error(
        "contract call to `{function}` returned no data (\"0x\"); the called address might not be a contract"
    )]
    ZeroData { function: String },

    #[error("result decoding failed: {message}")]
    ResultDecodingFailed { message: String },

    #[error("calldata decoding failed: {message}")]
    CalldataDecodingFailed { message: String },
}

#[derive(Error, Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum CollectorError {
    #[error("RPC error on chain {chain_id} at {rpc_url}: {message}")]
    RpcError {
        chain_id: u64,
        rpc_url: String,
        message: String,
        kind: RpcErrorKind,
    },

    #[error("Bad RPC configuration: {message}")]
    RpcConfigError { message: String },

    #[error("Contract interaction error: {message}")]
    #[serde(rename_all = "camelCase")]
    ContractInteractionError {
        contract_address: Option<Address>,
        chain_id: u64,
        message: String,
        kind: ContractInteractionErrorKind,
    },

    #[error("Invalid key material: {message}")]
    KeyError { message: String },

    #[error("Signing error: {message}")]
    SigningError { message: String },

    #[error(transparent)]
    #[serde(rename_all = "camelCase")]
    AwsKmsSignerError {
        #[serde(flatten)]
        error: SerialisableAwsSignerError,
    },

    #[error("KMS {operation} failed: {error}")]
    #[serde(rename_all = "camelCase")]
    KmsError {
        operation: String,
        error: SerialisableAwsSdkError,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

#[derive(thiserror::Error, Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum SerialisableAwsSdkError {
    /// The request was never dispatched.
    #[error("Construction failure: {message}")]
    ConstructionFailure { message: String },

    /// The request MAY have been sent and received.
    #[error("Timeout error: {message}")]
    TimeoutError { message: String },

    #[error("Dispatch failure: {message}")]
    DispatchFailure { message: String },

    #[error("Response error: {message}")]
    ResponseError { message: String },

    /// KMS answered with an error body
    #[error("Service error: {message}")]
    ServiceError { message: String },

    #[error("Other error: {message}")]
    Other { message: String },
}

#[derive(Error, Debug, Serialize, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum SerialisableAwsSignerError {
    #[error(transparent)]
    Sign {
        aws_sdk_error: SerialisableAwsSdkError,
    },

    #[error(transparent)]
    GetPublicKey {
        aws_sdk_error: SerialisableAwsSdkError,
    },

    #[error("ECDSA error: {message}")]
    K256 { message: String },

    #[error("SPKI error: {message}")]
    Spki { message: String },

    #[error("Hex error: {message}")]
    Hex { message: String },

    #[error("signature not found in response")]
    SignatureNotFound,

    #[error("public key not found in response")]
    PublicKeyNotFound,

    #[error("Signature recovery failed")]
    SignatureRecoveryFailed,
}

impl<T: Debug> From<SdkError<T>> for SerialisableAwsSdkError {
    fn from(err: SdkError<T>) -> Self {
        let message = format!("{err:?}");
        match err {
            SdkError::ConstructionFailure(_) => Self::ConstructionFailure { message },
            SdkError::TimeoutError(_) => Self::TimeoutError { message },
            SdkError::DispatchFailure(_) => Self::DispatchFailure { message },
            SdkError::ResponseError(_) => Self::ResponseError { message },
            SdkError::ServiceError(_) => Self::ServiceError { message },
            _ => Self::Other { message },
        }
    }
}

impl From<AwsSignerError> for CollectorError {
    fn from(err: AwsSignerError) -> Self {
        let error = match err {
            AwsSignerError::Sign(err) => SerialisableAwsSignerError::Sign {
                aws_sdk_error: err.into(),
            },
            AwsSignerError::GetPublicKey(err) => SerialisableAwsSignerError::GetPublicKey {
                aws_sdk_error: err.into(),
            },
            AwsSignerError::K256(err) => SerialisableAwsSignerError::K256 {
                message: err.to_string(),
            },
            AwsSignerError::Spki(err) => SerialisableAwsSignerError::Spki {
                message: err.to_string(),
            },
            AwsSignerError::Hex(err) => SerialisableAwsSignerError::Hex {
                message: err.to_string(),
            },
            AwsSignerError::SignatureNotFound => SerialisableAwsSignerError::SignatureNotFound,
            AwsSignerError::PublicKeyNotFound => SerialisableAwsSignerError::PublicKeyNotFound,
            AwsSignerError::SignatureRecoveryFailed => {
                SerialisableAwsSignerError::SignatureRecoveryFailed
            }
        };
        CollectorError::AwsKmsSignerError { error }
    }
}

impl From<InvalidHeaderValue> for CollectorError {
    fn from(err: InvalidHeaderValue) -> Self {
        CollectorError::RpcConfigError {
            message: format!("invalid header value: {err}"),
        }
    }
}

impl From<InvalidHeaderName> for CollectorError {
    fn from(err: InvalidHeaderName) -> Self {
        CollectorError::RpcConfigError {
            message: format!("invalid header name: {err}"),
        }
    }
}

impl CollectorError {
    pub fn kms_error(operation: &str, error: impl Into<SerialisableAwsSdkError>) -> Self {
        CollectorError::KmsError {
            operation: operation.to_string(),
            error: error.into(),
        }
    }

    pub fn contract_decoding_error(
        contract_address: Option<Address>,
        chain_id: u64,
        message: String,
    ) -> Self {
        CollectorError::ContractInteractionError {
            contract_address,
            chain_id,
            message: message.clone(),
            kind: ContractInteractionErrorKind::ResultDecodingFailed { message },
        }
    }

    /// The JSON-RPC error response message, when the node rejected the request outright.
    pub fn rpc_error_message(&self) -> Option<&str> {
        match self {
            CollectorError::RpcError {
                kind: RpcErrorKind::ErrorResp(resp),
                ..
            } => Some(&resp.message),
            _ => None,
        }
    }
}

pub trait AlloyRpcErrorToCollectorError {
    fn to_collector_error(&self, chain: &impl ChainClient) -> CollectorError;
}

fn to_collector_rpc_error_kind(err: &AlloyRpcError<TransportErrorKind>) -> RpcErrorKind {
    match err {
        AlloyRpcError::ErrorResp(err) => RpcErrorKind::ErrorResp(RpcErrorResponse {
            code: err.code,
            message: err.message.to_string(),
            data: err.data.as_ref().map(|data| data.to_string()),
        }),
        AlloyRpcError::NullResp => RpcErrorKind::NullResp,
        AlloyRpcError::UnsupportedFeature(feature) => RpcErrorKind::UnsupportedFeature {
            message: feature.to_string(),
        },
        AlloyRpcError::LocalUsageError(err) => RpcErrorKind::InternalError {
            message: err.to_string(),
        },
        AlloyRpcError::SerError(err) => RpcErrorKind::SerError {
            message: err.to_string(),
        },
        AlloyRpcError::DeserError { err, text } => RpcErrorKind::DeserError {
            message: err.to_string(),
            text: text.to_string(),
        },
        AlloyRpcError::Transport(TransportErrorKind::HttpError(err)) => {
            RpcErrorKind::TransportHttpError {
                status: err.status,
                body: err.body.to_string(),
            }
        }
        AlloyRpcError::Transport(err) => RpcErrorKind::OtherTransportError {
            message: err.to_string(),
        },
    }
}

impl AlloyRpcErrorToCollectorError for AlloyRpcError<TransportErrorKind> {
    fn to_collector_error(&self, chain: &impl ChainClient) -> CollectorError {
        CollectorError::RpcError {
            chain_id: chain.chain_id(),
            rpc_url: chain.rpc_url().to_string(),
            message: self.to_string(),
            kind: to_collector_rpc_error_kind(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_error(message: &str) -> CollectorError {
        CollectorError::RpcError {
            chain_id: 1,
            rpc_url: "http://localhost:8545/".to_string(),
            message: format!("server returned an error response: {message}"),
            kind: RpcErrorKind::ErrorResp(RpcErrorResponse {
                code: -32000,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    #[test]
    fn rpc_error_message_only_for_error_responses() {
        assert_eq!(
            rpc_error("nonce too low").rpc_error_message(),
            Some("nonce too low")
        );

        let http = CollectorError::RpcError {
            chain_id: 1,
            rpc_url: "http://localhost:8545/".to_string(),
            message: "HTTP error 502".to_string(),
            kind: RpcErrorKind::TransportHttpError {
                status: 502,
                body: "bad gateway".to_string(),
            },
        };
        assert_eq!(http.rpc_error_message(), None);
    }

    #[test]
    fn serializes_with_screaming_tag() {
        let value = serde_json::to_value(rpc_error("already known")).unwrap();
        assert_eq!(value["type"], "RPC_ERROR");
        assert_eq!(value["kind"]["type"], "ERROR_RESP");

        let value = serde_json::to_value(CollectorError::Cancelled).unwrap();
        assert_eq!(value["type"], "CANCELLED");
    }

    #[test]
    fn error_response_display_includes_data() {
        let resp = RpcErrorResponse {
            code: 3,
            message: "execution reverted".to_string(),
            data: Some("0x08c379a0".to_string()),
        };
        assert_eq!(
            resp.as_display(),
            "code 3: execution reverted, data: 0x08c379a0"
        );
    }
}
