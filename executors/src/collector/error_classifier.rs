use collector_core::error::CollectorError;

use super::types::CollectionStatus;

/// What a rejected token transfer broadcast means for the account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The nonce was already used; another run moved these tokens.
    Skip,
    /// An equivalent transaction is already in the mempool.
    Pending,
    Fail,
}

impl BroadcastOutcome {
    pub fn status(self) -> CollectionStatus {
        match self {
            BroadcastOutcome::Skip => CollectionStatus::Skip,
            BroadcastOutcome::Pending => CollectionStatus::Pending,
            BroadcastOutcome::Fail => CollectionStatus::Fail,
        }
    }
}

/// Maps a node's error response message to an outcome. Unknown messages fail.
pub fn classify_broadcast_message(message: &str) -> BroadcastOutcome {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("nonce too low") {
        BroadcastOutcome::Skip
    } else if msg_lower.contains("already known")
        || msg_lower.contains("replacement transaction underpriced")
    {
        BroadcastOutcome::Pending
    } else {
        BroadcastOutcome::Fail
    }
}

/// Only JSON-RPC error responses are classified; transport failures always fail.
pub fn classify_broadcast_error(error: &CollectorError) -> BroadcastOutcome {
    match error.rpc_error_message() {
        Some(message) => classify_broadcast_message(message),
        None => BroadcastOutcome::Fail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_core::error::{RpcErrorKind, RpcErrorResponse};

    fn node_rejection(message: &str) -> CollectorError {
        CollectorError::RpcError {
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com/".to_string(),
            message: format!("server returned an error response: error code -32000: {message}"),
            kind: RpcErrorKind::ErrorResp(RpcErrorResponse {
                code: -32000,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    #[test]
    fn nonce_too_low_skips() {
        assert_eq!(
            classify_broadcast_error(&node_rejection("nonce too low: next nonce 5, tx nonce 4")),
            BroadcastOutcome::Skip
        );
        assert_eq!(
            classify_broadcast_message("Nonce too low"),
            BroadcastOutcome::Skip
        );
    }

    #[test]
    fn mempool_races_are_pending() {
        assert_eq!(
            classify_broadcast_error(&node_rejection("already known")),
            BroadcastOutcome::Pending
        );
        assert_eq!(
            classify_broadcast_error(&node_rejection("replacement transaction underpriced")),
            BroadcastOutcome::Pending
        );
    }

    #[test]
    fn everything_else_fails() {
        assert_eq!(
            classify_broadcast_error(&node_rejection("insufficient funds for gas * price + value")),
            BroadcastOutcome::Fail
        );
        assert_eq!(
            classify_broadcast_error(&CollectorError::Cancelled),
            BroadcastOutcome::Fail
        );

        let http = CollectorError::RpcError {
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com/".to_string(),
            message: "HTTP error 429 with body: too many requests".to_string(),
            kind: RpcErrorKind::TransportHttpError {
                status: 429,
                body: "too many requests".to_string(),
            },
        };
        assert_eq!(classify_broadcast_error(&http), BroadcastOutcome::Fail);
    }

    #[test]
    fn transport_bodies_are_not_classified() {
        let gateway = CollectorError::RpcError {
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com/".to_string(),
            message: "HTTP error 502 with body: upstream said already known".to_string(),
            kind: RpcErrorKind::TransportHttpError {
                status: 502,
                body: "upstream said already known".to_string(),
            },
        };
        assert_eq!(classify_broadcast_error(&gateway), BroadcastOutcome::Fail);

        let other = CollectorError::RpcError {
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com/".to_string(),
            message: "nonce too low".to_string(),
            kind: RpcErrorKind::OtherTransportError {
                message: "nonce too low".to_string(),
            },
        };
        assert_eq!(classify_broadcast_error(&other), BroadcastOutcome::Fail);
    }

    #[test]
    fn maps_to_collection_status() {
        assert_eq!(BroadcastOutcome::Skip.status(), CollectionStatus::Skip);
        assert_eq!(BroadcastOutcome::Pending.status(), CollectionStatus::Pending);
        assert_eq!(BroadcastOutcome::Fail.status(), CollectionStatus::Fail);
    }
}
