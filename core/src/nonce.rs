use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{chain::ChainClient, error::CollectorError};

/// Where transaction nonces come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NonceSource {
    /// Every transaction uses the same configured nonce
    Fixed {
        #[serde(default)]
        nonce: u64,
    },
    /// Pending transaction count of the sender, read from the node
    #[default]
    Network,
}

/// Held while an address's nonce is read and its transaction broadcast.
#[derive(Debug)]
pub struct NonceLane {
    address: Address,
    _guard: OwnedMutexGuard<()>,
}

impl NonceLane {
    pub fn address(&self) -> Address {
        self.address
    }
}

#[derive(Debug, Default)]
pub struct NonceProvider {
    source: NonceSource,
    lanes: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl NonceProvider {
    pub fn new(source: NonceSource) -> Self {
        Self {
            source,
            lanes: Mutex::new(HashMap::new()),
        }
    }

    pub async fn next_nonce(
        &self,
        chain: &impl ChainClient,
        address: Address,
    ) -> Result<u64, CollectorError> {
        match &self.source {
            NonceSource::Fixed { nonce } => Ok(*nonce),
            NonceSource::Network => chain.transaction_count(address).await,
        }
    }

    /// Waits for exclusive use of `address`'s nonce sequence.
    pub async fn lane(&self, address: Address) -> NonceLane {
        let lane = {
            let mut lanes = self.lanes.lock().await;
            lanes.entry(address).or_default().clone()
        };

        NonceLane {
            address,
            _guard: lane.lock_owned().await,
        }
    }
}
