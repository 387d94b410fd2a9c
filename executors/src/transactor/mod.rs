use std::{sync::Arc, time::Duration};

use alloy::{
    consensus::{Signed, TypedTransaction},
    primitives::{Address, B256, U256},
};
use collector_core::{
    chain::ChainClient, error::CollectorError, nonce::NonceProvider, signer::KeyProvider,
};
use collector_gas_station::GasFeeQuote;

pub mod build;
pub mod confirm;
pub mod error;

pub use confirm::ConfirmationStatus;
pub use error::TransactorError;

pub type SignedTransaction = Signed<TypedTransaction>;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Inputs for one outgoing transaction
#[derive(Debug, Clone)]
pub struct TxParams<'a> {
    /// ERC-20 contract; `None` for a native coin transfer
    pub token: Option<Address>,
    pub sender: &'a KeyProvider,
    pub receiver: Address,
    /// Base units of the token, or wei for native transfers
    pub amount: U256,
    pub fees: GasFeeQuote,
}

/// Builds, broadcasts and confirms transactions on a single chain.
pub struct Transactor<C: ChainClient> {
    chain: Arc<C>,
    nonce_provider: Arc<NonceProvider>,
    poll_interval: Duration,
}

impl<C: ChainClient> Transactor<C> {
    pub fn new(chain: Arc<C>, nonce_provider: Arc<NonceProvider>) -> Self {
        Self {
            chain,
            nonce_provider,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn nonce_provider(&self) -> &NonceProvider {
        &self.nonce_provider
    }

    /// Submits a signed transaction. Node errors come back untouched so callers can classify them.
    pub async fn transfer(&self, transaction: &SignedTransaction) -> Result<B256, CollectorError> {
        let hash = self.chain.send_transaction(transaction.clone()).await?;
        tracing::debug!(transaction_hash = %hash, "Transaction broadcast");
        Ok(hash)
    }

    pub async fn balance_at(&self, address: Address) -> Result<U256, CollectorError> {
        self.chain.native_balance(address).await
    }

    pub async fn balance_of(&self, address: Address, token: Address) -> Result<U256, CollectorError> {
        self.chain.token_balance(token, address).await
    }
}
