use std::fmt;

use alloy::primitives::{Address, B256};
use collector_core::signer::KeyProvider;
use serde::{Deserialize, Serialize};

/// An account whose token balance should be swept to the destination.
#[derive(Debug, Clone)]
pub struct SourceAccount {
    pub key_provider: KeyProvider,
    pub token: Address,
    /// Base-10 amount in token base units. `None` or empty collects the whole balance.
    pub amount: Option<String>,
}

impl SourceAccount {
    pub fn address(&self) -> Address {
        self.key_provider.address()
    }

    /// The configured amount, with empty strings treated as "everything".
    pub fn fixed_amount(&self) -> Option<&str> {
        self.amount
            .as_deref()
            .map(str::trim)
            .filter(|amount| !amount.is_empty())
    }
}

/// Receives the tokens and pays for the sources' gas.
#[derive(Debug, Clone)]
pub struct DestinationAccount {
    pub key_provider: KeyProvider,
}

impl DestinationAccount {
    pub fn address(&self) -> Address {
        self.key_provider.address()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Success,
    Fail,
    Pending,
    Skip,
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CollectionStatus::Success => "SUCCESS",
            CollectionStatus::Fail => "FAIL",
            CollectionStatus::Pending => "PENDING",
            CollectionStatus::Skip => "SKIP",
        };
        f.write_str(label)
    }
}

/// Outcome for one source account
#[derive(Debug, Clone)]
pub struct CollectionResult {
    pub account: SourceAccount,
    pub status: CollectionStatus,
    pub transaction_hash: Option<B256>,
}

impl CollectionResult {
    pub fn new(account: SourceAccount, status: CollectionStatus) -> Self {
        Self {
            account,
            status,
            transaction_hash: None,
        }
    }

    pub fn with_transaction_hash(mut self, transaction_hash: Option<B256>) -> Self {
        self.transaction_hash = transaction_hash;
        self
    }
}
