#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy::consensus::{Signed, Transaction, TypedTransaction};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::reqwest::Url;

use collector_core::chain::ChainClient;
use collector_core::error::{CollectorError, RpcErrorKind, RpcErrorResponse};
use collector_core::nonce::{NonceProvider, NonceSource};
use collector_core::signer::KeyProvider;
use collector_executors::transactor::Transactor;
use collector_executors::{Collector, CollectorOptions, DestinationAccount, SourceAccount};
use collector_gas_station::{GasFeeOracle, GasFeeQuote, GasStationError};

pub const CHAIN_ID: u64 = 80002;
pub const TOKEN_GAS: u64 = 65_000;
pub const NATIVE_GAS: u64 = 21_000;

// Setup tracing for tests
pub fn setup_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "collector_executors=debug,collector_core=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Deterministic local key: the scalar `seed` as a 32-byte hex string.
pub fn key(seed: u64) -> KeyProvider {
    KeyProvider::from_private_key(&format!("{seed:064x}"), CHAIN_ID).unwrap()
}

pub fn token() -> Address {
    Address::repeat_byte(0x7e)
}

pub fn destination() -> DestinationAccount {
    DestinationAccount {
        key_provider: key(1_000_000),
    }
}

pub fn source(seed: u64, amount: Option<&str>) -> SourceAccount {
    SourceAccount {
        key_provider: key(seed),
        token: token(),
        amount: amount.map(str::to_string),
    }
}

pub fn quote() -> GasFeeQuote {
    GasFeeQuote {
        priority_fee: U256::from(30_000_000_000u64),
        max_fee: U256::from(30_000_000_150u64),
    }
}

/// What the token transfer is expected to cost under [`quote`].
pub fn estimated_token_fee() -> U256 {
    U256::from(TOKEN_GAS) * quote().max_fee + quote().priority_fee
}

pub fn rpc_rejection(message: &str) -> CollectorError {
    CollectorError::RpcError {
        chain_id: CHAIN_ID,
        rpc_url: "http://mock.local/".to_string(),
        message: format!("server returned an error response: error code -32000: {message}"),
        kind: RpcErrorKind::ErrorResp(RpcErrorResponse {
            code: -32000,
            message: message.to_string(),
            data: None,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptScript {
    Success,
    Reverted,
    Never,
}

#[derive(Debug, Clone)]
pub struct Broadcast {
    pub hash: B256,
    pub nonce: u64,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl Broadcast {
    pub fn is_funding(&self) -> bool {
        self.input.is_empty()
    }
}

/// In-memory chain. Token transfers carry calldata, funding transfers do not,
/// which is how the scripts below tell them apart.
pub struct MockChain {
    token_balances: Mutex<HashMap<Address, U256>>,
    native_balances: Mutex<HashMap<Address, U256>>,
    failing_token_balances: Mutex<Vec<Address>>,
    transaction_counts: Mutex<HashMap<Address, u64>>,
    funder: Mutex<Option<Address>>,
    transfer_rejection: Mutex<Option<String>>,
    funding_rejection: Mutex<Option<String>>,
    estimate_rejection: Mutex<Option<String>>,
    funding_receipt: Mutex<ReceiptScript>,
    transfer_receipt: Mutex<ReceiptScript>,
    kinds: Mutex<HashMap<B256, bool>>,
    broadcasts: Mutex<Vec<Broadcast>>,
    pub receipt_lookups: AtomicUsize,
    pub failing_receipt_lookups: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            token_balances: Mutex::new(HashMap::new()),
            native_balances: Mutex::new(HashMap::new()),
            failing_token_balances: Mutex::new(Vec::new()),
            transaction_counts: Mutex::new(HashMap::new()),
            funder: Mutex::new(None),
            transfer_rejection: Mutex::new(None),
            funding_rejection: Mutex::new(None),
            estimate_rejection: Mutex::new(None),
            funding_receipt: Mutex::new(ReceiptScript::Success),
            transfer_receipt: Mutex::new(ReceiptScript::Success),
            kinds: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            receipt_lookups: AtomicUsize::new(0),
            failing_receipt_lookups: AtomicUsize::new(0),
        }
    }

    pub fn set_token_balance(&self, owner: Address, balance: U256) {
        self.token_balances.lock().unwrap().insert(owner, balance);
    }

    pub fn set_native_balance(&self, owner: Address, balance: U256) {
        self.native_balances.lock().unwrap().insert(owner, balance);
    }

    pub fn fail_token_balance(&self, owner: Address) {
        self.failing_token_balances.lock().unwrap().push(owner);
    }

    pub fn set_transaction_count(&self, address: Address, count: u64) {
        self.transaction_counts.lock().unwrap().insert(address, count);
    }

    /// Funding broadcasts bump this address's pending transaction count.
    pub fn set_funder(&self, address: Address) {
        *self.funder.lock().unwrap() = Some(address);
    }

    pub fn reject_transfers(&self, message: &str) {
        *self.transfer_rejection.lock().unwrap() = Some(message.to_string());
    }

    pub fn reject_funding(&self, message: &str) {
        *self.funding_rejection.lock().unwrap() = Some(message.to_string());
    }

    pub fn reject_estimates(&self, message: &str) {
        *self.estimate_rejection.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_funding_receipt(&self, script: ReceiptScript) {
        *self.funding_receipt.lock().unwrap() = script;
    }

    pub fn set_transfer_receipt(&self, script: ReceiptScript) {
        *self.transfer_receipt.lock().unwrap() = script;
    }

    /// Make the next `count` receipt lookups fail with a transport error.
    pub fn fail_receipt_lookups(&self, count: usize) {
        self.failing_receipt_lookups.store(count, Ordering::SeqCst);
    }

    pub fn broadcasts(&self) -> Vec<Broadcast> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn funding_broadcasts(&self) -> Vec<Broadcast> {
        self.broadcasts()
            .into_iter()
            .filter(Broadcast::is_funding)
            .collect()
    }

    pub fn transfer_broadcasts(&self) -> Vec<Broadcast> {
        self.broadcasts()
            .into_iter()
            .filter(|b| !b.is_funding())
            .collect()
    }
}

impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        CHAIN_ID
    }

    fn rpc_url(&self) -> Url {
        Url::parse("http://mock.local/").unwrap()
    }

    async fn native_balance(&self, address: Address) -> Result<U256, CollectorError> {
        Ok(self
            .native_balances
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn token_balance(&self, _token: Address, owner: Address) -> Result<U256, CollectorError> {
        if self.failing_token_balances.lock().unwrap().contains(&owner) {
            return Err(CollectorError::RpcError {
                chain_id: CHAIN_ID,
                rpc_url: "http://mock.local/".to_string(),
                message: "HTTP error 502".to_string(),
                kind: RpcErrorKind::TransportHttpError {
                    status: 502,
                    body: "bad gateway".to_string(),
                },
            });
        }
        Ok(self
            .token_balances
            .lock()
            .unwrap()
            .get(&owner)
            .copied()
            .unwrap_or_default())
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, CollectorError> {
        if let Some(message) = self.estimate_rejection.lock().unwrap().clone() {
            return Err(rpc_rejection(&message));
        }
        let has_calldata = request
            .input
            .input()
            .map(|input| !input.is_empty())
            .unwrap_or(false);
        Ok(if has_calldata { TOKEN_GAS } else { NATIVE_GAS })
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, CollectorError> {
        Ok(self
            .transaction_counts
            .lock()
            .unwrap()
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn send_transaction(
        &self,
        transaction: Signed<TypedTransaction>,
    ) -> Result<B256, CollectorError> {
        let tx = transaction.tx();
        let record = Broadcast {
            hash: *transaction.hash(),
            nonce: tx.nonce(),
            to: tx.to().unwrap_or_default(),
            value: tx.value(),
            input: tx.input().clone(),
            gas_limit: tx.gas_limit(),
            max_fee_per_gas: tx.max_fee_per_gas(),
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas().unwrap_or_default(),
        };

        let rejection = if record.is_funding() {
            self.funding_rejection.lock().unwrap().clone()
        } else {
            self.transfer_rejection.lock().unwrap().clone()
        };
        if let Some(message) = rejection {
            return Err(rpc_rejection(&message));
        }

        if record.is_funding() {
            if let Some(funder) = *self.funder.lock().unwrap() {
                *self
                    .transaction_counts
                    .lock()
                    .unwrap()
                    .entry(funder)
                    .or_default() += 1;
            }
            let mut balances = self.native_balances.lock().unwrap();
            *balances.entry(record.to).or_default() += record.value;
        }

        self.kinds
            .lock()
            .unwrap()
            .insert(record.hash, record.is_funding());
        let hash = record.hash;
        self.broadcasts.lock().unwrap().push(record);
        Ok(hash)
    }

    async fn receipt_status(&self, transaction_hash: B256) -> Result<Option<bool>, CollectorError> {
        self.receipt_lookups.fetch_add(1, Ordering::SeqCst);

        let remaining_failures = self.failing_receipt_lookups.load(Ordering::SeqCst);
        if remaining_failures > 0 {
            self.failing_receipt_lookups
                .store(remaining_failures - 1, Ordering::SeqCst);
            return Err(rpc_rejection("header not found"));
        }

        let Some(is_funding) = self.kinds.lock().unwrap().get(&transaction_hash).copied() else {
            return Ok(None);
        };
        let script = if is_funding {
            *self.funding_receipt.lock().unwrap()
        } else {
            *self.transfer_receipt.lock().unwrap()
        };
        Ok(match script {
            ReceiptScript::Success => Some(true),
            ReceiptScript::Reverted => Some(false),
            ReceiptScript::Never => None,
        })
    }
}

pub struct FixedOracle {
    quote: Result<GasFeeQuote, GasStationError>,
    pub calls: AtomicUsize,
}

impl FixedOracle {
    pub fn new(quote: GasFeeQuote) -> Self {
        Self {
            quote: Ok(quote),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            quote: Err(GasStationError::HttpClientBackendError {
                message: "gas station unreachable".to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }
}

impl GasFeeOracle for FixedOracle {
    async fn quote(&self) -> Result<GasFeeQuote, GasStationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quote.clone()
    }
}

pub fn transactor(chain: Arc<MockChain>, nonce: NonceSource) -> Transactor<MockChain> {
    Transactor::new(chain, Arc::new(NonceProvider::new(nonce)))
}

pub fn collector(
    chain: Arc<MockChain>,
    oracle: FixedOracle,
    concurrency: usize,
) -> Collector<MockChain, FixedOracle> {
    Collector::new(
        transactor(chain, NonceSource::Network),
        Arc::new(oracle),
        CollectorOptions {
            concurrency,
            ..Default::default()
        },
    )
}
