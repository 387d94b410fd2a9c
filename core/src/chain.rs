use std::{collections::HashMap, future::Future};

use alloy::{
    consensus::{Signed, TypedTransaction},
    network::TransactionBuilder,
    primitives::{Address, B256, U256},
    providers::{Provider, RootProvider},
    rpc::{client::RpcClient, types::TransactionRequest},
    sol_types::SolCall,
    transports::http::reqwest::{
        self, Url,
        header::{HeaderMap, HeaderName, HeaderValue},
    },
};

use crate::{
    erc20::IERC20,
    error::{AlloyRpcErrorToCollectorError, CollectorError, ContractInteractionErrorKind},
    rpc_clients::SharedClientTransportBuilder,
};

/// Read and write access to one EVM chain.
///
/// Everything the collector needs from a node goes through this trait, so an
/// in-memory implementation can stand in for a real RPC endpoint.
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;
    fn rpc_url(&self) -> Url;

    fn native_balance(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<U256, CollectorError>> + Send;

    /// ERC-20 `balanceOf(owner)` on `token`
    fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256, CollectorError>> + Send;

    fn estimate_gas(
        &self,
        request: TransactionRequest,
    ) -> impl Future<Output = Result<u64, CollectorError>> + Send;

    /// Number of transactions sent from `address`, including ones still in the mempool
    fn transaction_count(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<u64, CollectorError>> + Send;

    fn send_transaction(
        &self,
        transaction: Signed<TypedTransaction>,
    ) -> impl Future<Output = Result<B256, CollectorError>> + Send;

    /// `None` while the transaction has no receipt, otherwise its execution status
    fn receipt_status(
        &self,
        transaction_hash: B256,
    ) -> impl Future<Output = Result<Option<bool>, CollectorError>> + Send;
}

pub struct EvmChainConfig<'a> {
    pub rpc_url: &'a str,
    pub headers: &'a HashMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct EvmChain {
    chain_id: u64,
    rpc_url: Url,
    pub provider: RootProvider,
}

impl EvmChainConfig<'_> {
    /// Builds the provider on the shared HTTP client and reads the chain id once.
    pub async fn connect(&self, http_client: reqwest::Client) -> Result<EvmChain, CollectorError> {
        let rpc_url = Url::parse(self.rpc_url).map_err(|e| CollectorError::RpcConfigError {
            message: format!("Failed to parse RPC URL {:?}: {e}", self.rpc_url),
        })?;

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }

        let transport =
            SharedClientTransportBuilder::new(http_client).with_headers(rpc_url.clone(), headers);
        let rpc_client = RpcClient::builder().transport(transport, false);
        let provider = RootProvider::new(rpc_client);

        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| CollectorError::RpcConfigError {
                message: format!("Failed to read chain id from {rpc_url}: {e}"),
            })?;

        tracing::info!(chain_id, rpc_url = %rpc_url, "Connected to chain");

        Ok(EvmChain {
            chain_id,
            rpc_url,
            provider,
        })
    }
}

impl ChainClient for EvmChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn rpc_url(&self) -> Url {
        self.rpc_url.clone()
    }

    async fn native_balance(&self, address: Address) -> Result<U256, CollectorError> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| e.to_collector_error(self))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, CollectorError> {
        let call = IERC20::balanceOfCall { account: owner };
        let request = TransactionRequest::default()
            .with_to(token)
            .with_input(call.abi_encode());

        let output = self
            .provider
            .call(request)
            .await
            .map_err(|e| e.to_collector_error(self))?;

        if output.is_empty() {
            return Err(CollectorError::ContractInteractionError {
                contract_address: Some(token),
                chain_id: self.chain_id,
                message: format!("balanceOf on {token} returned no data"),
                kind: ContractInteractionErrorKind::ZeroData {
                    function: "balanceOf".to_string(),
                },
            });
        }

        IERC20::balanceOfCall::abi_decode_returns(&output).map_err(|e| {
            CollectorError::contract_decoding_error(
                Some(token),
                self.chain_id,
                format!("Failed to decode balanceOf result: {e}"),
            )
        })
    }

    async fn estimate_gas(&self, request: TransactionRequest) -> Result<u64, CollectorError> {
        self.provider
            .estimate_gas(request)
            .await
            .map_err(|e| e.to_collector_error(self))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, CollectorError> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| e.to_collector_error(self))
    }

    async fn send_transaction(
        &self,
        transaction: Signed<TypedTransaction>,
    ) -> Result<B256, CollectorError> {
        let pending = self
            .provider
            .send_tx_envelope(transaction.into())
            .await
            .map_err(|e| e.to_collector_error(self))?;

        Ok(*pending.tx_hash())
    }

    async fn receipt_status(&self, transaction_hash: B256) -> Result<Option<bool>, CollectorError> {
        let receipt = self
            .provider
            .get_transaction_receipt(transaction_hash)
            .await
            .map_err(|e| e.to_collector_error(self))?;

        Ok(receipt.map(|receipt| receipt.status()))
    }
}
