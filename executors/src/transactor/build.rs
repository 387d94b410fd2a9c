use alloy::{
    consensus::{TxEip1559, TypedTransaction},
    network::TransactionBuilder,
    primitives::{Address, Bytes, TxKind, U256},
    rpc::types::TransactionRequest,
};
use collector_core::{chain::ChainClient, erc20, signer::KeyProvider};

use super::{SignedTransaction, Transactor, TxParams, error::TransactorError};

fn fee_to_u128(field: &str, value: U256) -> Result<u128, TransactorError> {
    u128::try_from(value).map_err(|_| TransactorError::TransactionBuildFailed {
        message: format!("{field} {value} does not fit in 128 bits"),
    })
}

impl<C: ChainClient> Transactor<C> {
    /// Signed ERC-20 `transfer` from `params.sender` to `params.receiver`.
    #[tracing::instrument(skip_all, fields(sender = %params.sender.address(), token = ?params.token))]
    pub async fn create_erc20_tx(
        &self,
        params: &TxParams<'_>,
    ) -> Result<SignedTransaction, TransactorError> {
        let token = params
            .token
            .ok_or_else(|| TransactorError::TransactionBuildFailed {
                message: "ERC-20 transfer requires a token address".to_string(),
            })?;

        let input = erc20::transfer_calldata(params.receiver, params.amount);
        self.build_and_sign(params, token, U256::ZERO, input).await
    }

    /// Signed native coin transfer of `params.amount` wei.
    #[tracing::instrument(skip_all, fields(sender = %params.sender.address(), receiver = %params.receiver))]
    pub async fn create_native_tx(
        &self,
        params: &TxParams<'_>,
    ) -> Result<SignedTransaction, TransactorError> {
        self.build_and_sign(params, params.receiver, params.amount, Bytes::new())
            .await
    }

    async fn build_and_sign(
        &self,
        params: &TxParams<'_>,
        to: Address,
        value: U256,
        input: Bytes,
    ) -> Result<SignedTransaction, TransactorError> {
        let sender = params.sender.address();

        let nonce = self
            .nonce_provider
            .next_nonce(self.chain.as_ref(), sender)
            .await
            .map_err(|e| TransactorError::NonceError {
                address: sender,
                message: e.to_string(),
                inner_error: e,
            })?;

        let estimate_request = TransactionRequest::default()
            .with_from(sender)
            .with_to(to)
            .with_value(value)
            .with_input(input.clone());

        let gas_limit = self
            .chain
            .estimate_gas(estimate_request)
            .await
            .map_err(TransactorError::from_estimation)?;

        let tx = TxEip1559 {
            chain_id: self.chain.chain_id(),
            nonce,
            gas_limit,
            max_fee_per_gas: fee_to_u128("max fee", params.fees.max_fee)?,
            max_priority_fee_per_gas: fee_to_u128("priority fee", params.fees.priority_fee)?,
            to: TxKind::Call(to),
            value,
            access_list: Default::default(),
            input,
        };

        tracing::debug!(
            nonce,
            gas_limit,
            max_fee = %params.fees.max_fee,
            priority_fee = %params.fees.priority_fee,
            %to,
            %value,
            "Built transaction"
        );

        self.sign(params.sender, TypedTransaction::Eip1559(tx)).await
    }

    async fn sign(
        &self,
        signer: &KeyProvider,
        transaction: TypedTransaction,
    ) -> Result<SignedTransaction, TransactorError> {
        signer
            .sign_transaction(transaction)
            .await
            .map_err(|e| TransactorError::SigningError {
                message: format!("Failed to sign transaction: {e}"),
                inner_error: e,
            })
    }
}
