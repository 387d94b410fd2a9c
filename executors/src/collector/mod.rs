use std::{future::Future, sync::Arc, time::Duration};

use alloy::{
    consensus::Transaction,
    primitives::{Address, B256, U256},
};
use collector_core::{chain::ChainClient, context::RunContext};
use collector_gas_station::{GasFeeOracle, GasFeeQuote};
use futures::{StreamExt, stream};
use uuid::Uuid;

use crate::transactor::{ConfirmationStatus, Transactor, TxParams};

pub mod error;
pub mod error_classifier;
pub mod types;

pub use error::CollectError;
pub use error_classifier::{BroadcastOutcome, classify_broadcast_error};
pub use types::{CollectionResult, CollectionStatus, DestinationAccount, SourceAccount};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Accounts processed at the same time. 1 runs them one after another.
    pub concurrency: usize,
    /// How long to wait for each receipt
    pub confirmation_timeout: Duration,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Sweeps ERC-20 balances from many source accounts into one destination,
/// topping up each source's gas from the destination first when needed.
pub struct Collector<C: ChainClient, O: GasFeeOracle> {
    transactor: Transactor<C>,
    oracle: Arc<O>,
    options: CollectorOptions,
}

async fn guarded<T, E, F>(
    ctx: &RunContext,
    future: F,
    wrap: impl FnOnce(E) -> CollectError,
) -> Result<T, CollectError>
where
    F: Future<Output = Result<T, E>>,
{
    match ctx.run(future).await {
        Ok(result) => result.map_err(wrap),
        Err(inner_error) => Err(CollectError::Interrupted { inner_error }),
    }
}

impl<C: ChainClient, O: GasFeeOracle> Collector<C, O> {
    pub fn new(transactor: Transactor<C>, oracle: Arc<O>, options: CollectorOptions) -> Self {
        Self {
            transactor,
            oracle,
            options,
        }
    }

    /// Processes every source and returns one result per source, in input order.
    #[tracing::instrument(skip_all, fields(
        collection_id = %Uuid::new_v4(),
        destination = %destination.address(),
        accounts = sources.len(),
    ))]
    pub async fn collect(
        &self,
        ctx: &RunContext,
        destination: &DestinationAccount,
        sources: Vec<SourceAccount>,
    ) -> Vec<CollectionResult> {
        let concurrency = self.options.concurrency.max(1);
        tracing::info!(concurrency, "Starting collection");

        let mut indexed: Vec<(usize, CollectionResult)> =
            stream::iter(sources.into_iter().enumerate())
                .map(|(index, account)| async move {
                    (index, self.collect_account(ctx, destination, account).await)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        indexed.sort_unstable_by_key(|(index, _)| *index);
        let results: Vec<CollectionResult> =
            indexed.into_iter().map(|(_, result)| result).collect();

        let count = |status: CollectionStatus| results.iter().filter(|r| r.status == status).count();
        tracing::info!(
            success = count(CollectionStatus::Success),
            pending = count(CollectionStatus::Pending),
            skip = count(CollectionStatus::Skip),
            fail = count(CollectionStatus::Fail),
            "Collection finished"
        );

        results
    }

    #[tracing::instrument(skip_all, fields(account = %account.address(), token = %account.token))]
    async fn collect_account(
        &self,
        ctx: &RunContext,
        destination: &DestinationAccount,
        account: SourceAccount,
    ) -> CollectionResult {
        match self.run_workflow(ctx, destination, &account).await {
            Ok((status, transaction_hash)) => {
                tracing::info!(%status, ?transaction_hash, "Account processed");
                CollectionResult::new(account, status).with_transaction_hash(transaction_hash)
            }
            Err(error) => {
                tracing::warn!(error = %error, "Account collection failed");
                let transaction_hash = error.transaction_hash();
                CollectionResult::new(account, CollectionStatus::Fail)
                    .with_transaction_hash(transaction_hash)
            }
        }
    }

    async fn run_workflow(
        &self,
        ctx: &RunContext,
        destination: &DestinationAccount,
        account: &SourceAccount,
    ) -> Result<(CollectionStatus, Option<B256>), CollectError> {
        let source = account.address();

        let balance = guarded(
            ctx,
            self.transactor.balance_of(source, account.token),
            |inner_error| CollectError::TokenBalance { inner_error },
        )
        .await?;

        if balance.is_zero() {
            tracing::debug!("Token balance is zero, nothing to collect");
            return Ok((CollectionStatus::Skip, None));
        }

        let amount = match account.fixed_amount() {
            None => balance,
            Some(raw) => {
                let amount = U256::from_str_radix(raw, 10).map_err(|_| {
                    CollectError::InvalidAmount {
                        amount: raw.to_string(),
                    }
                })?;
                if amount > balance {
                    return Err(CollectError::InsufficientTokenBalance { balance, amount });
                }
                amount
            }
        };

        let fees = guarded(ctx, self.oracle.quote(), |inner_error| {
            CollectError::GasQuote { inner_error }
        })
        .await?;

        let params = TxParams {
            token: Some(account.token),
            sender: &account.key_provider,
            receiver: destination.address(),
            amount,
            fees,
        };
        let transfer_tx = guarded(ctx, self.transactor.create_erc20_tx(&params), |inner_error| {
            CollectError::Build {
                purpose: "token transfer".to_string(),
                inner_error,
            }
        })
        .await?;

        let gas_limit = transfer_tx.tx().gas_limit();
        let estimated_fee = U256::from(gas_limit)
            .checked_mul(fees.max_fee)
            .and_then(|fee| fee.checked_add(fees.priority_fee))
            .ok_or(CollectError::FeeOverflow {
                gas_limit,
                max_fee: fees.max_fee,
            })?;

        let native_balance = guarded(ctx, self.transactor.balance_at(source), |inner_error| {
            CollectError::NativeBalance { inner_error }
        })
        .await?;

        if estimated_fee > native_balance {
            let shortfall = estimated_fee - native_balance;
            self.fund_gas(ctx, destination, source, shortfall, fees)
                .await?;
        } else {
            tracing::debug!(%estimated_fee, %native_balance, "Source can pay its own gas");
        }

        let local_hash = *transfer_tx.hash();
        let transaction_hash = match ctx.run(self.transactor.transfer(&transfer_tx)).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(error)) => {
                let outcome = classify_broadcast_error(&error);
                return match outcome {
                    BroadcastOutcome::Skip => {
                        tracing::info!(error = %error, "Transfer nonce already used");
                        Ok((outcome.status(), None))
                    }
                    BroadcastOutcome::Pending => {
                        tracing::info!(error = %error, transaction_hash = %local_hash, "Transfer already in mempool");
                        Ok((outcome.status(), Some(local_hash)))
                    }
                    BroadcastOutcome::Fail => {
                        Err(CollectError::TransferBroadcast { inner_error: error })
                    }
                };
            }
            Err(inner_error) => return Err(CollectError::Interrupted { inner_error }),
        };

        let confirm_ctx = ctx.with_timeout(self.options.confirmation_timeout);
        let confirmation = self
            .transactor
            .verify_tx(&confirm_ctx, transaction_hash)
            .await
            .map_err(CollectError::from_confirmation)?;

        match confirmation {
            ConfirmationStatus::Confirmed => Ok((CollectionStatus::Success, Some(transaction_hash))),
            ConfirmationStatus::NotMined => Ok((CollectionStatus::Pending, Some(transaction_hash))),
            ConfirmationStatus::Reverted => Err(CollectError::TransferReverted { transaction_hash }),
        }
    }

    /// Sends `shortfall` wei from the destination to `source` and waits for it to land.
    #[tracing::instrument(skip_all, fields(shortfall = %shortfall))]
    async fn fund_gas(
        &self,
        ctx: &RunContext,
        destination: &DestinationAccount,
        source: Address,
        shortfall: U256,
        fees: GasFeeQuote,
    ) -> Result<B256, CollectError> {
        let params = TxParams {
            token: None,
            sender: &destination.key_provider,
            receiver: source,
            amount: shortfall,
            fees,
        };

        let transaction_hash = guarded(
            ctx,
            async {
                // Nonce lookup through broadcast must not interleave with other funding txs.
                let _lane = self
                    .transactor
                    .nonce_provider()
                    .lane(destination.address())
                    .await;

                let funding_tx = self
                    .transactor
                    .create_native_tx(&params)
                    .await
                    .map_err(|inner_error| CollectError::Build {
                        purpose: "funding".to_string(),
                        inner_error,
                    })?;

                let hash = self
                    .transactor
                    .transfer(&funding_tx)
                    .await
                    .map_err(|inner_error| CollectError::FundingBroadcast { inner_error })?;
                Ok::<_, CollectError>(hash)
            },
            std::convert::identity,
        )
        .await?;

        tracing::info!(%transaction_hash, "Funding transaction sent");

        let confirm_ctx = ctx.with_timeout(self.options.confirmation_timeout);
        let confirmation = self
            .transactor
            .verify_tx(&confirm_ctx, transaction_hash)
            .await
            .map_err(CollectError::from_confirmation)?;

        match confirmation {
            ConfirmationStatus::Confirmed => Ok(transaction_hash),
            ConfirmationStatus::Reverted => Err(CollectError::FundingReverted { transaction_hash }),
            ConfirmationStatus::NotMined => Err(CollectError::FundingNotMined { transaction_hash }),
        }
    }
}
