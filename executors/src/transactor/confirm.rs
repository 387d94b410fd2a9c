use alloy::primitives::B256;
use collector_core::{chain::ChainClient, context::RunContext, error::CollectorError};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use super::{Transactor, error::TransactorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    /// Mined with a successful receipt
    Confirmed,
    /// Mined, execution failed
    Reverted,
    /// No receipt before the context deadline
    NotMined,
}

impl<C: ChainClient> Transactor<C> {
    /// Polls for the receipt of `transaction_hash` until it shows up or `ctx` runs out.
    ///
    /// The deadline of `ctx` elapsing is an outcome, not an error. Cancellation, or the
    /// deadline inherited from the caller's context passing, is an error.
    #[tracing::instrument(skip_all, fields(transaction_hash = %transaction_hash))]
    pub async fn verify_tx(
        &self,
        ctx: &RunContext,
        transaction_hash: B256,
    ) -> Result<ConfirmationStatus, TransactorError> {
        if ctx.deadline().is_none() {
            return Err(TransactorError::MissingDeadline);
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let polled = ctx
                .run(async {
                    ticker.tick().await;
                    self.chain.receipt_status(transaction_hash).await
                })
                .await;

            match polled {
                Ok(Ok(Some(true))) => {
                    tracing::debug!("Found successful receipt");
                    return Ok(ConfirmationStatus::Confirmed);
                }
                Ok(Ok(Some(false))) => {
                    tracing::warn!("Transaction reverted");
                    return Ok(ConfirmationStatus::Reverted);
                }
                Ok(Ok(None)) => {
                    tracing::trace!("No receipt yet");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Failed to get receipt, will retry");
                }
                Err(CollectorError::DeadlineExceeded) if !ctx.parent_deadline_passed() => {
                    tracing::warn!("No receipt before deadline");
                    return Ok(ConfirmationStatus::NotMined);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Receipt polling interrupted");
                    return Err(TransactorError::ConfirmationInterrupted {
                        transaction_hash,
                        inner_error: e,
                    });
                }
            }
        }
    }
}
