use std::{future::Future, time::Duration};

use tokio::{sync::watch, time::Instant};

use crate::error::CollectorError;

/// Cancels every [`RunContext`] derived from the pair it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Cancellation signal plus an optional deadline, threaded through every
/// network call of a collection run.
///
/// Children created with [`RunContext::with_timeout`] share the parent's
/// cancellation signal and never outlive the parent's deadline.
#[derive(Debug, Clone)]
pub struct RunContext {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
    /// Effective deadline of the context this one was derived from
    parent_deadline: Option<Instant>,
}

impl RunContext {
    pub fn new() -> (Self, CancelHandle) {
        let (sender, cancelled) = watch::channel(false);
        (
            Self {
                cancelled,
                deadline: None,
                parent_deadline: None,
            },
            CancelHandle { sender },
        )
    }

    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        let (sender, cancelled) = watch::channel(false);
        drop(sender);
        Self {
            cancelled,
            deadline: None,
            parent_deadline: None,
        }
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            cancelled: self.cancelled.clone(),
            deadline: Some(deadline),
            parent_deadline: self.deadline,
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once the deadline inherited from the parent has passed. A child's own
    /// timeout running out leaves this false.
    pub fn parent_deadline_passed(&self) -> bool {
        self.parent_deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the cancel handle fires. Pends forever if the handle was dropped unfired.
    pub async fn cancelled(&self) {
        let mut receiver = self.cancelled.clone();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    async fn deadline_elapsed(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// Drives `future` until it completes, the context is cancelled or the deadline passes.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, CollectorError> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CollectorError::Cancelled),
            _ = self.deadline_elapsed() => Err(CollectorError::DeadlineExceeded),
            output = future => Ok(output),
        }
    }
}
