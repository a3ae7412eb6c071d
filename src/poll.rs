use crate::client::Kandinsky;
use crate::error::{KandinskyError, Result};
use crate::image::Image;
use crate::transport::Transport;
use crate::types::{TaskHandle, TaskState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

/// Cloneable flag that stops a running poll loop.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Controls how long and how often a task is polled.
///
/// Without a timeout or cancel token the loop polls until the task reaches a
/// terminal state or a request fails.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
            cancel: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub(crate) struct Poller {
    interval: Duration,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
    pub(crate) attempts: u32,
}

impl Poller {
    pub(crate) fn new(options: &PollOptions) -> Self {
        Self {
            interval: options.interval,
            // A timeout past the clock's range means no deadline.
            deadline: options.timeout.and_then(|t| Instant::now().checked_add(t)),
            cancel: options.cancel.clone(),
            attempts: 0,
        }
    }

    /// Checks cancellation and the deadline before the next status request.
    pub(crate) fn ready(&mut self) -> Result<()> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(KandinskyError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(KandinskyError::DeadlineExceeded);
        }
        self.attempts += 1;
        Ok(())
    }

    /// Waits one interval, cut short by the deadline or cancellation.
    pub(crate) async fn wait(&self) -> Result<()> {
        let wait = match self.deadline {
            Some(deadline) => self
                .interval
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.interval,
        };

        match &self.cancel {
            Some(token) => tokio::select! {
                _ = sleep(wait) => Ok(()),
                _ = token.cancelled() => Err(KandinskyError::Cancelled),
            },
            None => {
                sleep(wait).await;
                Ok(())
            }
        }
    }
}

impl<T: Transport> Kandinsky<T> {
    /// Default poll settings: the configured interval, no timeout.
    pub fn poll_options(&self) -> PollOptions {
        PollOptions::new(self.poll_interval)
    }

    /// Polls the task until it is `DONE` or `FAIL`, using the default poll
    /// settings.
    pub async fn await_completion(&self, handle: &TaskHandle) -> Result<Image> {
        self.await_completion_with(handle, &self.poll_options())
            .await
    }

    /// Polls the task until it reaches a terminal state.
    ///
    /// Protocol and transport errors abort immediately; they are never
    /// retried. A `FAIL` status yields [`KandinskyError::TaskNotCompleted`].
    pub async fn await_completion_with(
        &self,
        handle: &TaskHandle,
        options: &PollOptions,
    ) -> Result<Image> {
        if handle.uuid.trim().is_empty() {
            return Err(KandinskyError::EmptyTaskId);
        }

        let mut poller = Poller::new(options);
        loop {
            poller.ready()?;
            let image = self.task_status(&handle.uuid).await?;
            match image.state() {
                TaskState::Done => {
                    log::info!(
                        "Task {} done after {} checks",
                        handle.uuid,
                        poller.attempts
                    );
                    return Ok(image);
                }
                TaskState::Failed => {
                    return Err(KandinskyError::TaskNotCompleted {
                        uuid: handle.uuid.clone(),
                    })
                }
                TaskState::Pending => log::debug!(
                    "Task {} is {} (check {}), retrying in {:?}",
                    handle.uuid,
                    image.status,
                    poller.attempts,
                    options.interval
                ),
            }
            poller.wait().await?;
        }
    }
}
