//! Background Task Queue
//!
//! Work that must not hold up a response (emails, token cleanup, session
//! invalidation) goes through a bounded queue drained by a single worker.
//!
//! - `TaskQueue::dispatch` never waits: a full or closed queue drops the task,
//!   logs it and bumps `background_tasks_dropped_total`.
//! - Every task runs under its own timeout, detached from the request that
//!   queued it.
//! - `WorkerHandle::shutdown` stops intake and finishes what is buffered.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::domain::repository::{SessionStore, TokenRepository};
use crate::domain::service::{EmailMessage, EmailSender};
use crate::domain::value_object::{
    token::{TokenId, TokenType},
    user_id::UserId,
};
use crate::error::{EmailError, StoreError};

#[derive(Debug, Clone)]
pub enum BackgroundTask {
    SendEmail(EmailMessage),
    /// Remove every token of `kind` owned by the user
    DeleteUserTokens { kind: TokenType, user_id: UserId },
    DeleteTokens { ids: Vec<TokenId> },
    /// Remove every session belonging to the user
    InvalidateSessions { user_id: UserId },
    /// Tokens of all kinds and sessions of a deleted user
    DeleteUserData { user_id: UserId },
}

impl BackgroundTask {
    /// Metric label
    pub fn name(&self) -> &'static str {
        match self {
            BackgroundTask::SendEmail(_) => "send_email",
            BackgroundTask::DeleteUserTokens { .. } => "delete_user_tokens",
            BackgroundTask::DeleteTokens { .. } => "delete_tokens",
            BackgroundTask::InvalidateSessions { .. } => "invalidate_sessions",
            BackgroundTask::DeleteUserData { .. } => "delete_user_data",
        }
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Task timed out after {0:?}")]
    Timeout(Duration),
}

// ============================================================================
// Queue (producer side)
// ============================================================================

/// Cloneable producer handle
#[derive(Clone, Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<BackgroundTask>,
}

impl TaskQueue {
    /// Bounded queue; the receiver goes to `BackgroundWorker::spawn`
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<BackgroundTask>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue without waiting. Returns `false` when the task was dropped.
    pub fn dispatch(&self, task: BackgroundTask) -> bool {
        match self.tx.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(task)) => {
                tracing::warn!(task = task.name(), "Background queue full, task dropped");
                metrics::counter!("background_tasks_dropped_total", "reason" => "full")
                    .increment(1);
                false
            }
            Err(mpsc::error::TrySendError::Closed(task)) => {
                tracing::warn!(task = task.name(), "Background queue closed, task dropped");
                metrics::counter!("background_tasks_dropped_total", "reason" => "closed")
                    .increment(1);
                false
            }
        }
    }
}

// ============================================================================
// Worker (consumer side)
// ============================================================================

pub struct BackgroundWorker<T, S, E>
where
    T: TokenRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
    E: EmailSender + Send + Sync + 'static,
{
    tokens: Arc<T>,
    sessions: Arc<S>,
    mailer: Arc<E>,
    task_timeout: Duration,
}

impl<T, S, E> BackgroundWorker<T, S, E>
where
    T: TokenRepository + Send + Sync + 'static,
    S: SessionStore + Send + Sync + 'static,
    E: EmailSender + Send + Sync + 'static,
{
    pub fn new(tokens: Arc<T>, sessions: Arc<S>, mailer: Arc<E>, task_timeout: Duration) -> Self {
        Self {
            tokens,
            sessions,
            mailer,
            task_timeout,
        }
    }

    /// Run the worker loop on the runtime
    pub fn spawn(self, mut rx: mpsc::Receiver<BackgroundTask>) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    // A dropped handle also stops intake
                    _ = &mut shutdown_rx => {
                        rx.close();
                        let mut drained = 0usize;
                        while let Some(task) = rx.recv().await {
                            self.execute(task).await;
                            drained += 1;
                        }
                        tracing::info!(drained, "Background worker stopped");
                        break;
                    }
                    task = rx.recv() => match task {
                        Some(task) => self.execute(task).await,
                        None => {
                            tracing::info!("Background queue closed, worker exiting");
                            break;
                        }
                    },
                }
            }
        });

        WorkerHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }

    /// Run one task under the task timeout, recording the outcome
    pub async fn execute(&self, task: BackgroundTask) {
        let name = task.name();
        let outcome = match tokio::time::timeout(self.task_timeout, self.run(task)).await {
            Ok(result) => result,
            Err(_) => Err(TaskError::Timeout(self.task_timeout)),
        };

        match outcome {
            Ok(()) => {
                metrics::counter!("background_tasks_completed_total", "task" => name).increment(1);
            }
            Err(e) => {
                tracing::error!(task = name, error = %e, "Background task failed");
                metrics::counter!("background_tasks_failed_total", "task" => name).increment(1);
            }
        }
    }

    async fn run(&self, task: BackgroundTask) -> Result<(), TaskError> {
        match task {
            BackgroundTask::SendEmail(message) => {
                self.mailer.send(&message).await?;
                tracing::debug!(subject = %message.subject, "Email sent");
            }
            BackgroundTask::DeleteUserTokens { kind, user_id } => {
                let deleted = self.tokens.delete_by_owner(kind, user_id).await?;
                tracing::debug!(%user_id, %kind, deleted = deleted.len(), "Tokens deleted");
            }
            BackgroundTask::DeleteTokens { ids } => {
                let deleted = self.tokens.delete(&ids).await?;
                tracing::debug!(deleted = deleted.len(), "Tokens deleted");
            }
            BackgroundTask::InvalidateSessions { user_id } => {
                self.invalidate_sessions(user_id).await?;
            }
            BackgroundTask::DeleteUserData { user_id } => {
                for kind in TokenType::ALL {
                    self.tokens.delete_by_owner(kind, user_id).await?;
                }
                self.invalidate_sessions(user_id).await?;
            }
        }
        Ok(())
    }

    /// Sessions only record their owner in the values map, so this scans all
    async fn invalidate_sessions(&self, user_id: UserId) -> Result<(), TaskError> {
        let ids: Vec<_> = self
            .sessions
            .get_all()
            .await?
            .into_iter()
            .filter(|session| session.belongs_to(user_id))
            .map(|session| session.id)
            .collect();

        if !ids.is_empty() {
            self.sessions.delete_by_ids(&ids).await?;
        }
        tracing::info!(%user_id, invalidated = ids.len(), "Sessions invalidated");
        Ok(())
    }
}

/// Owner of the running worker
pub struct WorkerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Close the queue and wait until buffered tasks are done
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Background worker panicked");
        }
    }
}
