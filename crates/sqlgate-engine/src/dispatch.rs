//! Asynchronous statement dispatch
//!
//! A fixed-size worker pool fed by a bounded queue. Submission awaits queue
//! capacity, so saturation applies backpressure to the submitter instead of
//! dropping work or growing memory without bound.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use sqlgate_core::{Connection, Result, SqlGateError};

use crate::engine::ExecutionEngine;
use crate::options::ExecutionOptions;
use crate::result::ExecutionResult;

struct Job {
    sql: String,
    conn: Arc<dyn Connection>,
    options: ExecutionOptions,
    reply: oneshot::Sender<Result<ExecutionResult>>,
}

/// Future handle for a dispatched execution.
pub struct ExecutionHandle {
    rx: oneshot::Receiver<Result<ExecutionResult>>,
}

impl ExecutionHandle {
    /// Wait for the worker to finish the statement. A dropped worker
    /// surfaces as an error value.
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.rx
            .await
            .map_err(|_| SqlGateError::Other("execution worker dropped the job".to_string()))?
    }
}

/// Fixed worker pool over an [`ExecutionEngine`].
pub struct AsyncExecutor {
    tx: mpsc::Sender<Job>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl AsyncExecutor {
    /// Spawn the workers on the current runtime; pool size and queue bound
    /// come from the engine's configuration.
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        let worker_count = engine.config().worker_count.max(1);
        let queue_depth = engine.config().queue_depth.max(1);
        let (tx, rx) = mpsc::channel::<Job>(queue_depth);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count)
            .map(|worker| {
                let engine = engine.clone();
                let rx = rx.clone();
                tokio::spawn(async move {
                    loop {
                        let job = { rx.lock().await.recv().await };
                        let Some(job) = job else {
                            tracing::debug!(worker = worker, "dispatch queue closed, worker exiting");
                            break;
                        };
                        let outcome = engine
                            .execute_advanced(&job.sql, &job.conn, &job.options)
                            .await;
                        // Receiver may have given up waiting
                        let _ = job.reply.send(outcome);
                    }
                })
            })
            .collect();

        Self { tx, workers }
    }

    /// Queue a statement. Awaits when the queue is full.
    pub async fn submit(
        &self,
        sql: &str,
        conn: Arc<dyn Connection>,
        options: ExecutionOptions,
    ) -> Result<ExecutionHandle> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job {
                sql: sql.to_string(),
                conn,
                options,
                reply,
            })
            .await
            .map_err(|_| SqlGateError::Other("execution workers are shut down".to_string()))?;
        Ok(ExecutionHandle { rx })
    }

    /// Close the queue; workers finish queued jobs and exit.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}
