use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::error::{OrmError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum QueueOp {
    Run(Job),
    Shutdown,
}

/// Single worker thread that runs submitted jobs one at a time, in
/// submission order.
pub struct SerialQueue {
    tx: Sender<QueueOp>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SerialQueue {
    /// Spawns the worker thread.
    pub fn spawn(name: &str) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<QueueOp>();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(op) = rx.recv() {
                    match op {
                        QueueOp::Run(job) => job(),
                        QueueOp::Shutdown => break,
                    }
                }
                tracing::debug!("Execution queue stopped");
            })
            .map_err(|e| OrmError::Config(format!("Failed to spawn queue thread: {}", e)))?;
        Ok(Self {
            tx,
            thread: Some(thread),
        })
    }

    /// Enqueues `job` without waiting for it.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.tx
            .send(QueueOp::Run(Box::new(job)))
            .map_err(|_| OrmError::QueueClosed)
    }

    /// Blocks until every job submitted before this call has run.
    pub fn flush(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        self.submit(move || {
            let _ = tx.send(());
        })?;
        rx.recv().map_err(|_| OrmError::QueueClosed)
    }

    /// Stops the worker after the jobs already queued and waits for it.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(QueueOp::Shutdown);
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::warn!("Execution queue worker panicked");
            }
        }
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
