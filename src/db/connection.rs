use std::{
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{Context, Result};
use rusqlite::{Connection, Transaction};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::db::migrations::run_migrations;
use crate::{log_error, log_info};

const ENABLE_LOGS: bool = true;

/// Failures of the worker itself, as opposed to failures of the SQL a task ran.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("database worker is no longer running")]
    WorkerStopped,

    #[error("database task aborted before replying")]
    TaskAborted,
}

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Target {
    File(PathBuf),
    Memory,
}

impl Target {
    fn describe(&self) -> String {
        match self {
            Target::File(path) => path.display().to_string(),
            Target::Memory => ":memory:".to_string(),
        }
    }

    fn open(&self) -> Result<Connection> {
        let conn = match self {
            Target::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
                let conn = Connection::open(path).context("failed to open SQLite database")?;
                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    log_error!("Failed to enable WAL mode: {err}");
                }
                conn
            }
            Target::Memory => {
                Connection::open_in_memory().context("failed to open in-memory database")?
            }
        };

        // Segment rows rely on ON DELETE CASCADE.
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("failed to enable foreign keys")?;
        Ok(conn)
    }
}

/// Owns the job queue; dropping it closes the queue and waits for the worker to drain it.
struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log_error!("Database worker exited with a panic");
            }
        }
    }
}

/// SQLite handle shared by every store call. Clones share one connection on one worker thread.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
    path: Option<Arc<PathBuf>>,
}

impl Database {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        Self::spawn(Target::File(db_path))
    }

    /// Private database that disappears with the handle.
    pub fn in_memory() -> Result<Self> {
        Self::spawn(Target::Memory)
    }

    fn spawn(target: Target) -> Result<Self> {
        let label = target.describe();
        let path = match &target {
            Target::File(path) => Some(Arc::new(path.clone())),
            Target::Memory => None,
        };

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let handle = thread::Builder::new()
            .name("lockin-db".into())
            .spawn(move || {
                let opened = target.open().and_then(|mut conn| {
                    run_migrations(&mut conn).context("failed to run database migrations")?;
                    Ok(conn)
                });
                let mut conn = match opened {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }

                serve(&mut conn, jobs_rx);
                log_info!("Database worker for {} stopped", target.describe());
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        log_info!("Database ready at {}", label);

        Ok(Self {
            worker: Arc::new(Worker {
                jobs: Some(jobs_tx),
                handle: Some(handle),
            }),
            path,
        })
    }

    /// File backing this database; `None` for in-memory ones.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Run `task` on the worker thread and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // A dropped receiver means the caller stopped waiting; nothing to report to.
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .jobs
            .as_ref()
            .ok_or(DatabaseError::WorkerStopped)?
            .send(job)
            .map_err(|_| DatabaseError::WorkerStopped)?;

        reply_rx.await.map_err(|_| DatabaseError::TaskAborted)?
    }

    /// Run `task` inside a transaction that commits when it returns `Ok`.
    pub async fn transact<F, T>(&self, operation: &'static str, task: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let value = task(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .with_context(|| format!("{operation} failed"))
    }
}

/// Worker loop: runs jobs until every sender is gone. A panicking job drops its reply and the
/// connection stays in service.
fn serve(conn: &mut Connection, jobs: mpsc::Receiver<Job>) {
    while let Ok(job) = jobs.recv() {
        if panic::catch_unwind(AssertUnwindSafe(|| job(conn))).is_err() {
            log_error!("Database task panicked");
        }
    }
}
