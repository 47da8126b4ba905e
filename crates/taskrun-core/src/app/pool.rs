//! WorkerPool - 固定数の worker で job を並行実行する bounded pool
//!
//! - job は引数なしの `Future<Output = ()>`
//! - 投入はブロックしない（満杯なら `PoolError::Saturated`）
//! - `request_shutdown()` 後は新規投入を拒否し、worker は実行中の job を終えてから止まる
//! - `shutdown_and_join()` は実行中の job を待ってから戻る。queue に残った job は捨てられる
//! - pool を drop しても worker は止まる（プロセス終了をブロックしない）

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::config::ExecutorConfig;
use crate::domain::PoolError;
use crate::observability::PoolStats;

/// A zero-argument unit of work.
pub type Job = BoxFuture<'static, ()>;

#[derive(Debug, Default)]
struct PoolCounters {
    active: AtomicUsize,
    queued: AtomicUsize,
    completed: AtomicUsize,
}

/// Reserved room for exactly one job.
///
/// Obtained from [`WorkerPool::try_reserve`]; dropping it without
/// dispatching gives the room back.
pub struct JobSlot<'a> {
    permit: mpsc::Permit<'a, Job>,
    counters: &'a PoolCounters,
}

impl JobSlot<'_> {
    pub fn dispatch(self, job: Job) {
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        self.permit.send(job);
    }
}

/// Bounded pool of long-lived workers sharing one job queue.
///
/// Must be created inside a tokio runtime.
pub struct WorkerPool {
    name: String,
    workers: usize,
    capacity: usize,
    tx: mpsc::Sender<Job>,
    shutdown_tx: watch::Sender<bool>,
    accepting: AtomicBool,
    counters: Arc<PoolCounters>,
    joins: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(config: &ExecutorConfig) -> Self {
        let workers = config.resolved_worker_threads();
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel::<Job>(capacity);
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(PoolCounters::default());

        let mut joins = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let rx = Arc::clone(&rx);
            let counters = Arc::clone(&counters);
            let shutdown_rx = shutdown_rx.clone();
            let pool_name = config.pool_name.clone();

            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, pool_name, rx, shutdown_rx, counters).await;
            }));
        }

        info!(pool = %config.pool_name, workers, capacity, "worker pool started");

        Self {
            name: config.pool_name.clone(),
            workers,
            capacity,
            tx,
            shutdown_tx,
            accepting: AtomicBool::new(true),
            counters,
            joins: std::sync::Mutex::new(joins),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserve room for one job without handing it over yet.
    pub fn try_reserve(&self) -> Result<JobSlot<'_>, PoolError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(PoolError::ShutDown);
        }
        let permit = self.tx.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => PoolError::Saturated {
                capacity: self.capacity,
            },
            TrySendError::Closed(()) => PoolError::ShutDown,
        })?;
        Ok(JobSlot {
            permit,
            counters: &self.counters,
        })
    }

    /// Hand a job to the pool. Never waits for room.
    pub fn submit(&self, job: Job) -> Result<(), PoolError> {
        self.try_reserve()?.dispatch(job);
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            name: self.name.clone(),
            workers: self.workers,
            capacity: self.capacity,
            active: self.counters.active.load(Ordering::Relaxed),
            queued: self.counters.queued.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
        }
    }

    /// Stop taking new jobs. In-flight jobs run to completion; jobs still
    /// queued are dropped once every worker has stopped.
    pub fn request_shutdown(&self) {
        self.accepting.store(false, Ordering::Release);
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    ///
    /// Returns once every in-flight job has finished. Only the first call
    /// waits; later calls find no workers left to join.
    pub async fn shutdown_and_join(&self) {
        self.request_shutdown();
        let joins = {
            let mut joins = self.joins.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *joins)
        };
        for join in joins {
            let _ = join.await;
        }
        info!(pool = %self.name, "worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.request_shutdown();
    }
}

async fn next_job(rx: &Mutex<mpsc::Receiver<Job>>) -> Option<Job> {
    rx.lock().await.recv().await
}

async fn worker_loop(
    worker_id: usize,
    pool_name: String,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    mut shutdown_rx: watch::Receiver<bool>,
    counters: Arc<PoolCounters>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // 受信待ちは shutdown と競合させる（recv は cancel-safe）
        let job = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            job = next_job(&rx) => job,
        };

        let Some(job) = job else {
            break;
        };

        counters.queued.fetch_sub(1, Ordering::Relaxed);
        counters.active.fetch_add(1, Ordering::Relaxed);

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            error!(pool = %pool_name, worker_id, "job panicked; worker keeps running");
        }

        counters.active.fetch_sub(1, Ordering::Relaxed);
        counters.completed.fetch_add(1, Ordering::Relaxed);
    }

    debug!(pool = %pool_name, worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::{Notify, oneshot};

    fn config(workers: usize, capacity: usize) -> ExecutorConfig {
        ExecutorConfig {
            max_task_runs_threads_num: workers,
            queue_capacity: capacity,
            pool_name: "test-pool".to_string(),
        }
    }

    #[tokio::test]
    async fn runs_submitted_jobs() {
        let pool = WorkerPool::new(&config(2, 8));
        let (tx, rx) = oneshot::channel();

        pool.submit(Box::pin(async move {
            let _ = tx.send(7);
        }))
        .unwrap();

        assert_eq!(rx.await.unwrap(), 7);
        pool.shutdown_and_join().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn refuses_jobs_beyond_capacity() {
        let pool = WorkerPool::new(&config(1, 1));
        let gate = Arc::new(Notify::new());
        let (started_tx, started_rx) = oneshot::channel();

        // worker を塞ぐ
        let g = Arc::clone(&gate);
        pool.submit(Box::pin(async move {
            let _ = started_tx.send(());
            g.notified().await;
        }))
        .unwrap();
        started_rx.await.unwrap();

        // queue を埋める
        pool.submit(Box::pin(async {})).unwrap();

        let err = pool.submit(Box::pin(async {})).unwrap_err();
        assert_eq!(err, PoolError::Saturated { capacity: 1 });
        assert_eq!(pool.stats().active, 1);
        assert_eq!(pool.stats().queued, 1);

        gate.notify_one();
        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn refuses_jobs_after_shutdown() {
        let pool = WorkerPool::new(&config(1, 4));
        pool.request_shutdown();

        assert!(matches!(pool.try_reserve(), Err(PoolError::ShutDown)));
        assert_eq!(pool.submit(Box::pin(async {})), Err(PoolError::ShutDown));
    }

    #[tokio::test]
    async fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(&config(1, 4));
        pool.submit(Box::pin(async { panic!("boom") })).unwrap();

        let (tx, rx) = oneshot::channel();
        pool.submit(Box::pin(async move {
            let _ = tx.send(());
        }))
        .unwrap();

        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("second job should run")
            .unwrap();
        pool.shutdown_and_join().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_waits_for_in_flight_job() {
        let pool = Arc::new(WorkerPool::new(&config(1, 4)));
        let gate = Arc::new(Notify::new());
        let done = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = oneshot::channel();

        let (g, d) = (Arc::clone(&gate), Arc::clone(&done));
        pool.submit(Box::pin(async move {
            let _ = started_tx.send(());
            g.notified().await;
            d.store(true, Ordering::SeqCst);
        }))
        .unwrap();
        started_rx.await.unwrap();

        let stopping = tokio::spawn({
            let pool = Arc::clone(&pool);
            async move { pool.shutdown_and_join().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!stopping.is_finished());
        assert!(matches!(pool.try_reserve(), Err(PoolError::ShutDown)));

        gate.notify_one();
        tokio::time::timeout(Duration::from_secs(5), stopping)
            .await
            .expect("shutdown should finish")
            .unwrap();
        assert!(done.load(Ordering::SeqCst));

        // 2 回目は待つ worker がいない
        pool.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn dropped_slot_gives_room_back() {
        let pool = WorkerPool::new(&config(1, 1));
        {
            let _slot = pool.try_reserve().unwrap();
            assert!(matches!(pool.try_reserve(), Err(PoolError::Saturated { .. })));
        }
        assert!(pool.try_reserve().is_ok());
    }
}
