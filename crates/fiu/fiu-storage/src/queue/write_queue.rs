//! Dedicated writer thread fed by a crossbeam channel.
//! Every accepted operation runs exactly once, in submission order.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use fiu_core::config::QueueConfig;
use fiu_core::errors::{QueueError, StorageError};
use fiu_core::events::{
    CallbackPanickedEvent, EventDispatcher, JoinTimeoutEvent, OperationAbandonedEvent,
    OperationFailedEvent, OperationSucceededEvent, WorkerStoppedEvent,
};
use fiu_core::traits::DatabaseExecutor;
use fiu_core::types::{Params, Rows};
use tracing::{debug, error, info, warn};

use super::operation::WriteOperation;
use super::tracker::{DoneGuard, PendingTracker};

const WORKER_THREAD_NAME: &str = "fiu-write-queue";

/// Floor for the idle poll; a zero interval would spin the worker.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Observable state of the writer thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the next operation.
    Idle = 0,
    /// Running one operation (executor plus callback).
    Executing = 1,
    /// Closed to new submissions, finishing what was accepted.
    Draining = 2,
    /// Worker has exited.
    Stopped = 3,
}

impl WorkerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Executing,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Counters since the queue was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub callback_panics: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
    callback_panics: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the handle and the worker thread.
struct Shared {
    state: AtomicU8,
    closing: AtomicBool,
    abort: AtomicBool,
    tracker: PendingTracker,
    counters: Counters,
    events: EventDispatcher,
}

impl Shared {
    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn resting_state(&self) -> WorkerState {
        if self.closing.load(Ordering::SeqCst) {
            WorkerState::Draining
        } else {
            WorkerState::Idle
        }
    }
}

/// Producer side. Sequence assignment and send happen under one lock so
/// sequence order is channel order.
struct Inbox {
    sender: Option<Sender<WriteOperation>>,
    last_seq: u64,
}

/// A single-writer queue for database mutations.
///
/// Any number of threads may [`submit`](Self::submit) concurrently; one
/// background thread runs the operations against the executor one at a time,
/// in the order they were accepted. Construct it once at startup and share it
/// with `Arc`.
pub struct WriteQueue {
    inbox: Mutex<Inbox>,
    probe: Receiver<WriteOperation>,
    capacity: Option<usize>,
    submit_timeout: Duration,
    join_timeout: Duration,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    exited: Receiver<()>,
}

impl WriteQueue {
    /// Create a queue with default settings and start its worker.
    pub fn new(executor: Arc<dyn DatabaseExecutor>) -> Result<Self, QueueError> {
        Self::with_config(executor, &QueueConfig::default(), EventDispatcher::new())
    }

    /// Create a queue and start its worker.
    pub fn with_config(
        executor: Arc<dyn DatabaseExecutor>,
        config: &QueueConfig,
        events: EventDispatcher,
    ) -> Result<Self, QueueError> {
        let capacity = config.capacity.map(|c| c.max(1));
        let (tx, rx) = match capacity {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };
        let (exit_tx, exit_rx) = bounded::<()>(0);

        let shared = Arc::new(Shared {
            state: AtomicU8::new(WorkerState::Idle as u8),
            closing: AtomicBool::new(false),
            abort: AtomicBool::new(false),
            tracker: PendingTracker::default(),
            counters: Counters::default(),
            events,
        });

        let worker = Worker {
            rx: rx.clone(),
            executor,
            shared: Arc::clone(&shared),
            poll_interval: poll_interval(config),
            _exit: exit_tx,
        };
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run())
            .map_err(|e| QueueError::WorkerSpawn {
                message: e.to_string(),
            })?;

        info!(capacity = ?capacity, "write queue started");

        Ok(Self {
            inbox: Mutex::new(Inbox {
                sender: Some(tx),
                last_seq: 0,
            }),
            probe: rx,
            capacity,
            submit_timeout: config.effective_submit_timeout(),
            join_timeout: config.effective_stop_join_timeout(),
            shared,
            worker: Mutex::new(Some(handle)),
            exited: exit_rx,
        })
    }

    /// Append an operation to the tail of the queue and return its sequence
    /// number. Never blocks on execution.
    ///
    /// Fails with `Closed` after [`stop`](Self::stop), with `Full` when a
    /// capacity is configured and reached, and with `InvalidStatement` for a
    /// blank statement.
    pub fn submit(&self, mut op: WriteOperation) -> Result<u64, QueueError> {
        if op.statement.trim().is_empty() {
            return Err(QueueError::InvalidStatement {
                reason: "statement is empty".to_string(),
            });
        }

        let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = inbox.last_seq + 1;
        let Some(sender) = inbox.sender.as_ref() else {
            return Err(QueueError::Closed);
        };

        op.seq = seq;
        self.shared.tracker.add();
        match sender.try_send(op) {
            Ok(()) => {
                inbox.last_seq = seq;
                self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(seq)
            }
            Err(TrySendError::Full(_)) => {
                self.shared.tracker.done();
                Err(QueueError::Full {
                    capacity: self.capacity.unwrap_or_default(),
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                self.shared.tracker.done();
                Err(QueueError::Closed)
            }
        }
    }

    /// Submit a statement and block until it has run or `timeout` elapses
    /// (`None` uses the configured default, 30s unless overridden).
    ///
    /// On timeout the operation is NOT cancelled: it stays queued and will
    /// still execute, so the outcome is unknown rather than failed.
    /// Must not be called from inside a write callback.
    pub fn submit_and_wait(
        &self,
        statement: impl Into<String>,
        params: Params,
        timeout: Option<Duration>,
    ) -> Result<Rows, QueueError> {
        let timeout = timeout.unwrap_or(self.submit_timeout);
        let (done_tx, done_rx) = bounded::<Result<Rows, QueueError>>(1);
        let fail_tx = done_tx.clone();

        let op = WriteOperation::new(statement, params)
            .on_success(move |rows| {
                let _ = done_tx.send(Ok(rows));
            })
            .on_failure(move |e| {
                let _ = fail_tx.send(Err(e));
            });
        let seq = self.submit(op)?;

        match done_rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    seq,
                    timeout_ms = timeout.as_millis() as u64,
                    "submit_and_wait timed out; write still queued"
                );
                Err(QueueError::Timeout { timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Err(QueueError::Closed),
        }
    }

    /// Block until every operation submitted so far has executed and its
    /// callback has returned, or until `timeout`. Returns false on timeout.
    pub fn wait_completion(&self, timeout: Option<Duration>) -> bool {
        self.shared.tracker.wait_drained(timeout)
    }

    /// Operations waiting to run, not counting the one executing. Advisory.
    pub fn queue_size(&self) -> usize {
        self.probe.len()
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }

    /// True once the queue no longer accepts submissions.
    pub fn is_closed(&self) -> bool {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sender
            .is_none()
    }

    /// Stop the queue. New submissions fail with `Closed` from here on.
    ///
    /// With `wait_for_completion`, every accepted operation runs first.
    /// Without it, the in-flight operation finishes and the rest are
    /// abandoned; each abandoned operation's `on_failure` receives `Closed`.
    /// The worker join is bounded by the configured stop timeout (5s by
    /// default); overrunning it is logged, not returned. Calling `stop`
    /// again is a no-op. Called from a write callback, it only closes the
    /// queue and returns; the worker then finishes on its own.
    pub fn stop(&self, wait_for_completion: bool) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            debug!("write queue already stopped");
            return;
        };

        self.shared.closing.store(true, Ordering::SeqCst);
        if !wait_for_completion {
            self.shared.abort.store(true, Ordering::SeqCst);
        }
        self.close_inbox();
        let _ = self.shared.state.compare_exchange(
            WorkerState::Idle as u8,
            WorkerState::Draining as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        // Called from a write callback: the running operation is still
        // counted as pending, so draining or joining here would never return.
        // The worker finishes on its own, as after `Drop`.
        if handle.thread().id() == thread::current().id() {
            debug!("write queue stopped from its own worker; not waiting");
            return;
        }

        if wait_for_completion {
            self.wait_completion(None);
        }

        match self.exited.recv_timeout(self.join_timeout) {
            Err(RecvTimeoutError::Timeout) => {
                let pending = self.shared.tracker.pending();
                warn!(
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    pending, "write queue worker did not exit in time; detaching"
                );
                self.shared.events.emit_join_timeout(&JoinTimeoutEvent {
                    timeout: self.join_timeout,
                    pending,
                });
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if handle.join().is_err() {
                    error!("write queue worker panicked");
                }
                let stats = self.stats();
                info!(
                    succeeded = stats.succeeded,
                    failed = stats.failed,
                    abandoned = stats.abandoned,
                    "write queue stopped"
                );
            }
        }
    }

    fn close_inbox(&self) {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sender
            .take();
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        // Close without blocking; the worker drains what was accepted and exits.
        self.shared.closing.store(true, Ordering::SeqCst);
        self.close_inbox();
    }
}

struct Worker {
    rx: Receiver<WriteOperation>,
    executor: Arc<dyn DatabaseExecutor>,
    shared: Arc<Shared>,
    poll_interval: Duration,
    // Dropped when the thread exits, however it exits; `stop` waits on that.
    _exit: Sender<()>,
}

impl Worker {
    fn run(self) {
        debug!("write queue worker running");
        loop {
            match self.rx.recv_timeout(self.poll_interval) {
                Ok(op) if self.shared.abort.load(Ordering::SeqCst) => self.abandon(op),
                Ok(op) => {
                    self.shared.set_state(WorkerState::Executing);
                    self.process(op);
                    self.shared.set_state(self.shared.resting_state());
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.shared.abort.load(Ordering::SeqCst) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.shared.set_state(WorkerState::Stopped);
        let stats = self.shared.counters.snapshot();
        let processed = stats.succeeded + stats.failed;
        debug!(processed, abandoned = stats.abandoned, "write queue worker exiting");
        self.shared.events.emit_worker_stopped(&WorkerStoppedEvent {
            processed,
            abandoned: stats.abandoned,
        });
    }

    fn process(&self, op: WriteOperation) {
        let _done = DoneGuard(&self.shared.tracker);
        let WriteOperation {
            seq,
            statement,
            params,
            on_success,
            on_failure,
        } = op;

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.executor.execute(&statement, &params)
        }))
        .unwrap_or_else(|payload| {
            Err(StorageError::sqlite(format!(
                "executor panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
        let elapsed = started.elapsed();

        match result {
            Ok(rows) => {
                self.shared.counters.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    seq,
                    execute_time_us = elapsed.as_micros() as u64,
                    rows = rows.len(),
                    queue_depth = self.rx.len(),
                    "write applied"
                );
                self.shared.events.emit_operation_succeeded(&OperationSucceededEvent {
                    seq,
                    row_count: rows.len(),
                    elapsed,
                });
                if let Some(cb) = on_success {
                    self.run_callback(seq, move || cb(rows));
                }
            }
            Err(e) => {
                self.shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                let error = QueueError::Execution(e);
                self.shared.events.emit_operation_failed(&OperationFailedEvent {
                    seq,
                    statement: statement.clone(),
                    error: error.clone(),
                    handled: on_failure.is_some(),
                });
                match on_failure {
                    Some(cb) => {
                        debug!(seq, %error, "write failed");
                        self.run_callback(seq, move || cb(error));
                    }
                    None => warn!(seq, %error, %statement, "write failed with no failure handler"),
                }
            }
        }
    }

    fn abandon(&self, op: WriteOperation) {
        let _done = DoneGuard(&self.shared.tracker);
        self.shared.counters.abandoned.fetch_add(1, Ordering::Relaxed);
        debug!(seq = op.seq, "write abandoned by stop");
        self.shared.events.emit_operation_abandoned(&OperationAbandonedEvent {
            seq: op.seq,
            statement: op.statement.clone(),
        });
        if let Some(cb) = op.on_failure {
            self.run_callback(op.seq, move || cb(QueueError::Closed));
        }
    }

    /// Run a caller continuation; a panic is logged and counted, never
    /// propagated into the loop.
    fn run_callback<F: FnOnce()>(&self, seq: u64, f: F) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            self.shared.counters.callback_panics.fetch_add(1, Ordering::Relaxed);
            let message = panic_message(payload.as_ref());
            let error = QueueError::CallbackPanicked {
                seq,
                message: message.clone(),
            };
            error!(seq, %error, "write callback panicked; continuing");
            self.shared
                .events
                .emit_callback_panicked(&CallbackPanickedEvent { seq, message });
        }
    }
}

fn poll_interval(config: &QueueConfig) -> Duration {
    config.effective_poll_interval().max(MIN_POLL_INTERVAL)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiu_core::types::Value;

    struct Echo;

    impl DatabaseExecutor for Echo {
        fn execute(&self, _statement: &str, params: &[Value]) -> Result<Rows, StorageError> {
            Ok(vec![params.to_vec()])
        }
    }

    #[test]
    fn state_roundtrips_through_u8() {
        for s in [
            WorkerState::Idle,
            WorkerState::Executing,
            WorkerState::Draining,
            WorkerState::Stopped,
        ] {
            assert_eq!(WorkerState::from_u8(s as u8), s);
        }
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let p: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(p.as_ref()), "static");
        let p: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "owned");
        let p: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(p.as_ref()), "unknown panic");
    }

    #[test]
    fn zero_poll_interval_is_floored() {
        let config = QueueConfig {
            poll_interval_ms: Some(0),
            ..QueueConfig::default()
        };
        assert_eq!(poll_interval(&config), MIN_POLL_INTERVAL);
        assert_eq!(poll_interval(&QueueConfig::default()), Duration::from_secs(1));

        let q = WriteQueue::with_config(Arc::new(Echo), &config, EventDispatcher::new()).unwrap();
        let rows = q.submit_and_wait("INSERT", vec![Value::Integer(1)], None).unwrap();
        assert_eq!(rows, vec![vec![Value::Integer(1)]]);
        q.stop(true);
    }

    #[test]
    fn sequence_numbers_start_at_one_and_increase() {
        let q = WriteQueue::new(Arc::new(Echo)).unwrap();
        let a = q.submit(WriteOperation::new("INSERT 1", vec![])).unwrap();
        let b = q.submit(WriteOperation::new("INSERT 2", vec![])).unwrap();
        assert_eq!((a, b), (1, 2));
        q.stop(true);
    }

    #[test]
    fn blank_statement_is_rejected() {
        let q = WriteQueue::new(Arc::new(Echo)).unwrap();
        let err = q.submit(WriteOperation::new("   ", vec![])).unwrap_err();
        assert!(matches!(err, QueueError::InvalidStatement { .. }));
        assert_eq!(q.stats().submitted, 0);
        q.stop(true);
    }

    #[test]
    fn drop_lets_worker_finish_accepted_writes() {
        let (tx, rx) = crossbeam_channel::unbounded();
        {
            let q = WriteQueue::new(Arc::new(Echo)).unwrap();
            for i in 0..10i64 {
                let tx = tx.clone();
                q.submit(
                    WriteOperation::new("INSERT", vec![Value::Integer(i)])
                        .on_success(move |_| tx.send(i).unwrap()),
                )
                .unwrap();
            }
        }
        let got: Vec<i64> = (0..10)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, (0..10).collect::<Vec<_>>());
    }
}
