//! Background ingest thread.
//!
//! The network context enqueues [`PoseEvent`]s through an [`IngestHandle`];
//! a single named worker thread drains the bounded queue in order and
//! dispatches each event to the engine. Shutting the worker down stops intake,
//! applies whatever was already queued, and joins the thread before returning.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{info, warn};

use crate::engine::SkeletonEngine;
use crate::error::{Result, SkeletonError};
use crate::events::{dispatch, PoseEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Outcome counts at a point in time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub applied: u64,
    pub ignored: u64,
}

#[derive(Debug, Default)]
struct Counters {
    applied: AtomicU64,
    ignored: AtomicU64,
}

impl Counters {
    fn load(&self) -> IngestStats {
        IngestStats {
            applied: self.applied.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
struct Shared {
    stop: AtomicBool,
    counters: Counters,
}

/// Cloneable sender side of the ingest queue.
#[derive(Clone, Debug)]
pub struct IngestHandle {
    tx: Sender<PoseEvent>,
    shared: Arc<Shared>,
    engine: Arc<SkeletonEngine>,
}

impl IngestHandle {
    /// Enqueue an event, blocking while the queue is full.
    pub fn send(&self, event: PoseEvent) -> Result<()> {
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(SkeletonError::WorkerStopped);
        }
        self.tx.send(event).map_err(|_| SkeletonError::WorkerStopped)
    }

    /// Enqueue without blocking. Returns `Ok(false)` when the queue is full and
    /// the event was dropped.
    pub fn try_send(&self, event: PoseEvent) -> Result<bool> {
        if self.shared.stop.load(Ordering::Acquire) {
            return Err(SkeletonError::WorkerStopped);
        }
        match self.tx.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(event)) => {
                warn!(kind = event.kind(), "ingest queue full; event dropped");
                Ok(false)
            }
            Err(TrySendError::Disconnected(_)) => Err(SkeletonError::WorkerStopped),
        }
    }

    /// Decode a raw control message and enqueue it.
    pub fn send_control(&self, address: &str, payload: &[f32]) -> Result<()> {
        let event = PoseEvent::decode(address, payload, self.engine.config())?;
        self.send(event)
    }

    pub fn stats(&self) -> IngestStats {
        self.shared.counters.load()
    }
}

/// Owns the ingest thread. Dropping it shuts the thread down.
#[derive(Debug)]
pub struct IngestWorker {
    handle: IngestHandle,
    thread: Option<JoinHandle<()>>,
}

impl IngestWorker {
    pub fn spawn(engine: Arc<SkeletonEngine>, capacity: usize) -> Result<Self> {
        let (tx, rx) = bounded(capacity.max(1));
        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            counters: Counters::default(),
        });

        let thread_engine = Arc::clone(&engine);
        let thread_shared = Arc::clone(&shared);
        let rig = engine.rig().name().to_string();
        let thread = thread::Builder::new()
            .name(format!("pose-ingest-{rig}"))
            .spawn(move || run(&thread_engine, &rx, &thread_shared))
            .map_err(|source| SkeletonError::Io {
                path: "ingest thread".into(),
                source,
            })?;

        info!(rig = %rig, capacity, "ingest worker started");
        Ok(Self {
            handle: IngestHandle { tx, shared, engine },
            thread: Some(thread),
        })
    }

    /// Spawn with the engine's configured queue capacity.
    pub fn spawn_default(engine: Arc<SkeletonEngine>) -> Result<Self> {
        let capacity = engine.config().event_queue_capacity;
        Self::spawn(engine, capacity)
    }

    #[inline]
    pub fn handle(&self) -> IngestHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> IngestStats {
        self.handle.stats()
    }

    /// Stop intake, apply queued events, join the thread and return final counts.
    pub fn shutdown(mut self) -> IngestStats {
        self.stop_and_join();
        self.handle.stats()
    }

    fn stop_and_join(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.handle.shared.stop.store(true, Ordering::Release);
        if thread.join().is_err() {
            warn!("ingest worker panicked");
        }
        let stats = self.handle.stats();
        info!(
            applied = stats.applied,
            ignored = stats.ignored,
            "ingest worker stopped"
        );
    }
}

impl Drop for IngestWorker {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn run(engine: &SkeletonEngine, rx: &Receiver<PoseEvent>, shared: &Shared) {
    loop {
        if shared.stop.load(Ordering::Acquire) {
            // Intake is closed; finish what was accepted before the stop.
            while let Ok(event) = rx.try_recv() {
                apply(engine, event, &shared.counters);
            }
            return;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => apply(engine, event, &shared.counters),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn apply(engine: &SkeletonEngine, event: PoseEvent, counters: &Counters) {
    if dispatch(engine, event).is_applied() {
        counters.applied.fetch_add(1, Ordering::Relaxed);
    } else {
        counters.ignored.fetch_add(1, Ordering::Relaxed);
    }
}
