//! The async event bus: bounded fan-out with a join-drain barrier (§6).
//!
//! Grounded in `original_source/sync2smugmug/event_manager.py`
//! (`EventsTracker`, `fire_event`, `handle_event`, `join`). Concurrency
//! is limited to 10 in-flight handler calls at a time, matching the
//! original's `asyncio.Semaphore(10)`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::{EventContext, EventData};
use crate::handlers;

const CONCURRENCY_LIMIT: usize = 10;
const DRAIN_SLICE: usize = 100;

/// Submitted/processed totals plus a per-event-kind breakdown, for the end-of-run
/// summary (§6, §11).
#[derive(Debug, Default, Clone)]
pub struct PassSummary {
    pub total_submitted: u64,
    pub total_processed: u64,
    pub event_counts: HashMap<&'static str, u64>,
}

impl PassSummary {
    pub fn merge(&mut self, other: PassSummary) {
        self.total_submitted += other.total_submitted;
        self.total_processed += other.total_processed;
        for (kind, count) in other.event_counts {
            *self.event_counts.entry(kind).or_insert(0) += count;
        }
    }
}

pub struct EventBus {
    semaphore: Arc<Semaphore>,
    tasks: Mutex<Vec<JoinHandle<Result<bool>>>>,
    total_submitted: AtomicU64,
    total_processed: AtomicU64,
    event_counts: Mutex<HashMap<&'static str, u64>>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(CONCURRENCY_LIMIT)),
            tasks: Mutex::new(Vec::new()),
            total_submitted: AtomicU64::new(0),
            total_processed: AtomicU64::new(0),
            event_counts: Mutex::new(HashMap::new()),
        })
    }

    pub fn total_submitted(&self) -> u64 {
        self.total_submitted.load(Ordering::Relaxed)
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::Relaxed)
    }

    /// Snapshot of events fired so far, grouped by kind (§6 summary).
    pub async fn event_counts(&self) -> HashMap<&'static str, u64> {
        self.event_counts.lock().await.clone()
    }

    /// Snapshot of the totals and per-kind breakdown for the end-of-run summary.
    pub async fn summary(&self) -> PassSummary {
        PassSummary {
            total_submitted: self.total_submitted(),
            total_processed: self.total_processed(),
            event_counts: self.event_counts().await,
        }
    }

    /// Log the event and spawn a tracked task to handle it. Returns immediately; the
    /// caller is expected to eventually call [`EventBus::join`].
    pub async fn fire_event(self: &Arc<Self>, event_data: EventData, ctx: Arc<EventContext>) {
        debug!("Event fired");
        self.total_submitted.fetch_add(1, Ordering::Relaxed);
        *self.event_counts.lock().await.entry(event_data.kind()).or_insert(0) += 1;

        let bus = Arc::clone(self);
        let handle = tokio::spawn(async move { bus.handle_event(event_data, ctx).await });

        self.tasks.lock().await.push(handle);
    }

    /// Run the handler(s) for this event, bounded by the shared semaphore so the
    /// dispatcher itself can never exceed the configured fan-out width regardless of how
    /// many events are in flight.
    ///
    /// Handlers recursively call [`EventBus::fire_event`], whose own spawned task awaits
    /// this same function — boxing the future here breaks that infinite type expansion.
    fn handle_event(
        self: Arc<Self>,
        event_data: EventData,
        ctx: Arc<EventContext>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<bool>> + Send>> {
        Box::pin(async move {
            let _permit = self.semaphore.acquire().await.expect("semaphore never closed");
            let changed = handlers::dispatch(event_data, ctx).await?;
            self.total_processed.fetch_add(1, Ordering::Relaxed);
            Ok(changed)
        })
    }

    /// Wait until every event submitted so far (including ones fired by handlers that
    /// ran while waiting) has been processed. Handlers often fire further events, so this
    /// repeatedly drains whatever is queued until the queue is finally empty, instead of
    /// a single `join_all` over a snapshot.
    pub async fn join(&self) -> Result<()> {
        loop {
            let slice = {
                let mut tasks = self.tasks.lock().await;
                if tasks.is_empty() {
                    return Ok(());
                }
                let slice_size = tasks.len().min(DRAIN_SLICE);
                tasks.drain(..slice_size).collect::<Vec<_>>()
            };

            for handle in slice {
                handle.await.expect("handler task panicked")?;
            }
        }
    }
}
