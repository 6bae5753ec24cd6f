//! Fan-out of query targets into one merged stream
//!
//! Each resolved target gets its own worker task that owns exactly one
//! transport subscription and forwards its frames into a shared mpsc channel.
//! The consumer reads the channel through [`MergedStream`], which yields items
//! in arrival order. When every worker has finished, all senders are gone and
//! the stream completes. Dropping the stream aborts the workers, which drops
//! each subscription exactly once.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::live::{FrameStream, StreamingTransport, TransportError};
use crate::query::{is_eligible, AddressResolver, QueryTarget, ResolvedQuery};
use crate::template::ScopedVars;

use super::response::{QueryError, QueryResponse};
use super::stats::{RunCounters, RunStats};

/// Default capacity of the channel between workers and the consumer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Runs batches of query targets against a streaming transport
pub struct FanOut<T: StreamingTransport + 'static> {
    transport: Arc<T>,
    resolver: AddressResolver,
    channel_capacity: usize,
}

impl<T: StreamingTransport + 'static> FanOut<T> {
    /// Create a fan-out over `transport`
    pub fn new(transport: Arc<T>, resolver: AddressResolver) -> Self {
        Self {
            transport,
            resolver,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the worker-to-consumer channel capacity (minimum one)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Get the address resolver
    pub fn resolver(&self) -> &AddressResolver {
        &self.resolver
    }

    /// Run a batch of targets
    ///
    /// Ineligible targets are skipped silently. Targets that fail to resolve
    /// are reported as [`QueryResponse::Error`] items and open nothing. Every
    /// other target opens one subscription on a worker task of the current
    /// tokio runtime. Called outside a runtime, each resolved target is
    /// reported as a subscribe error instead.
    pub fn run(&self, targets: &[QueryTarget], scope: &ScopedVars, namespace: &str) -> MergedStream {
        let counters = Arc::new(RunCounters::new(targets.len()));
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let mut pending = VecDeque::new();
        let mut workers = Vec::new();

        let runtime = Handle::try_current();
        if let Err(e) = &runtime {
            tracing::error!(error = %e, "Query run started outside a tokio runtime");
        }

        for target in targets {
            if !is_eligible(target) {
                counters.on_skipped();
                tracing::debug!(ref_id = %target.ref_id, "Skipping query without topic");
                continue;
            }

            match self.resolver.resolve(target, scope, namespace) {
                Ok(query) => match &runtime {
                    Ok(handle) => {
                        let transport = Arc::clone(&self.transport);
                        let worker =
                            run_subscription(transport, query, tx.clone(), Arc::clone(&counters));
                        workers.push(handle.spawn(worker));
                    }
                    Err(_) => {
                        counters.on_transport_error();
                        pending.push_back(QueryResponse::Error {
                            error: QueryError::Transport(TransportError::subscribe(
                                &query.address,
                                "no tokio runtime to run the subscription",
                            )),
                            ref_id: query.ref_id,
                        });
                    }
                },
                Err(e) => {
                    counters.on_resolution_failure();
                    tracing::warn!(ref_id = %target.ref_id, error = %e, "Query resolution failed");
                    pending.push_back(QueryResponse::Error {
                        ref_id: target.ref_id.clone(),
                        error: QueryError::Resolution(e),
                    });
                }
            }
        }

        tracing::debug!(
            namespace = %namespace,
            targets = targets.len(),
            subscriptions = workers.len(),
            "Query run started"
        );

        MergedStream {
            pending,
            rx,
            workers,
            counters,
        }
    }
}

/// One transport subscription owned by a worker
///
/// Dropping the handle releases the subscription.
struct SubscriptionHandle {
    query: ResolvedQuery,
    frames: FrameStream,
    counters: Arc<RunCounters>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.counters.on_released();
        tracing::debug!(
            ref_id = %self.query.ref_id,
            address = %self.query.address,
            "Subscription released"
        );
    }
}

async fn run_subscription<T: StreamingTransport + ?Sized>(
    transport: Arc<T>,
    query: ResolvedQuery,
    tx: mpsc::Sender<QueryResponse>,
    counters: Arc<RunCounters>,
) {
    let key = query.address.to_string();

    let frames = match transport.subscribe(&query.address, query.metadata()).await {
        Ok(frames) => frames,
        Err(e) => {
            counters.on_transport_error();
            tracing::warn!(ref_id = %query.ref_id, address = %key, error = %e, "Subscribe failed");
            let _ = tx
                .send(QueryResponse::Error {
                    ref_id: query.ref_id,
                    error: QueryError::Transport(e),
                })
                .await;
            return;
        }
    };

    counters.on_opened();
    tracing::debug!(ref_id = %query.ref_id, address = %key, "Subscription opened");

    let mut handle = SubscriptionHandle {
        query,
        frames,
        counters: Arc::clone(&counters),
    };

    while let Some(item) = handle.frames.next().await {
        let ref_id = handle.query.ref_id.clone();
        let response = match item {
            Ok(frame) => QueryResponse::Data {
                ref_id,
                key: key.clone(),
                frame,
            },
            Err(e) => {
                counters.on_transport_error();
                tracing::warn!(ref_id = %ref_id, address = %key, error = %e, "Subscription error");
                QueryResponse::Error {
                    ref_id,
                    error: QueryError::Transport(e),
                }
            }
        };

        if tx.send(response).await.is_err() {
            // consumer is gone
            break;
        }
    }

    tracing::debug!(ref_id = %handle.query.ref_id, address = %key, "Subscription completed");
}

/// Merged, arrival-ordered stream of a query run
///
/// Not restartable; run the batch again for a fresh stream. Dropping it
/// cancels every subscription still open.
pub struct MergedStream {
    pending: VecDeque<QueryResponse>,
    rx: mpsc::Receiver<QueryResponse>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<RunCounters>,
}

impl MergedStream {
    /// Snapshot of this run's counters
    pub fn stats(&self) -> RunStats {
        self.counters.snapshot()
    }

    /// Number of workers started (one per resolved target)
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop the run, releasing every open subscription
    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for MergedStream {
    type Item = QueryResponse;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(item) = this.pending.pop_front() {
            return Poll::Ready(Some(item));
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(item)) => {
                if !item.is_error() {
                    this.counters.on_delivered();
                }
                Poll::Ready(Some(item))
            }
            other => other,
        }
    }
}

impl Drop for MergedStream {
    fn drop(&mut self) {
        let running = self.workers.iter().filter(|w| !w.is_finished()).count();
        for worker in &self.workers {
            worker.abort();
        }
        if running > 0 {
            tracing::debug!(running = running, "Query run cancelled");
        }
    }
}

impl std::fmt::Debug for MergedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedStream")
            .field("pending", &self.pending.len())
            .field("workers", &self.workers.len())
            .field("stats", &self.stats())
            .finish()
    }
}
