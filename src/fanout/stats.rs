//! Statistics for a query run

use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of a query run's counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Targets submitted
    pub targets: usize,
    /// Targets dropped by the eligibility filter
    pub skipped: usize,
    /// Targets whose resolution failed
    pub resolution_failures: usize,
    /// Subscriptions successfully opened
    pub subscriptions_opened: usize,
    /// Subscriptions currently held open
    pub active_subscriptions: usize,
    /// Transport errors reported (open failures and in-stream errors)
    pub transport_errors: usize,
    /// Frames handed to the consumer
    pub frames_delivered: usize,
}

/// Live counters shared by a merged stream and its workers
#[derive(Debug, Default)]
pub(crate) struct RunCounters {
    targets: AtomicUsize,
    skipped: AtomicUsize,
    resolution_failures: AtomicUsize,
    subscriptions_opened: AtomicUsize,
    active_subscriptions: AtomicUsize,
    transport_errors: AtomicUsize,
    frames_delivered: AtomicUsize,
}

impl RunCounters {
    pub(crate) fn new(targets: usize) -> Self {
        let counters = Self::default();
        counters.targets.store(targets, Ordering::Relaxed);
        counters
    }

    pub(crate) fn on_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_resolution_failure(&self) {
        self.resolution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_opened(&self) {
        self.subscriptions_opened.fetch_add(1, Ordering::Relaxed);
        self.active_subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_released(&self) {
        self.active_subscriptions.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn on_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RunStats {
        RunStats {
            targets: self.targets.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            subscriptions_opened: self.subscriptions_opened.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
        }
    }
}
