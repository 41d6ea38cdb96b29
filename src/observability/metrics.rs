// Counters for data source calls

use crate::datasource::FetchErrorKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector shared by the registry and the server
#[derive(Debug, Default)]
pub struct Metrics {
    topics_total: AtomicU64,
    data_total: AtomicU64,
    availability_checks: AtomicU64,
    errors_total: AtomicU64,
    timeouts_total: AtomicU64,
    init_failures_total: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub topics_total: u64,
    pub data_total: u64,
    pub availability_checks: u64,
    pub errors_total: u64,
    pub timeouts_total: u64,
    pub init_failures_total: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_topics(&self) {
        self.topics_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_data(&self) {
        self.data_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_availability_checks(&self) {
        self.availability_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_init_failures(&self) {
        self.init_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed fetch; timeouts are also tracked separately
    pub fn record_error(&self, kind: FetchErrorKind) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
        if kind == FetchErrorKind::Timeout {
            self.timeouts_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            topics_total: self.topics_total.load(Ordering::Relaxed),
            data_total: self.data_total.load(Ordering::Relaxed),
            availability_checks: self.availability_checks.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            timeouts_total: self.timeouts_total.load(Ordering::Relaxed),
            init_failures_total: self.init_failures_total.load(Ordering::Relaxed),
        }
    }
}
