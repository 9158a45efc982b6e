use extract::ResolutionReport;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    contract_violations: AtomicUsize,
    llm_calls: AtomicUsize,

    // Timing (in microseconds)
    total_resolve_time_us: AtomicU64,
    total_extract_time_us: AtomicU64,

    // Counts
    batches_resolved: AtomicUsize,
    entities_resolved: AtomicUsize,
    relationships_resolved: AtomicUsize,
    broken_links: AtomicUsize,
    merged_duplicates: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_contract_violation(&self) {
        self.contract_violations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resolution(
        &self,
        duration: Duration,
        entities: usize,
        relationships: usize,
        report: &ResolutionReport,
    ) {
        self.total_resolve_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.batches_resolved.fetch_add(1, Ordering::Relaxed);
        self.entities_resolved.fetch_add(entities, Ordering::Relaxed);
        self.relationships_resolved.fetch_add(relationships, Ordering::Relaxed);
        self.broken_links.fetch_add(report.broken_links.len(), Ordering::Relaxed);
        self.merged_duplicates.fetch_add(report.merged.len(), Ordering::Relaxed);
    }

    pub fn record_llm_call(&self, duration: Duration) {
        self.total_extract_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.llm_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            contract_violations: self.contract_violations.load(Ordering::Relaxed),
            llm_calls: self.llm_calls.load(Ordering::Relaxed),
            avg_resolve_time_ms: avg_time_ms(&self.total_resolve_time_us, &self.batches_resolved),
            avg_llm_time_ms: avg_time_ms(&self.total_extract_time_us, &self.llm_calls),
            batches_resolved: self.batches_resolved.load(Ordering::Relaxed),
            entities_resolved: self.entities_resolved.load(Ordering::Relaxed),
            relationships_resolved: self.relationships_resolved.load(Ordering::Relaxed),
            broken_links: self.broken_links.load(Ordering::Relaxed),
            merged_duplicates: self.merged_duplicates.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    let cnt = count.load(Ordering::Relaxed) as f64;
    if cnt > 0.0 {
        total / cnt / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub contract_violations: usize,
    pub llm_calls: usize,
    pub avg_resolve_time_ms: f64,
    pub avg_llm_time_ms: f64,
    pub batches_resolved: usize,
    pub entities_resolved: usize,
    pub relationships_resolved: usize,
    pub broken_links: usize,
    pub merged_duplicates: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
