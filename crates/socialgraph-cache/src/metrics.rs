use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use socialgraph_core::{Result, SocialGraphError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tracing::debug;

const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Longest trailing window accepted by `history`.
pub const MAX_HISTORY_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Moving average over a bounded sample window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverage {
    window_size: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            values: VecDeque::with_capacity(window_size),
            sum: 0.0,
        }
    }

    pub fn add_value(&mut self, value: f64) {
        if self.values.len() >= self.window_size {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }
}

/// Configuration for metrics collection behavior.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Number of latency samples kept for averaging.
    pub latency_window: usize,
    /// Interval between history snapshots.
    pub snapshot_interval: Duration,
    /// Maximum number of retained snapshots.
    pub max_snapshots: usize,
    /// Maximum age of a retained snapshot.
    pub retention: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            latency_window: 1000,
            snapshot_interval: Duration::from_secs(60),
            // One snapshot per minute for seven days.
            max_snapshots: 7 * 24 * 60,
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Point-in-time aggregate for the dashboard. `hit_rate` is a percentage
/// in [0,100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub hit_rate: f64,
    pub average_latency_ms: f64,
    pub memory_usage_bytes: u64,
    pub keys_count: usize,
}

/// One entry of the append-only metrics time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: SystemTime,
    pub hit_rate: f64,
    pub average_latency_ms: f64,
    pub memory_usage_bytes: u64,
    pub keys_count: usize,
}

/// Records the outcome and latency of every cache access and materializes
/// time-bucketed history snapshots for dashboard consumption.
///
/// Counters are atomic so request-serving tasks update them without
/// coordination; the snapshot ticker only reads them.
pub struct MetricsCollector {
    hits: AtomicU64,
    misses: AtomicU64,
    latencies_ms: RwLock<MovingAverage>,
    history: RwLock<VecDeque<MetricsSnapshot>>,
    snapshots: broadcast::Sender<MetricsSnapshot>,
    config: MetricsConfig,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_config(MetricsConfig::default())
    }

    pub fn with_config(config: MetricsConfig) -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            latencies_ms: RwLock::new(MovingAverage::new(config.latency_window)),
            history: RwLock::new(VecDeque::new()),
            snapshots,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_latency(&self, latency: Duration) {
        self.latencies_ms
            .write()
            .add_value(latency.as_secs_f64() * 1000.0);
    }

    /// Hit percentage in [0,100]. Zero, not NaN, when nothing was recorded.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.latencies_ms.read().average()
    }

    /// Current aggregate, with `keys_count`/`memory_usage_bytes` sampled
    /// from the cache by the caller.
    pub fn current_metrics(&self, keys_count: usize, memory_usage_bytes: u64) -> CurrentMetrics {
        CurrentMetrics {
            hit_rate: self.hit_rate(),
            average_latency_ms: self.average_latency_ms(),
            memory_usage_bytes,
            keys_count,
        }
    }

    /// Append a snapshot to the bounded history and publish it to
    /// subscribers.
    pub fn take_snapshot(&self, keys_count: usize, memory_usage_bytes: u64) -> MetricsSnapshot {
        self.snapshot_at(SystemTime::now(), keys_count, memory_usage_bytes)
    }

    fn snapshot_at(
        &self,
        timestamp: SystemTime,
        keys_count: usize,
        memory_usage_bytes: u64,
    ) -> MetricsSnapshot {
        let snapshot = MetricsSnapshot {
            timestamp,
            hit_rate: self.hit_rate(),
            average_latency_ms: self.average_latency_ms(),
            memory_usage_bytes,
            keys_count,
        };

        {
            let mut history = self.history.write();
            history.push_back(snapshot);

            let cutoff = SystemTime::now().checked_sub(self.config.retention);
            while history.len() > self.config.max_snapshots
                || matches!((history.front(), cutoff), (Some(front), Some(cutoff)) if front.timestamp < cutoff)
            {
                history.pop_front();
            }
        }

        debug!(keys_count, memory_usage_bytes, "metrics snapshot recorded");
        let _ = self.snapshots.send(snapshot);
        snapshot
    }

    /// Snapshots within the trailing `period`, oldest first.
    pub fn history(&self, period: Duration) -> Vec<MetricsSnapshot> {
        let history = self.history.read();
        match SystemTime::now().checked_sub(period) {
            Some(cutoff) => history
                .iter()
                .filter(|s| s.timestamp >= cutoff)
                .copied()
                .collect(),
            None => history.iter().copied().collect(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    /// Push channel for dashboards that want live updates instead of
    /// polling.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricsSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        *self.latencies_ms.write() = MovingAverage::new(self.config.latency_window);
        self.history.write().clear();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a trailing-window period like `"90s"`, `"15m"`, `"1h"`, `"7d"`.
pub fn parse_period(period: &str) -> Result<Duration> {
    let invalid = || SocialGraphError::InvalidParameter(format!("invalid period: {:?}", period));

    let (number, unit) = period.split_at(period.len().saturating_sub(1));
    let value: u64 = number.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }

    let seconds = match unit {
        "s" => value,
        "m" => value * 60,
        "h" => value * 60 * 60,
        "d" => value * 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    let duration = Duration::from_secs(seconds);
    if duration > MAX_HISTORY_PERIOD {
        return Err(invalid());
    }
    Ok(duration)
}
