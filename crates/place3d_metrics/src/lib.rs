//! Place3D Metrics - counters and latency tracking for the coordinator
//!
//! Instrumentation compiles down to no-ops unless the `metrics` feature is
//! enabled, so the coordinator can call it unconditionally.
//!
//! # Usage
//!
//! ```ignore
//! use place3d_metrics::{Counter, LatencyWindow};
//!
//! let mut counters = Counter::new();
//! let mut apply = LatencyWindow::new(256);
//! apply.time(|| { /* apply one command */ });
//! counters.increment("intents.accepted", 1);
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod latency;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use latency::LatencyWindow;

/// Whether instrumentation is compiled in.
pub const ENABLED: bool = cfg!(feature = "metrics");

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> { Vec::new() }
    pub fn reset_all(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug)]
pub struct LatencyWindow;

#[cfg(not(feature = "metrics"))]
impl LatencyWindow {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn record(&mut self, _sample: std::time::Duration) {}
    pub fn time<F, R>(&mut self, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
    pub fn mean(&self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn max(&self) -> std::time::Duration { std::time::Duration::ZERO }
}
