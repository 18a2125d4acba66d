//! StreamRoute Telemetry
//!
//! Routing metrics keyed by stream and rule id: incoming counters,
//! rule execution timers, exception and timeout meters. Consumed by the
//! routing engine, read back by tests and operators.

pub mod metrics;

pub use metrics::StreamMetrics;
