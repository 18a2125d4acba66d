//! StreamRoute Engine
//!
//! Classifies every ingested message against operator-defined routing
//! rules and determines which streams it belongs to.
//!
//! This crate provides:
//! - The matcher library (one pure predicate per rule type)
//! - Immutable, fingerprinted engine generations in two construction
//!   strategies (field-indexed tally and flat early-exit)
//! - Deadline-bounded regex evaluation with per-stream fault accounting
//!   and auto-pause
//! - A router holding the live generation behind a lock-free swap, with
//!   a periodic background rebuild

pub mod config;
pub mod engine;
pub mod fault;
pub mod fingerprint;
pub mod matcher;
pub mod rule;
pub mod router;

pub use config::{EngineConfig, EngineVariant};
pub use engine::{EarlyExitEngine, Engine, IndexedEngine, StreamTestMatch};
pub use fault::FaultManager;
pub use matcher::Matcher;
pub use router::StreamRouter;
pub use rule::Rule;
