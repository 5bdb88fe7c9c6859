//! Storefront Probe: synthetic checkout-flow prober for agent-driven commerce
//!
//! This library walks a storefront through discovery, selection, cart,
//! checkout and payment-protocol detection using plain unauthenticated HTTP,
//! and reports exactly where and why an autonomous purchasing agent stalls.

pub mod cli;
pub mod config;
pub mod probe;
pub mod report;
pub mod store;
pub mod transport;

// Re-export the probe entry points
pub use probe::{normalize_domain, ProbeError, ProbeRequest, Prober};
pub use probe::{RunStatus, StepAction, StepStatus, TestRun, TestType};

// Re-export configuration
pub use config::{ConfigError, ProbeConfig};

// Re-export persistence
pub use store::{MemoryStore, NullStore, ProbeStore, SqliteStore, StoreError};

// Re-export transports
pub use transport::{FakeTransport, HttpTransport, Transport, UreqTransport};

// Re-export rendering
pub use report::render_table;
