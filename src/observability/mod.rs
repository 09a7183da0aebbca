//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher produces:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!     → spans.rs (one span per call group, keyed by group ID)
//!
//! Consumers:
//!     → whatever subscriber / recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; without one, updates are no-ops
//! - `init_logging` is a convenience for hosts without their own subscriber

pub mod logging;
pub mod metrics;
pub mod spans;
