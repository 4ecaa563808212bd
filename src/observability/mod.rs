//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! transaction / query / events produce:
//!     → tracing events (structured key/value fields)
//!     → metrics.rs counters and gauges (metrics facade)
//!
//! Application:
//!     → logging::init (optional subscriber)
//!     → installs its own metrics recorder/exporter
//! ```
//!
//! # Design Decisions
//! - The library never installs a subscriber or recorder on its own
//! - Metric updates are fire-and-forget; without a recorder they are no-ops

pub mod logging;
pub mod metrics;
