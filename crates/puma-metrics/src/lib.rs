//! puma-metrics — the exporter's metric state and the loop that feeds it.
//!
//! # Architecture
//!
//! ```text
//! Refresher (single writer, one per process)
//!   └── each tick: ControlClient::fetch_status → decode → translate
//!
//! PumaMetrics (private prometheus::Registry)
//!   ├── scalar gauges      puma_thread_count, puma_workers, puma_gc_*, …
//!   └── gauge vectors      puma_backlog{index}, puma_running{index}, …
//!
//! render() → text exposition for /metrics (readers, any number)
//! ```
//!
//! Per-worker series are upserted by list position and never removed: a
//! worker that disappears from `/stats` keeps its last published values.

pub mod error;
pub mod exposition;
pub mod refresher;
pub mod registry;
pub mod translate;

pub use error::PollError;
pub use exposition::{CONTENT_TYPE, render};
pub use refresher::{PollReport, RefreshPlan, Refresher};
pub use registry::PumaMetrics;
pub use translate::translate;
