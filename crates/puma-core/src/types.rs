//! Decoded shapes of the Puma control app responses.
//!
//! Every numeric and boolean field tolerates being absent or `null`
//! (it decodes to zero / `false`); unknown fields are ignored. A value
//! of the wrong JSON type is still an error.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

// ── Schema hint ────────────────────────────────────────────────────

/// Which response family a fetched document belongs to.
///
/// Chosen from the endpoint that was polled and the configured mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// `/stats` of a single-process server.
    Stats,
    /// `/gc-stats`.
    GcStats,
    /// `/stats` of a clustered server.
    ClusterStats,
}

impl StatusKind {
    /// Control app path segment for this family.
    pub fn path(&self) -> &'static str {
        match self {
            StatusKind::Stats | StatusKind::ClusterStats => "stats",
            StatusKind::GcStats => "gc-stats",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Stats => "stats",
            StatusKind::GcStats => "gc-stats",
            StatusKind::ClusterStats => "cluster-stats",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Documents ──────────────────────────────────────────────────────

/// One decoded control app response.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamStatus {
    Stats(Stats),
    Gc(GcStats),
    Cluster(ClusterStats),
}

impl UpstreamStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            UpstreamStatus::Stats(_) => StatusKind::Stats,
            UpstreamStatus::Gc(_) => StatusKind::GcStats,
            UpstreamStatus::Cluster(_) => StatusKind::ClusterStats,
        }
    }
}

/// `/stats` of a single-process server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Threads currently spawned.
    #[serde(deserialize_with = "zero_if_null")]
    pub running: u64,
    /// Requests waiting for a thread.
    #[serde(deserialize_with = "zero_if_null")]
    pub backlog: u64,
}

/// `/stats` of a clustered server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClusterStats {
    #[serde(deserialize_with = "lenient_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "zero_if_null")]
    pub workers: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub booted_workers: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub old_workers: u64,
    /// Workers in upstream order. Position, not `index` or `pid`, is the
    /// join key used for labelling.
    #[serde(deserialize_with = "zero_if_null")]
    pub worker_status: Vec<WorkerStatus>,
}

/// One entry of `worker_status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerStatus {
    #[serde(deserialize_with = "zero_if_null")]
    pub index: u64,
    pub pid: Option<u64>,
    #[serde(deserialize_with = "zero_if_null")]
    pub booted: bool,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_checkin: Option<DateTime<Utc>>,
    /// Empty for workers that have not checked in yet.
    #[serde(deserialize_with = "zero_if_null")]
    pub last_status: WorkerLastStatus,
}

/// Thread pool counters reported by a worker at its last check-in.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerLastStatus {
    #[serde(deserialize_with = "zero_if_null")]
    pub backlog: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub running: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub pool_capacity: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub max_threads: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub requests_count: u64,
}

/// `/gc-stats`: Ruby's `GC.stat` hash.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GcStats {
    #[serde(deserialize_with = "zero_if_null")]
    pub count: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub minor_gc_count: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub major_gc_count: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_allocated_pages: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_sorted_length: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_allocatable_pages: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_available_slots: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_live_slots: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_free_slots: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_final_slots: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_marked_slots: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_swept_slots: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_eden_pages: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub heap_tomb_pages: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_allocated_pages: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_freed_pages: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_allocated_objects: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub total_freed_objects: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub malloc_increase_bytes: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub malloc_increase_bytes_limit: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub remembered_wb_unprotected_objects: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub remembered_wb_unprotected_objects_limit: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub old_objects: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub old_objects_limit: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub oldmalloc_increase_bytes: u64,
    #[serde(deserialize_with = "zero_if_null")]
    pub oldmalloc_increase_bytes_limit: u64,
}

/// Number of counters in [`GcStats`].
pub const GC_COUNTER_COUNT: usize = 26;

impl GcStats {
    /// Every counter paired with its `GC.stat` key, in a fixed order.
    pub fn counters(&self) -> [(&'static str, u64); GC_COUNTER_COUNT] {
        [
            ("count", self.count),
            ("minor_gc_count", self.minor_gc_count),
            ("major_gc_count", self.major_gc_count),
            ("heap_allocated_pages", self.heap_allocated_pages),
            ("heap_sorted_length", self.heap_sorted_length),
            ("heap_allocatable_pages", self.heap_allocatable_pages),
            ("heap_available_slots", self.heap_available_slots),
            ("heap_live_slots", self.heap_live_slots),
            ("heap_free_slots", self.heap_free_slots),
            ("heap_final_slots", self.heap_final_slots),
            ("heap_marked_slots", self.heap_marked_slots),
            ("heap_swept_slots", self.heap_swept_slots),
            ("heap_eden_pages", self.heap_eden_pages),
            ("heap_tomb_pages", self.heap_tomb_pages),
            ("total_allocated_pages", self.total_allocated_pages),
            ("total_freed_pages", self.total_freed_pages),
            ("total_allocated_objects", self.total_allocated_objects),
            ("total_freed_objects", self.total_freed_objects),
            ("malloc_increase_bytes", self.malloc_increase_bytes),
            ("malloc_increase_bytes_limit", self.malloc_increase_bytes_limit),
            (
                "remembered_wb_unprotected_objects",
                self.remembered_wb_unprotected_objects,
            ),
            (
                "remembered_wb_unprotected_objects_limit",
                self.remembered_wb_unprotected_objects_limit,
            ),
            ("old_objects", self.old_objects),
            ("old_objects_limit", self.old_objects_limit),
            ("oldmalloc_increase_bytes", self.oldmalloc_increase_bytes),
            (
                "oldmalloc_increase_bytes_limit",
                self.oldmalloc_increase_bytes_limit,
            ),
        ]
    }
}

// ── Field helpers ──────────────────────────────────────────────────

/// Treat an explicit `null` like a missing field.
fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Timestamps are informational; anything unparseable becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp))
}

/// Parse the formats Puma has emitted for `started_at` / `last_checkin`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    // Ruby's `Time#to_s` on a UTC time.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S UTC")
        .ok()
        .map(|naive| naive.and_utc())
}
