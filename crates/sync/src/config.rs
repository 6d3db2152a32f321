//! Deploy-configurable tuning for the sync engine.
//!
//! Loaded the same way the reference engine crate loads its own config: a
//! `serde`-derived struct with per-field defaults, so a deployment can
//! override just the fields it cares about from a `sync.toml` file.

use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    150
}

fn max_sync_limit() -> usize {
    1000
}

fn content_transfer_budget() -> u64 {
    5 * 1024 * 1024
}

fn revision_frequency_secs() -> u64 {
    300
}

fn page_size() -> usize {
    500
}

fn settle_delay_ms() -> u64 {
    1000
}

/// Tuning knobs for the sync engine, the transfer calculator, and the
/// transition runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Effective page size when a `get_items` request supplies no limit.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Hard ceiling on the effective limit regardless of what a request
    /// asks for.
    #[serde(default = "max_sync_limit")]
    pub max_sync_limit: usize,
    /// Byte budget a single `get_items` response's item content may not
    /// exceed (barring the single-oversized-item exception).
    #[serde(default = "content_transfer_budget")]
    pub content_transfer_budget: u64,
    /// Minimum elapsed time since an item's previous update before another
    /// save re-triggers a revision snapshot request.
    #[serde(default = "revision_frequency_secs")]
    pub revision_frequency_secs: u64,
    /// Page size used by the transition runner's copy/verify phases.
    #[serde(default = "page_size")]
    pub page_size: usize,
    /// Delay between the transition runner's cleanup and verify phases, to
    /// let target-side indexing settle.
    #[serde(default = "settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Tolerance window, in microseconds, for the save validator's
    /// stale-write check: an incoming `updated_at_timestamp` within this
    /// many microseconds of the stored value is not treated as a sync
    /// conflict. Zero by default (strict); deployments with meaningful
    /// clock skew between client and server may widen it.
    #[serde(default)]
    pub sync_conflict_tolerance_micros: u64,
    /// Content types a save may never target. Empty by default.
    #[serde(default)]
    pub forbidden_content_types: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_sync_limit: max_sync_limit(),
            content_transfer_budget: content_transfer_budget(),
            revision_frequency_secs: revision_frequency_secs(),
            page_size: page_size(),
            settle_delay_ms: settle_delay_ms(),
            sync_conflict_tolerance_micros: 0,
            forbidden_content_types: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Clamp a client-requested limit into `[1, max_sync_limit]`, falling
    /// back to `default_limit` when the request supplies none.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            None => self.default_limit,
            Some(limit) => limit.clamp(1, self.max_sync_limit),
        }
    }
}
