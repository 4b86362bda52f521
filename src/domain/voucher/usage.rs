//! Usage snapshot reported to callers of `get_usage`.

use serde::{Deserialize, Serialize};

/// Point-in-time view of a voucher's consumption, assembled from the local
/// record and the router's live hotspot data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Live hotspot sessions currently authenticated with this voucher.
    pub active_connections: u32,

    /// Total bytes (in + out) attributed to the hotspot user.
    pub total_data_used_bytes: u64,

    /// Whether the validity window has elapsed.
    pub is_expired: bool,

    /// Whether the voucher is currently active.
    pub is_active: bool,

    /// Share of the data quota consumed; `None` for unlimited vouchers.
    pub data_usage_percentage: Option<f64>,
}
