//! In-memory registry of router state with per-class TTL caching.
//!
//! The registry fronts every *read* against a device so dashboards and
//! usage lookups do not hammer CPE-grade hardware. Entries carry a TTL by
//! data class (volatile stats, lists, stable data), and any mutating
//! router operation must call [`DeviceRegistry::invalidate`] so the next
//! read observes the device, not the cache. Correctness never depends on
//! this cache; idempotency checks go to the durable logs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::CacheTtlConfig;
use crate::domain::device::RouterDevice;
use crate::domain::foundation::{DeviceId, DomainError, Timestamp};
use crate::ports::{DeviceRepository, RouterClient, RouterError, RouterRow};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    ActiveUsers(DeviceId),
    SystemResources(DeviceId),
    HotspotUser(DeviceId, String),
    HotspotProfiles(DeviceId),
}

impl CacheKey {
    fn device_id(&self) -> &DeviceId {
        match self {
            CacheKey::ActiveUsers(id)
            | CacheKey::SystemResources(id)
            | CacheKey::HotspotUser(id, _)
            | CacheKey::HotspotProfiles(id) => id,
        }
    }
}

struct CacheEntry {
    rows: Vec<RouterRow>,
    expires_at: Instant,
}

/// Cached read layer over a [`RouterClient`], plus device health bookkeeping.
pub struct DeviceRegistry {
    router: Arc<dyn RouterClient>,
    devices: Arc<dyn DeviceRepository>,
    ttl: CacheTtlConfig,
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl DeviceRegistry {
    pub fn new(
        router: Arc<dyn RouterClient>,
        devices: Arc<dyn DeviceRepository>,
        ttl: CacheTtlConfig,
    ) -> Self {
        Self {
            router,
            devices,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Currently connected hotspot sessions (`/ip/hotspot/active`).
    pub async fn active_users(
        &self,
        device: &RouterDevice,
    ) -> Result<Vec<RouterRow>, RouterError> {
        let key = CacheKey::ActiveUsers(device.id);
        self.cached(key, self.ttl.list(), || {
            self.router.query(device, "/ip/hotspot/active", &[], &[])
        })
        .await
    }

    /// Device resource stats (`/system/resource`): uptime, version, load.
    pub async fn system_resources(
        &self,
        device: &RouterDevice,
    ) -> Result<Option<RouterRow>, RouterError> {
        let key = CacheKey::SystemResources(device.id);
        let rows = self
            .cached(key, self.ttl.volatile(), || {
                self.router.query(device, "/system/resource", &[], &[])
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Looks up one hotspot user by name.
    pub async fn hotspot_user(
        &self,
        device: &RouterDevice,
        name: &str,
    ) -> Result<Option<RouterRow>, RouterError> {
        let key = CacheKey::HotspotUser(device.id, name.to_string());
        let filters = [("name".to_string(), name.to_string())];
        let rows = self
            .cached(key, self.ttl.list(), || {
                self.router.query(device, "/ip/hotspot/user", &filters, &[])
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Hotspot user profiles configured on the device.
    pub async fn hotspot_profiles(
        &self,
        device: &RouterDevice,
    ) -> Result<Vec<RouterRow>, RouterError> {
        let key = CacheKey::HotspotProfiles(device.id);
        self.cached(key, self.ttl.stable(), || {
            self.router
                .query(device, "/ip/hotspot/user/profile", &[], &[])
        })
        .await
    }

    /// Drops every cached entry for a device. Must be called after any
    /// mutating operation against it.
    pub async fn invalidate(&self, device_id: &DeviceId) {
        let mut cache = self.cache.write().await;
        cache.retain(|key, _| key.device_id() != device_id);
    }

    /// Probes the device and persists the outcome on its record.
    ///
    /// A reachable device is marked online with its current uptime; an
    /// unreachable or erroring one is marked offline/error with the detail
    /// kept in `last_error`. Returns the updated device either way the
    /// probe goes; only persistence failures surface as errors.
    pub async fn check_health(
        &self,
        device: &RouterDevice,
    ) -> Result<RouterDevice, DomainError> {
        let mut updated = device.clone();

        match self
            .router
            .query(device, "/system/resource", &[], &[])
            .await
        {
            Ok(rows) => {
                let uptime = rows
                    .first()
                    .and_then(|row| row.get("uptime"))
                    .and_then(parse_uptime);
                updated.mark_online(Timestamp::now(), uptime);
                debug!(device = %device.name, ?uptime, "health check passed");
            }
            Err(RouterError::AuthFailed(detail)) => {
                updated.mark_error(format!("authentication failed: {detail}"));
                warn!(device = %device.name, %detail, "health check auth failure");
            }
            Err(err) => {
                updated.mark_offline(err.to_string());
                warn!(device = %device.name, error = %err, "health check failed");
            }
        }

        self.devices.update(&updated).await?;
        Ok(updated)
    }

    async fn cached<F, Fut>(
        &self,
        key: CacheKey,
        ttl: std::time::Duration,
        fetch: F,
    ) -> Result<Vec<RouterRow>, RouterError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<RouterRow>, RouterError>>,
    {
        let now = Instant::now();
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > now {
                    return Ok(entry.rows.clone());
                }
            }
        }

        let rows = fetch().await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            key,
            CacheEntry {
                rows: rows.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(rows)
    }
}

/// Parses RouterOS uptime notation (`1w2d3h4m5s`) into seconds.
fn parse_uptime(raw: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut number = String::new();

    for c in raw.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: u64 = number.parse().ok()?;
        number.clear();
        let multiplier = match c {
            'w' => 604_800,
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        total += value * multiplier;
    }

    if number.is_empty() {
        Some(total)
    } else {
        None
    }
}
