//! Observability hooks.
//!
//! The zone cache does not collect metrics itself. It calls into a
//! [`Metrics`] implementation supplied by whoever creates the cache. All
//! methods are fire-and-forget and have empty default implementations.

use std::fmt;

use crate::zone::ZoneId;

//------------ RequestType ---------------------------------------------------

/// The kind of a provider request that was answered from the cache.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RequestType {
    /// A zones listing served from the zones cache.
    CachedGetZones,

    /// A zone state served from the shared zone state cache.
    CachedGetZoneState,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::CachedGetZones => "cached_getzones",
            RequestType::CachedGetZoneState => "cached_getzonestate",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ Metrics -------------------------------------------------------

pub trait Metrics: Send + Sync {
    /// Counts requests not related to a single zone.
    fn add_generic_requests(&self, request_type: RequestType, n: u64) {
        let _ = (request_type, n);
    }

    /// Counts requests for a single zone.
    fn add_zone_requests(
        &self,
        zone_id: &ZoneId,
        request_type: RequestType,
        n: u64,
    ) {
        let _ = (zone_id, request_type, n);
    }

    /// Counts a discarded zone cache after a failed write.
    fn add_zone_cache_discarding(&self, zone_id: &ZoneId) {
        let _ = zone_id;
    }
}

//------------ NullMetrics ---------------------------------------------------

/// Metrics that are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMetrics;

impl Metrics for NullMetrics {}
