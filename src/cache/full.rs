//! The zone cache caching both zones listing and zone states.

use std::cmp;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::clock::{Clock, Expiry};
use crate::error::Error;
use crate::metrics::{Metrics, RequestType};
use crate::state::{ChangeRequest, ZoneState};
use crate::zone::{sorted_zone_ids, HostedZone, HostedZones};

use super::forwarded::ForwardedDomainsCache;
use super::states::{ConsumerId, ZoneStates};
use super::{StateUpdater, ZoneCache, ZonesUpdater};

/// The fixed part of the backoff after a failed zones listing.
const BACKOFF_STEP: Duration = Duration::from_secs(2);

//------------ FullZoneCache -------------------------------------------------

/// A zone cache for one account using the shared zone states.
///
/// The zones listing is kept for the zones TTL. A failed listing is kept
/// for a backoff that grows with every further failure. The zones of the
/// last listing are reported to the shared zone states as the zones used
/// by this cache. Dropping the cache releases them.
pub struct FullZoneCache {
    consumer: ConsumerId,
    zones_ttl: Duration,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn Metrics>,
    zones_updater: Arc<dyn ZonesUpdater>,
    state_updater: Arc<dyn StateUpdater>,
    zone_states: Arc<ZoneStates>,
    listing: tokio::sync::Mutex<ZonesListing>,
}

/// The last zones listing of an account.
#[derive(Default)]
struct ZonesListing {
    /// The outcome of the last listing.
    last: Option<Result<HostedZones, Error>>,

    /// When the last listing expires.
    next: Option<Expiry>,

    /// The current backoff after failed listings.
    backoff: Duration,
}

impl ZonesListing {
    /// Returns the last outcome if it is still valid.
    fn current(
        &self,
        now: OffsetDateTime,
    ) -> Option<&Result<HostedZones, Error>> {
        match (self.next, self.last.as_ref()) {
            (Some(next), Some(last)) if !next.is_expired(now) => Some(last),
            _ => None,
        }
    }

    /// Increases and returns the backoff.
    fn next_backoff(&mut self, zones_ttl: Duration) -> Duration {
        let next =
            (self.backoff.saturating_mul(5) / 4).saturating_add(BACKOFF_STEP);
        self.backoff = cmp::min(next, zones_ttl / 4);
        self.backoff
    }
}

impl FullZoneCache {
    pub(crate) fn new(
        zones_ttl: Duration,
        clock: Arc<dyn Clock>,
        metrics: Arc<dyn Metrics>,
        zones_updater: Arc<dyn ZonesUpdater>,
        state_updater: Arc<dyn StateUpdater>,
        zone_states: Arc<ZoneStates>,
    ) -> Self {
        FullZoneCache {
            consumer: ConsumerId::next(),
            zones_ttl,
            clock,
            metrics,
            zones_updater,
            state_updater,
            zone_states,
            listing: Default::default(),
        }
    }

    async fn get_zones_impl(&self) -> Result<HostedZones, Error> {
        let mut listing = self.listing.lock().await;
        if let Some(last) = listing.current(self.clock.now()) {
            self.metrics
                .add_generic_requests(RequestType::CachedGetZones, 1);
            return last.clone();
        }

        let res = self.zones_updater.update_zones(self).await;
        let updated = self.clock.now();
        let used = match &res {
            Ok(zones) => {
                listing.backoff = Duration::ZERO;
                listing.next = Some(Expiry::after(updated, self.zones_ttl));
                debug!("Listed {} zones", zones.len());
                sorted_zone_ids(zones)
            }
            Err(err) => {
                let backoff = listing.next_backoff(self.zones_ttl);
                listing.next = Some(Expiry::after(updated, backoff));
                warn!(
                    "Listing zones failed, retrying in {}s: {err}",
                    backoff.as_secs_f32()
                );
                Vec::new()
            }
        };
        self.zone_states.update_used_zones(self.consumer, used);
        listing.last = Some(res.clone());
        res
    }

    async fn get_zone_state_impl(
        &self,
        zone: &HostedZone,
    ) -> Result<ZoneState, Error> {
        let (state, cached) = self
            .zone_states
            .get_zone_state(zone, self.state_updater.as_ref(), self)
            .await?;
        if cached {
            self.metrics.add_zone_requests(
                zone.id(),
                RequestType::CachedGetZoneState,
                1,
            );
        }
        Ok(state)
    }

    async fn apply_requests_impl(
        &self,
        write_result: Result<(), &Error>,
        zone: &HostedZone,
        requests: &[ChangeRequest],
    ) {
        match write_result {
            Ok(()) => {
                let res =
                    self.zone_states.execute_requests(zone.id(), requests).await;
                if let Err(err) = res {
                    info!(
                        "Zone cache of {} discarded because replaying the \
                         changes failed: {err}",
                        zone.id()
                    );
                }
            }
            Err(err) if err.is_throttling() => {
                info!(
                    "Zone cache of {} untouched, writing was only \
                     throttled",
                    zone.id()
                );
            }
            Err(err) => {
                info!(
                    "Zone cache of {} discarded because writing failed: {err}",
                    zone.id()
                );
                self.zone_states.clean_zone_state(zone.id()).await;
                self.metrics.add_zone_cache_discarding(zone.id());
            }
        }
    }
}

//--- ZoneCache

impl ZoneCache for FullZoneCache {
    fn get_zones(&self) -> BoxFuture<'_, Result<HostedZones, Error>> {
        self.get_zones_impl().boxed()
    }

    fn get_zone_state<'a>(
        &'a self,
        zone: &'a HostedZone,
    ) -> BoxFuture<'a, Result<ZoneState, Error>> {
        self.get_zone_state_impl(zone).boxed()
    }

    fn apply_requests<'a>(
        &'a self,
        write_result: Result<(), &'a Error>,
        zone: &'a HostedZone,
        requests: &'a [ChangeRequest],
    ) -> BoxFuture<'a, ()> {
        self.apply_requests_impl(write_result, zone, requests).boxed()
    }

    fn report_zone_state_conflict<'a>(
        &'a self,
        zone: &'a HostedZone,
        err: &'a Error,
    ) -> BoxFuture<'a, bool> {
        self.zone_states
            .report_zone_state_conflict(zone.id(), err)
            .boxed()
    }

    fn forwarded_domains_cache(&self) -> Arc<ForwardedDomainsCache> {
        self.zone_states.forwarded_domains_cache()
    }

    fn release(&self) {
        self.zone_states.update_used_zones(self.consumer, Vec::new());
    }
}

//--- Drop

impl Drop for FullZoneCache {
    fn drop(&mut self) {
        self.release()
    }
}

//--- Debug

impl fmt::Debug for FullZoneCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FullZoneCache")
            .field("consumer", &self.consumer)
            .field("zones_ttl", &self.zones_ttl)
            .field("zone_states", &self.zone_states)
            .finish_non_exhaustive()
    }
}

//============ Tests =========================================================
