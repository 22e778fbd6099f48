//! The zone cache that caches nothing.

use std::sync::{Arc, OnceLock};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::Error;
use crate::state::{ChangeRequest, ZoneState};
use crate::zone::{HostedZone, HostedZones};

use super::forwarded::ForwardedDomainsCache;
use super::{StateUpdater, ZoneCache, ZonesUpdater};

//------------ ZonesOnlyCache ------------------------------------------------

/// A zone cache passing every lookup on to the provider.
///
/// Changes are not tracked since there is no cached state to keep up to
/// date. Only the forwarded domains are kept, in a cache private to this
/// value.
pub struct ZonesOnlyCache {
    zones_updater: Arc<dyn ZonesUpdater>,
    state_updater: Arc<dyn StateUpdater>,
    forwarded_domains: OnceLock<Arc<ForwardedDomainsCache>>,
}

impl ZonesOnlyCache {
    pub fn new(
        zones_updater: Arc<dyn ZonesUpdater>,
        state_updater: Arc<dyn StateUpdater>,
    ) -> Self {
        ZonesOnlyCache {
            zones_updater,
            state_updater,
            forwarded_domains: OnceLock::new(),
        }
    }
}

impl ZoneCache for ZonesOnlyCache {
    fn get_zones(&self) -> BoxFuture<'_, Result<HostedZones, Error>> {
        self.zones_updater.update_zones(self)
    }

    fn get_zone_state<'a>(
        &'a self,
        zone: &'a HostedZone,
    ) -> BoxFuture<'a, Result<ZoneState, Error>> {
        self.state_updater.update_state(zone, self)
    }

    fn apply_requests<'a>(
        &'a self,
        _write_result: Result<(), &'a Error>,
        _zone: &'a HostedZone,
        _requests: &'a [ChangeRequest],
    ) -> BoxFuture<'a, ()> {
        async {}.boxed()
    }

    fn report_zone_state_conflict<'a>(
        &'a self,
        _zone: &'a HostedZone,
        _err: &'a Error,
    ) -> BoxFuture<'a, bool> {
        async { false }.boxed()
    }

    fn forwarded_domains_cache(&self) -> Arc<ForwardedDomainsCache> {
        self.forwarded_domains.get_or_init(Default::default).clone()
    }

    fn release(&self) {}
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{mk_state, mk_zone, FakeStates, FakeZones};
    use crate::error::AlreadyBusyForOwner;

    #[tokio::test]
    async fn every_lookup_hits_the_provider() {
        let zones = FakeZones::new([Ok(vec![mk_zone("a")])]);
        let states = FakeStates::new();
        let zone = mk_zone("a");
        states.set(&zone, Ok(mk_state("1.1.1.1")));
        let cache = ZonesOnlyCache::new(zones.clone(), states.clone());

        for _ in 0..3 {
            assert_eq!(cache.get_zones().await.unwrap(), vec![zone.clone()]);
            assert_eq!(
                cache.get_zone_state(&zone).await.unwrap(),
                mk_state("1.1.1.1")
            );
        }
        assert_eq!(zones.calls(), 3);
        assert_eq!(states.calls(), 3);
    }

    #[tokio::test]
    async fn changes_and_conflicts_are_ignored() {
        let states = FakeStates::new();
        let zone = mk_zone("a");
        states.set(&zone, Err(Error::provider("down")));
        let cache = ZonesOnlyCache::new(FakeZones::new([]), states.clone());

        cache.apply_requests(Ok(()), &zone, &[]).await;
        let err: Error = AlreadyBusyForOwner::new(
            "www.example.com",
            "other",
            time::OffsetDateTime::UNIX_EPOCH,
        )
        .into();
        assert!(!cache.report_zone_state_conflict(&zone, &err).await);
        cache.release();
        assert!(cache.get_zone_state(&zone).await.is_err());
        assert_eq!(states.calls(), 1);
    }

    #[test]
    fn forwarded_domains_cache_is_created_once() {
        let cache = ZonesOnlyCache::new(FakeZones::new([]), FakeStates::new());
        let first = cache.forwarded_domains_cache();
        assert!(Arc::ptr_eq(&first, &cache.forwarded_domains_cache()));
    }
}
