//! Creating zone caches.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::{fixed_state_ttl, Config, StateTtlGetter};
use crate::metrics::Metrics;
use crate::store::{InMemory, RecordStore};

use super::full::FullZoneCache;
use super::states::ZoneStates;
use super::zones_only::ZonesOnlyCache;
use super::{StateUpdater, ZoneCache, ZonesUpdater};

//------------ ZoneCacheType -------------------------------------------------

/// The caching strategy of a zone cache.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ZoneCacheType {
    /// Cache nothing, ask the provider every time.
    CacheZonesOnly,

    /// Cache zones listing and zone states.
    #[default]
    CacheZoneState,
}

//------------ ZoneCacheFactory ----------------------------------------------

/// Creates the zone caches of all accounts.
///
/// All full zone caches created by a factory and its clones share the same
/// zone states.
#[derive(Clone, Debug)]
pub struct ZoneCacheFactory {
    zones_ttl: Duration,
    disable_zone_state_cache: bool,
    clock: Arc<dyn Clock>,
    zone_states: Arc<ZoneStates>,
}

impl ZoneCacheFactory {
    /// Creates a factory using the TTLs of the config.
    pub fn new(config: &Config) -> Self {
        Self::with_state_ttl_getter(
            config,
            fixed_state_ttl(config.zone_state_ttl()),
        )
    }

    /// Creates a factory asking a getter for the TTL of zone states.
    ///
    /// The zone state TTL of the config is ignored.
    pub fn with_state_ttl_getter(
        config: &Config,
        state_ttl_getter: StateTtlGetter,
    ) -> Self {
        Self::with_clock(config, state_ttl_getter, Arc::new(SystemClock))
    }

    /// Creates a factory with an explicit source of time.
    pub fn with_clock(
        config: &Config,
        state_ttl_getter: StateTtlGetter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_store(
            config,
            state_ttl_getter,
            clock,
            Arc::new(InMemory::new()),
        )
    }

    /// Creates a factory keeping zone states in the given record store.
    ///
    /// The store should be empty. All zone caches of the factory share it.
    pub fn with_store(
        config: &Config,
        state_ttl_getter: StateTtlGetter,
        clock: Arc<dyn Clock>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        ZoneCacheFactory {
            zones_ttl: config.zones_ttl(),
            disable_zone_state_cache: config.disable_zone_state_cache(),
            zone_states: Arc::new(ZoneStates::new(
                state_ttl_getter,
                clock.clone(),
                store,
            )),
            clock,
        }
    }

    /// Creates a factory with fixed TTLs for tests.
    ///
    /// The TTLs are used as given, without applying the limits of
    /// [`Config`].
    pub fn new_for_test(
        zones_ttl: Duration,
        state_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut factory = Self::with_clock(
            &Config::default(),
            fixed_state_ttl(state_ttl),
            clock,
        );
        factory.zones_ttl = zones_ttl;
        factory
    }

    /// Creates the zone cache of an account.
    ///
    /// If caching of zone states was disabled in the config, a zones-only
    /// cache is created regardless of `cache_type`.
    pub fn create_zone_cache(
        &self,
        cache_type: ZoneCacheType,
        metrics: Arc<dyn Metrics>,
        zones_updater: Arc<dyn ZonesUpdater>,
        state_updater: Arc<dyn StateUpdater>,
    ) -> Arc<dyn ZoneCache> {
        match cache_type {
            ZoneCacheType::CacheZoneState if !self.disable_zone_state_cache => {
                Arc::new(FullZoneCache::new(
                    self.zones_ttl,
                    self.clock.clone(),
                    metrics,
                    zones_updater,
                    state_updater,
                    self.zone_states.clone(),
                ))
            }
            _ => Arc::new(ZonesOnlyCache::new(zones_updater, state_updater)),
        }
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{mk_state, mk_zone, FakeStates, FakeZones};
    use crate::clock::FakeClock;
    use crate::metrics::NullMetrics;

    fn create(
        factory: &ZoneCacheFactory,
        cache_type: ZoneCacheType,
        states: &Arc<FakeStates>,
    ) -> Arc<dyn ZoneCache> {
        factory.create_zone_cache(
            cache_type,
            Arc::new(NullMetrics),
            FakeZones::new([Ok(vec![mk_zone("a")])]),
            states.clone(),
        )
    }

    #[tokio::test]
    async fn cache_type_selects_strategy() {
        let factory = ZoneCacheFactory::new_for_test(
            Duration::from_secs(60),
            Duration::from_secs(60),
            Arc::new(FakeClock::default()),
        );
        let zone = mk_zone("a");

        let states = FakeStates::new();
        states.set(&zone, Ok(mk_state("1.1.1.1")));
        let cache = create(&factory, ZoneCacheType::CacheZoneState, &states);
        let _ = cache.get_zones().await.unwrap();
        let _ = cache.get_zone_state(&zone).await.unwrap();
        let _ = cache.get_zone_state(&zone).await.unwrap();
        assert_eq!(states.calls(), 1);

        let states = FakeStates::new();
        states.set(&zone, Ok(mk_state("1.1.1.1")));
        let cache = create(&factory, ZoneCacheType::CacheZonesOnly, &states);
        let _ = cache.get_zone_state(&zone).await.unwrap();
        let _ = cache.get_zone_state(&zone).await.unwrap();
        assert_eq!(states.calls(), 2);
    }

    #[tokio::test]
    async fn disabled_state_cache_forces_zones_only() {
        let mut config = Config::new();
        config.set_disable_zone_state_cache(true);
        let factory = ZoneCacheFactory::with_clock(
            &config,
            fixed_state_ttl(Duration::from_secs(60)),
            Arc::new(FakeClock::default()),
        );
        let zone = mk_zone("a");
        let states = FakeStates::new();
        states.set(&zone, Ok(mk_state("1.1.1.1")));

        let cache = create(&factory, ZoneCacheType::CacheZoneState, &states);
        let _ = cache.get_zones().await.unwrap();
        let _ = cache.get_zone_state(&zone).await.unwrap();
        let _ = cache.get_zone_state(&zone).await.unwrap();
        assert_eq!(states.calls(), 2);
    }

    #[tokio::test]
    async fn caches_share_zone_states() {
        let factory = ZoneCacheFactory::new_for_test(
            Duration::from_secs(60),
            Duration::from_secs(60),
            Arc::new(FakeClock::default()),
        );
        let clone = factory.clone();
        let zone = mk_zone("a");
        let states = FakeStates::new();
        states.set(&zone, Ok(mk_state("1.1.1.1")));

        let first = create(&factory, ZoneCacheType::CacheZoneState, &states);
        let second = create(&clone, ZoneCacheType::CacheZoneState, &states);
        let _ = first.get_zones().await.unwrap();
        let _ = second.get_zones().await.unwrap();

        let _ = first.get_zone_state(&zone).await.unwrap();
        let _ = second.get_zone_state(&zone).await.unwrap();
        assert_eq!(states.calls(), 1);
        assert!(Arc::ptr_eq(
            &first.forwarded_domains_cache(),
            &second.forwarded_domains_cache()
        ));
    }

    #[tokio::test]
    async fn zone_states_go_to_given_store() {
        let store = Arc::new(InMemory::new());
        let factory = ZoneCacheFactory::with_store(
            &Config::default(),
            fixed_state_ttl(Duration::from_secs(60)),
            Arc::new(FakeClock::default()),
            store.clone(),
        );
        let zone = mk_zone("a");
        let states = FakeStates::new();
        states.set(&zone, Ok(mk_state("1.1.1.1")));

        let cache = create(&factory, ZoneCacheType::CacheZoneState, &states);
        let _ = cache.get_zones().await.unwrap();
        let _ = cache.get_zone_state(&zone).await.unwrap();
        assert_eq!(store.zone_ids(), vec![zone.id().clone()]);
        assert_eq!(store.zone(zone.id()), Some(zone.clone()));

        cache.release();
        assert!(store.zone_ids().is_empty());
    }
}
