//! The zone states shared by all full zone caches of a factory.
//!
//! Refreshing a zone is serialized by a per-zone proxy. The proxy's lock is
//! held for the whole provider call, so concurrent lookups of the same zone
//! collapse into a single fetch while other zones are not held up. The
//! bookkeeping of proxies and used zones sits behind a separate lock that
//! is only held for short map updates and never across a provider call.
//!
//! Lock order: a proxy lock may be followed by the bookkeeping lock, never
//! the other way around. The record store and the forwarded domains cache
//! have their own locks which are taken last.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::{debug, info, trace};

use crate::clock::{Clock, Expiry};
use crate::config::StateTtlGetter;
use crate::error::Error;
use crate::state::{ChangeRequest, ZoneState};
use crate::store::RecordStore;
use crate::zone::{HostedZone, ZoneId};

use super::forwarded::ForwardedDomainsCache;
use super::{StateUpdater, ZoneCache};

//------------ ConsumerId ----------------------------------------------------

/// Identifies a zone cache using the shared zone states.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct ConsumerId(u64);

impl ConsumerId {
    /// Returns a new, process-wide unique id.
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ConsumerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

//------------ RefreshWindow -------------------------------------------------

/// When the cached state of a zone was last fetched.
#[derive(Clone, Copy, Debug, Default)]
struct RefreshWindow {
    /// When the last successful fetch was started.
    start: Option<OffsetDateTime>,

    /// When the last successful fetch was finished.
    end: Option<OffsetDateTime>,
}

impl RefreshWindow {
    fn is_expired(&self, now: OffsetDateTime, ttl: std::time::Duration) -> bool {
        match self.end {
            Some(end) => Expiry::after(end, ttl).is_expired(now),
            None => true,
        }
    }

    fn clear(&mut self) {
        *self = Default::default()
    }
}

//------------ ZoneStateProxy ------------------------------------------------

/// Serializes access to the cached state of one zone.
#[derive(Debug, Default)]
struct ZoneStateProxy {
    window: tokio::sync::Mutex<RefreshWindow>,

    /// Set once the proxy was dropped from the registry.
    ///
    /// Only changes while the bookkeeping lock is held.
    detached: AtomicBool,
}

impl ZoneStateProxy {
    fn detach(&self) {
        self.detached.store(true, Ordering::Release)
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

//------------ Bookkeeping ---------------------------------------------------

#[derive(Default)]
struct Bookkeeping {
    /// The proxies of all zones that were looked at since they last became
    /// unused.
    proxies: HashMap<ZoneId, Arc<ZoneStateProxy>>,

    /// The sorted ids of the zones each consumer currently uses.
    used_zones: HashMap<ConsumerId, Vec<ZoneId>>,
}

//------------ ZoneStates ----------------------------------------------------

/// The manager of the zone states shared between zone caches.
pub(crate) struct ZoneStates {
    state_ttl_getter: StateTtlGetter,
    clock: Arc<dyn Clock>,
    store: Arc<dyn RecordStore>,
    forwarded_domains: Arc<ForwardedDomainsCache>,
    bookkeeping: Mutex<Bookkeeping>,
}

impl ZoneStates {
    pub(crate) fn new(
        state_ttl_getter: StateTtlGetter,
        clock: Arc<dyn Clock>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        ZoneStates {
            state_ttl_getter,
            clock,
            store,
            forwarded_domains: Default::default(),
            bookkeeping: Default::default(),
        }
    }

    pub(crate) fn forwarded_domains_cache(&self) -> Arc<ForwardedDomainsCache> {
        self.forwarded_domains.clone()
    }

    /// Returns the state of a zone and whether it came from the cache.
    ///
    /// If the cached state of the zone has expired, it is fetched through
    /// `updater`, stored and returned as is. Otherwise a copy of the cached
    /// state is returned. A failed fetch discards whatever was cached for
    /// the zone.
    pub(crate) async fn get_zone_state(
        &self,
        zone: &HostedZone,
        updater: &dyn StateUpdater,
        cache: &dyn ZoneCache,
    ) -> Result<(ZoneState, bool), Error> {
        let zone_id = zone.id();
        let proxy = self.proxy(zone_id);
        let mut window = proxy.window.lock().await;

        let start = self.clock.now();
        let ttl = (self.state_ttl_getter)(zone_id);
        if proxy.is_detached() || window.is_expired(start, ttl) {
            trace!("Refreshing state of zone {zone_id}");
            match updater.update_state(zone, cache).await {
                Ok(state) => {
                    let end = self.clock.now();
                    if self.store_if_used(&proxy, zone, &state) {
                        window.start = Some(start);
                        window.end = Some(end);
                        debug!("Cached new state of zone {zone_id}");
                    }
                    Ok((state, false))
                }
                Err(err) => {
                    debug!("Refreshing state of zone {zone_id} failed: {err}");
                    self.clean(&proxy, zone_id, &mut window);
                    Err(err)
                }
            }
        } else {
            match self.store.clone_zone_state(zone) {
                Ok(state) => {
                    debug!("Using cached state of zone {zone_id}");
                    Ok((state, true))
                }
                Err(err) => {
                    self.clean(&proxy, zone_id, &mut window);
                    Err(err)
                }
            }
        }
    }

    /// Replays changes on the cached state of a zone.
    ///
    /// The requests are applied in order. If one of them fails, the cached
    /// state of the zone is discarded and the error returned.
    pub(crate) async fn execute_requests(
        &self,
        zone_id: &ZoneId,
        requests: &[ChangeRequest],
    ) -> Result<(), Error> {
        let proxy = match self.existing_proxy(zone_id) {
            Some(proxy) => proxy,
            None => return Ok(()),
        };
        let mut window = proxy.window.lock().await;
        if proxy.is_detached() || window.end.is_none() {
            // Nothing cached, nothing to keep up to date.
            return Ok(());
        }
        for request in requests {
            if let Err(err) = self.store.apply(zone_id, request) {
                self.clean(&proxy, zone_id, &mut window);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Checks whether an error means the cached state of a zone is stale.
    ///
    /// This is the case for an ownership conflict with an entry created
    /// after the cached state started being fetched. The state can not
    /// know about that entry, so it is discarded and `true` returned.
    pub(crate) async fn report_zone_state_conflict(
        &self,
        zone_id: &ZoneId,
        err: &Error,
    ) -> bool {
        let conflict = match err.owner_conflict() {
            Some(conflict) => conflict,
            None => return false,
        };
        let proxy = match self.existing_proxy(zone_id) {
            Some(proxy) => proxy,
            None => return false,
        };
        let mut window = proxy.window.lock().await;
        match window.start {
            Some(start) if conflict.entry_created_at > start => {
                info!(
                    "Discarding state of zone {zone_id}: entry for {} was \
                     created after the last refresh",
                    conflict.dns_name
                );
                self.clean(&proxy, zone_id, &mut window);
                true
            }
            _ => false,
        }
    }

    /// Discards the cached state of a zone.
    pub(crate) async fn clean_zone_state(&self, zone_id: &ZoneId) {
        match self.existing_proxy(zone_id) {
            Some(proxy) => {
                let mut window = proxy.window.lock().await;
                self.clean(&proxy, zone_id, &mut window);
            }
            None => {
                self.store.delete_zone(zone_id);
                self.forwarded_domains.delete_zone(zone_id);
            }
        }
    }

    /// Records the zones a consumer uses and drops all unused zones.
    ///
    /// An empty list removes the consumer. `zone_ids` must be sorted.
    pub(crate) fn update_used_zones(
        &self,
        consumer: ConsumerId,
        zone_ids: Vec<ZoneId>,
    ) {
        let mut books = self.bookkeeping.lock();
        let Bookkeeping {
            proxies,
            used_zones,
        } = &mut *books;

        if zone_ids.is_empty() {
            if used_zones.remove(&consumer).is_none() {
                return;
            }
        } else {
            if used_zones.get(&consumer) == Some(&zone_ids) {
                return;
            }
            let _ = used_zones.insert(consumer, zone_ids);
        }

        let used: HashSet<&ZoneId> = used_zones.values().flatten().collect();
        let mut unused: HashSet<ZoneId> = self
            .store
            .zone_ids()
            .into_iter()
            .filter(|zone_id| !used.contains(zone_id))
            .collect();
        unused.extend(
            proxies
                .keys()
                .filter(|zone_id| !used.contains(zone_id))
                .cloned(),
        );

        for zone_id in &unused {
            self.store.delete_zone(zone_id);
            self.forwarded_domains.delete_zone(zone_id);
            if let Some(proxy) = proxies.remove(zone_id) {
                proxy.detach();
            }
        }
        if !unused.is_empty() {
            debug!("Dropped {} unused zones from the cache", unused.len());
        }
    }

    //--- Internal helpers

    /// Returns the proxy of a zone, creating it if needed.
    fn proxy(&self, zone_id: &ZoneId) -> Arc<ZoneStateProxy> {
        self.bookkeeping
            .lock()
            .proxies
            .entry(zone_id.clone())
            .or_default()
            .clone()
    }

    fn existing_proxy(&self, zone_id: &ZoneId) -> Option<Arc<ZoneStateProxy>> {
        self.bookkeeping.lock().proxies.get(zone_id).cloned()
    }

    /// Stores a fetched state if the zone is in use.
    ///
    /// A zone is in use if its proxy has not been dropped and at least one
    /// consumer currently reports it.
    fn store_if_used(
        &self,
        proxy: &ZoneStateProxy,
        zone: &HostedZone,
        state: &ZoneState,
    ) -> bool {
        let state = state.clone();
        let books = self.bookkeeping.lock();
        if proxy.is_detached() {
            trace!("Not caching state of dropped zone {}", zone.id());
            return false;
        }
        let used = books
            .used_zones
            .values()
            .any(|ids| ids.binary_search(zone.id()).is_ok());
        if !used {
            trace!("Not caching state of unused zone {}", zone.id());
            return false;
        }
        self.store.set_zone(zone, state);
        true
    }

    /// Discards the state of a zone whose proxy lock is held.
    ///
    /// The entries of a detached proxy are gone already and the zone may
    /// have a new proxy by now, so only the window is cleared then.
    fn clean(
        &self,
        proxy: &ZoneStateProxy,
        zone_id: &ZoneId,
        window: &mut RefreshWindow,
    ) {
        window.clear();
        let _books = self.bookkeeping.lock();
        if proxy.is_detached() {
            return;
        }
        self.store.delete_zone(zone_id);
        self.forwarded_domains.delete_zone(zone_id);
    }

    //--- Inspection

    /// Returns the sorted ids of all zones with a cached state.
    #[cfg(test)]
    pub(crate) fn cached_zone_ids(&self) -> Vec<ZoneId> {
        let mut ids = self.store.zone_ids();
        ids.sort();
        ids
    }

    /// Returns the sorted ids of all zones used by any consumer.
    #[cfg(test)]
    pub(crate) fn used_zone_ids(&self) -> Vec<ZoneId> {
        let books = self.bookkeeping.lock();
        let mut ids: Vec<ZoneId> =
            books.used_zones.values().flatten().cloned().collect();
        ids.sort();
        ids.dedup();
        ids
    }

    #[cfg(test)]
    fn has_proxy(&self, zone_id: &ZoneId) -> bool {
        self.bookkeeping.lock().proxies.contains_key(zone_id)
    }

    #[cfg(test)]
    fn consumers(&self) -> usize {
        self.bookkeeping.lock().used_zones.len()
    }
}

impl fmt::Debug for ZoneStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneStates")
            .field("store", &self.store)
            .field("forwarded_domains", &self.forwarded_domains)
            .finish_non_exhaustive()
    }
}

//============ Tests =========================================================
