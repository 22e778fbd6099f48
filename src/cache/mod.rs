//! Caching of zone listings and zone states.
//!
//! A [`ZoneCache`] sits between the reconciliation of one provider account
//! and the provider itself. It answers three questions on behalf of the
//! provider: which zones the account has, what the current records of a
//! zone are, and how the records of a zone look after the controller
//! changed them.
//!
//! There are two strategies, created through the [`ZoneCacheFactory`]:
//!
//! * A zones-only cache always asks the provider. It exists so that callers
//!   can use the same interface regardless of whether caching is wanted.
//! * The full cache keeps the zones listing of its account for a TTL and
//!   keeps zone states in a store shared by all full caches of the same
//!   factory. Zone states are kept up to date with the changes the
//!   controller applies and are discarded whenever they may have become
//!   inaccurate.
//!
//! Each full cache is a *consumer* of the shared store and reports the
//! zones its account currently has. A zone is kept in the shared store only
//! as long as at least one consumer reports it.

mod forwarded;
mod full;
mod states;
mod zones_only;

pub mod factory;

pub use self::factory::{ZoneCacheFactory, ZoneCacheType};
pub use self::forwarded::ForwardedDomainsCache;
pub use self::full::FullZoneCache;
pub use self::zones_only::ZonesOnlyCache;

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Error;
use crate::state::{ChangeRequest, ZoneState};
use crate::zone::{HostedZone, HostedZones};

//------------ ZoneCache -----------------------------------------------------

/// The zone cache of one provider account.
pub trait ZoneCache: Send + Sync {
    /// Returns the zones of the account.
    fn get_zones(&self) -> BoxFuture<'_, Result<HostedZones, Error>>;

    /// Returns the state of a zone of the account.
    ///
    /// The returned state is owned by the caller. Modifying it never
    /// affects what later calls return.
    fn get_zone_state<'a>(
        &'a self,
        zone: &'a HostedZone,
    ) -> BoxFuture<'a, Result<ZoneState, Error>>;

    /// Updates the cached state of a zone after changing it at the provider.
    ///
    /// The caller applies `requests` to the provider first and passes the
    /// outcome as `write_result`. Only a successful write is replayed on
    /// the cached state. A failed write discards the cached state unless
    /// the failure was caused by throttling.
    fn apply_requests<'a>(
        &'a self,
        write_result: Result<(), &'a Error>,
        zone: &'a HostedZone,
        requests: &'a [ChangeRequest],
    ) -> BoxFuture<'a, ()>;

    /// Reports an error that may have been caused by a stale zone state.
    ///
    /// Returns `true` if the cached state of the zone was discarded because
    /// of it. The caller may then retry right away instead of waiting for
    /// the state to expire.
    fn report_zone_state_conflict<'a>(
        &'a self,
        zone: &'a HostedZone,
        err: &'a Error,
    ) -> BoxFuture<'a, bool>;

    /// Returns the cache of forwarded domains.
    fn forwarded_domains_cache(&self) -> Arc<ForwardedDomainsCache>;

    /// Releases all zones used by this cache.
    ///
    /// Called when the account goes away or is reconfigured.
    fn release(&self);
}

//------------ ZonesUpdater --------------------------------------------------

/// Lists the zones of a provider account.
///
/// The cache calls this whenever its listing is due for a refresh. Calls
/// must be idempotent.
pub trait ZonesUpdater: Send + Sync {
    fn update_zones<'a>(
        &'a self,
        cache: &'a dyn ZoneCache,
    ) -> BoxFuture<'a, Result<HostedZones, Error>>;
}

//------------ StateUpdater --------------------------------------------------

/// Fetches the complete state of a zone from the provider.
pub trait StateUpdater: Send + Sync {
    fn update_state<'a>(
        &'a self,
        zone: &'a HostedZone,
        cache: &'a dyn ZoneCache,
    ) -> BoxFuture<'a, Result<ZoneState, Error>>;
}

//============ Testing ======================================================

#[cfg(test)]
pub(crate) mod testing {
    //! Fake provider callbacks shared by the tests of the cache modules.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::FutureExt;
    use parking_lot::Mutex;

    use super::*;
    use crate::metrics::{Metrics, RequestType};
    use crate::state::{DnsSetName, RecordSet, RecordType};
    use crate::zone::ZoneId;

    pub fn init_logging() {
        // Initialize tracing based logging. Override with env var RUST_LOG,
        // e.g. RUST_LOG=trace.
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_thread_ids(true)
            .without_time()
            .try_init()
            .ok();
    }

    pub fn mk_zone(id: &str) -> HostedZone {
        HostedZone::new(
            ZoneId::new("aws-route53", id),
            format!("{id}.example.com"),
            id,
            false,
        )
    }

    pub fn mk_state(value: &str) -> ZoneState {
        let mut state = ZoneState::new();
        let _ = state
            .dns_set_entry(DnsSetName::new("www.example.com"))
            .set(RecordType::A, RecordSet::new(300, [value.to_string()]));
        state
    }

    //--- FakeZones

    /// A zones updater returning scripted results.
    ///
    /// Once the script is exhausted, the last result is repeated.
    #[derive(Default)]
    pub struct FakeZones {
        script: Mutex<Vec<Result<HostedZones, Error>>>,
        last: Mutex<Option<Result<HostedZones, Error>>>,
        calls: AtomicUsize,
    }

    impl FakeZones {
        pub fn new(
            script: impl IntoIterator<Item = Result<HostedZones, Error>>,
        ) -> Arc<Self> {
            let mut script: Vec<_> = script.into_iter().collect();
            script.reverse();
            Arc::new(FakeZones {
                script: Mutex::new(script),
                ..Default::default()
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ZonesUpdater for FakeZones {
        fn update_zones<'a>(
            &'a self,
            _cache: &'a dyn ZoneCache,
        ) -> BoxFuture<'a, Result<HostedZones, Error>> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop();
            let res = match next {
                Some(res) => {
                    *self.last.lock() = Some(res.clone());
                    res
                }
                None => self.last.lock().clone().unwrap_or(Ok(Vec::new())),
            };
            async move { res }.boxed()
        }
    }

    //--- FakeStates

    /// A state updater answering from a map of zone states.
    ///
    /// Zones without an entry fail with a provider error. Every fetch can
    /// be delayed to widen race windows.
    #[derive(Default)]
    pub struct FakeStates {
        states: Mutex<HashMap<ZoneId, Result<ZoneState, Error>>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeStates {
        pub fn new() -> Arc<Self> {
            Arc::new(Default::default())
        }

        pub fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(FakeStates {
                delay: Some(delay),
                ..Default::default()
            })
        }

        pub fn set(&self, zone: &HostedZone, state: Result<ZoneState, Error>) {
            let _ = self.states.lock().insert(zone.id().clone(), state);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StateUpdater for FakeStates {
        fn update_state<'a>(
            &'a self,
            zone: &'a HostedZone,
            _cache: &'a dyn ZoneCache,
        ) -> BoxFuture<'a, Result<ZoneState, Error>> {
            async move {
                let _ = self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                let res = self.states.lock().get(zone.id()).cloned();
                res.unwrap_or_else(|| {
                    Err(Error::provider(format!("no zone {}", zone.id())))
                })
            }
            .boxed()
        }
    }

    //--- CountingMetrics

    #[derive(Default)]
    pub struct CountingMetrics {
        pub cached_zones: AtomicUsize,
        pub cached_states: AtomicUsize,
        pub discarded: AtomicUsize,
    }

    impl CountingMetrics {
        pub fn get(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    impl Metrics for CountingMetrics {
        fn add_generic_requests(&self, request_type: RequestType, n: u64) {
            if request_type == RequestType::CachedGetZones {
                let _ =
                    self.cached_zones.fetch_add(n as usize, Ordering::SeqCst);
            }
        }

        fn add_zone_requests(
            &self,
            _zone_id: &ZoneId,
            request_type: RequestType,
            n: u64,
        ) {
            if request_type == RequestType::CachedGetZoneState {
                let _ =
                    self.cached_states.fetch_add(n as usize, Ordering::SeqCst);
            }
        }

        fn add_zone_cache_discarding(&self, _zone_id: &ZoneId) {
            let _ = self.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }
}
