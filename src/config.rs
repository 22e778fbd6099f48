//! Configuration of the zone caches.

use std::cmp;
use std::sync::Arc;
use std::time::Duration;

use crate::zone::ZoneId;

/// Limits for how long a zones listing is trusted.
const ZONES_TTL: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(120),
    Duration::ZERO,
    Duration::from_secs(24 * 3600),
);

/// Limits for how long a cached zone state is trusted.
const ZONE_STATE_TTL: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(120),
    Duration::ZERO,
    Duration::from_secs(24 * 3600),
);

//------------ DefMinMax -----------------------------------------------------

/// The default and the permitted range of one of the two cache TTLs.
///
/// [`ZONES_TTL`] bounds [`Config::set_zones_ttl`] and [`ZONE_STATE_TTL`]
/// bounds [`Config::set_zone_state_ttl`]. Values outside the range are
/// clamped rather than rejected.
#[derive(Clone, Copy)]
struct DefMinMax<T> {
    /// The TTL used when none is configured.
    def: T,

    /// The shortest TTL accepted.
    min: T,

    /// The longest TTL accepted.
    max: T,
}

impl<T: Ord + Copy> DefMinMax<T> {
    const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    fn default(self) -> T {
        self.def
    }

    /// Clamps a configured TTL into the permitted range.
    fn limit(self, value: T) -> T {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}

//------------ StateTtlGetter ------------------------------------------------

/// Returns the time a cached zone state of the given zone is trusted.
///
/// This allows TTLs per account or even per zone.
pub type StateTtlGetter = Arc<dyn Fn(&ZoneId) -> Duration + Send + Sync>;

/// Returns a getter that uses the same TTL for every zone.
pub fn fixed_state_ttl(ttl: Duration) -> StateTtlGetter {
    Arc::new(move |_: &ZoneId| ttl)
}

//------------ Config --------------------------------------------------------

/// Configuration of a zone cache factory.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long a zones listing of an account is trusted.
    zones_ttl: Duration,

    /// How long a zone state is trusted unless a getter says otherwise.
    zone_state_ttl: Duration,

    /// Whether to never cache zone states.
    disable_zone_state_cache: bool,
}

impl Config {
    /// Creates a new config with default values.
    ///
    /// The default values are documented at the relevant set_* methods.
    pub fn new() -> Self {
        Default::default()
    }

    /// Set how long a zones listing is used before listing again.
    ///
    /// The value has to be at most 86,400 seconds (one day) and the default
    /// is 120 seconds. Failed listings are retried earlier, after a backoff
    /// of at most a quarter of this value.
    pub fn set_zones_ttl(&mut self, value: Duration) {
        self.zones_ttl = ZONES_TTL.limit(value)
    }

    /// Set how long a zone state is used before fetching it again.
    ///
    /// The value has to be at most 86,400 seconds (one day) and the default
    /// is 120 seconds. It only applies if the factory was not given a
    /// [`StateTtlGetter`].
    pub fn set_zone_state_ttl(&mut self, value: Duration) {
        self.zone_state_ttl = ZONE_STATE_TTL.limit(value)
    }

    /// Disable caching of zone states.
    ///
    /// If set, every zone cache only caches the zones listing. This is meant
    /// for diagnosing cache issues. The default is false.
    pub fn set_disable_zone_state_cache(&mut self, value: bool) {
        self.disable_zone_state_cache = value
    }

    pub fn zones_ttl(&self) -> Duration {
        self.zones_ttl
    }

    pub fn zone_state_ttl(&self) -> Duration {
        self.zone_state_ttl
    }

    pub fn disable_zone_state_cache(&self) -> bool {
        self.disable_zone_state_cache
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zones_ttl: ZONES_TTL.default(),
            zone_state_ttl: ZONE_STATE_TTL.default(),
            disable_zone_state_cache: false,
        }
    }
}

//============ Tests =========================================================
