//! Caching of DNS provider zones for a DNS controller.
//!
//! A DNS controller reconciling entries against hosted DNS providers needs
//! to know which zones an account has and which records these zones
//! currently contain. Asking the provider every time is slow and quickly
//! runs into rate limits. This crate provides a cache that sits between the
//! reconciliation logic and the provider adapters.
//!
//! # Modules
//!
//! * [cache] contains the zone caches themselves and the
//!   [factory][cache::ZoneCacheFactory] creating them,
//! * [zone] and [state] contain the data model of hosted zones and their
//!   records,
//! * [store] contains the [record store][store::RecordStore] keeping cached
//!   zone states, and
//! * [error] contains the error type shared by providers and caches.
//!
//! The remaining modules provide the [configuration][config::Config], the
//! [metrics][metrics::Metrics] hooks, and an abstraction over the current
//! [time][clock::Clock].
//!
//! # Reference of Feature Flags
//!
//! * `serde`: Enables serialization of zones and change requests through
//!   the [serde](https://github.com/serde-rs/serde) crate.
//!
//! # Usage
//!
//! A provider adapter implements [cache::ZonesUpdater] and
//! [cache::StateUpdater] for an account and asks a shared
//! [factory][cache::ZoneCacheFactory] for a zone cache. From then on,
//! all lookups go through the returned [cache::ZoneCache]. After changing
//! records at the provider, the adapter passes the outcome to
//! [cache::ZoneCache::apply_requests] so the cached state follows along.
//! When the account goes away, [cache::ZoneCache::release] drops its zones
//! from the cache.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod state;
pub mod store;
pub mod zone;

pub use self::cache::{ZoneCache, ZoneCacheFactory, ZoneCacheType};
pub use self::config::Config;
pub use self::error::Error;
