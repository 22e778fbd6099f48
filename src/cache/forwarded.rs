//! Caching of forwarded domains.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::zone::ZoneId;

//------------ ForwardedDomainsCache -----------------------------------------

/// The subdomains of a zone that are delegated to other name servers.
///
/// Provider adapters determine these while fetching a zone state and store
/// them here. Entries are dropped together with the cached state of their
/// zone.
#[derive(Debug, Default)]
pub struct ForwardedDomainsCache {
    domains: Mutex<HashMap<ZoneId, Vec<String>>>,
}

impl ForwardedDomainsCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the forwarded domains of a zone, if known.
    pub fn get(&self, zone_id: &ZoneId) -> Option<Vec<String>> {
        self.domains.lock().get(zone_id).cloned()
    }

    /// Sets the forwarded domains of a zone.
    ///
    /// Passing `None` removes the entry. This is different from passing an
    /// empty list which records that the zone has no forwarded domains.
    pub fn set(&self, zone_id: &ZoneId, value: Option<Vec<String>>) {
        let mut domains = self.domains.lock();
        match value {
            Some(value) => {
                let _ = domains.insert(zone_id.clone(), value);
            }
            None => {
                let _ = domains.remove(zone_id);
            }
        }
    }

    pub(crate) fn delete_zone(&self, zone_id: &ZoneId) {
        let _ = self.domains.lock().remove(zone_id);
    }
}

//============ Tests =========================================================
