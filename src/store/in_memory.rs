//! An in-memory record store.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{ApplyError, Error};
use crate::state::{ChangeAction, ChangeRequest, ZoneState};
use crate::zone::{HostedZone, ZoneId};

use super::RecordStore;

//------------ InMemory ------------------------------------------------------

/// A record store keeping all zone states in a hash map.
#[derive(Debug, Default)]
pub struct InMemory {
    zones: RwLock<HashMap<ZoneId, StoredZone>>,
}

impl InMemory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the zone a state was stored for.
    pub fn zone(&self, zone_id: &ZoneId) -> Option<HostedZone> {
        self.zones.read().get(zone_id).map(|stored| stored.zone.clone())
    }
}

impl RecordStore for InMemory {
    fn set_zone(&self, zone: &HostedZone, state: ZoneState) {
        let stored = StoredZone {
            zone: zone.clone(),
            state,
        };
        let _ = self.zones.write().insert(zone.id().clone(), stored);
    }

    fn clone_zone_state(&self, zone: &HostedZone) -> Result<ZoneState, Error> {
        self.zones
            .read()
            .get(zone.id())
            .map(|stored| stored.state.clone())
            .ok_or_else(|| Error::ZoneNotCached(zone.id().clone()))
    }

    fn apply(
        &self,
        zone_id: &ZoneId,
        request: &ChangeRequest,
    ) -> Result<(), Error> {
        let mut zones = self.zones.write();
        let stored = zones
            .get_mut(zone_id)
            .ok_or_else(|| Error::ZoneNotCached(zone_id.clone()))?;
        stored
            .apply(request)
            .map_err(|err| Error::Apply(zone_id.clone(), err))?;
        trace!("Applied {request} to cached zone {zone_id}");
        Ok(())
    }

    fn delete_zone(&self, zone_id: &ZoneId) {
        let _ = self.zones.write().remove(zone_id);
    }

    fn zone_ids(&self) -> Vec<ZoneId> {
        self.zones.read().keys().cloned().collect()
    }
}

//------------ StoredZone ----------------------------------------------------

#[derive(Debug)]
struct StoredZone {
    zone: HostedZone,
    state: ZoneState,
}

impl StoredZone {
    fn apply(&mut self, request: &ChangeRequest) -> Result<(), ApplyError> {
        let name = &request.dns_set_name;
        let rtype = &request.record_type;
        match request.action {
            ChangeAction::Create | ChangeAction::Update => {
                let addition = match &request.addition {
                    Some(addition) => addition.clone(),
                    None => {
                        return Err(ApplyError::MissingAddition(
                            name.clone(),
                            rtype.clone(),
                        ))
                    }
                };
                if request.action == ChangeAction::Create {
                    let exists = self
                        .state
                        .dns_set(name)
                        .and_then(|set| set.get(rtype))
                        .is_some();
                    if exists {
                        return Err(ApplyError::RecordSetExists(
                            name.clone(),
                            rtype.clone(),
                        ));
                    }
                }
                let _ = self
                    .state
                    .dns_set_entry(name.clone())
                    .set(rtype.clone(), addition);
            }
            ChangeAction::Delete => {
                let set = self.state.dns_set_mut(name).ok_or_else(|| {
                    ApplyError::RecordSetMissing(name.clone(), rtype.clone())
                })?;
                if set.remove(rtype).is_none() {
                    return Err(ApplyError::RecordSetMissing(
                        name.clone(),
                        rtype.clone(),
                    ));
                }
                if set.is_empty() {
                    let _ = self.state.remove_dns_set(name);
                }
            }
        }
        Ok(())
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DnsSetName, RecordSet, RecordType};

    fn zone() -> HostedZone {
        HostedZone::new(
            ZoneId::new("aws-route53", "Z1"),
            "example.com",
            "Z1",
            false,
        )
    }

    fn records(ttl: u32, value: &str) -> RecordSet {
        RecordSet::new(ttl, [value.to_string()])
    }

    #[test]
    fn unknown_zone_is_not_cached() {
        let store = InMemory::new();
        assert!(matches!(
            store.clone_zone_state(&zone()),
            Err(Error::ZoneNotCached(_))
        ));
        let req = ChangeRequest::create(
            DnsSetName::new("a.example.com"),
            RecordType::A,
            records(60, "1.1.1.1"),
        );
        assert!(matches!(
            store.apply(zone().id(), &req),
            Err(Error::ZoneNotCached(_))
        ));
    }

    #[test]
    fn create_update_delete() {
        let store = InMemory::new();
        let zone = zone();
        store.set_zone(&zone, ZoneState::new());
        let name = DnsSetName::new("a.example.com");

        store
            .apply(
                zone.id(),
                &ChangeRequest::create(
                    name.clone(),
                    RecordType::A,
                    records(60, "1.1.1.1"),
                ),
            )
            .unwrap();
        store
            .apply(
                zone.id(),
                &ChangeRequest::update(
                    name.clone(),
                    RecordType::A,
                    records(300, "2.2.2.2"),
                ),
            )
            .unwrap();
        let state = store.clone_zone_state(&zone).unwrap();
        assert_eq!(
            state.dns_set(&name).unwrap().get(&RecordType::A),
            Some(&records(300, "2.2.2.2"))
        );

        store
            .apply(
                zone.id(),
                &ChangeRequest::delete(name.clone(), RecordType::A, None),
            )
            .unwrap();
        let state = store.clone_zone_state(&zone).unwrap();
        assert!(state.dns_set(&name).is_none());
    }

    #[test]
    fn failed_change_leaves_state_untouched() {
        let store = InMemory::new();
        let zone = zone();
        let name = DnsSetName::new("a.example.com");
        let mut state = ZoneState::new();
        let _ = state
            .dns_set_entry(name.clone())
            .set(RecordType::A, records(60, "1.1.1.1"));
        store.set_zone(&zone, state.clone());

        let err = store
            .apply(
                zone.id(),
                &ChangeRequest::create(
                    name.clone(),
                    RecordType::A,
                    records(60, "3.3.3.3"),
                ),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Apply(_, ApplyError::RecordSetExists(_, _))
        ));

        let err = store
            .apply(
                zone.id(),
                &ChangeRequest::delete(name, RecordType::Txt, None),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Apply(_, ApplyError::RecordSetMissing(_, _))
        ));
        assert_eq!(store.clone_zone_state(&zone).unwrap(), state);
    }

    #[test]
    fn delete_zone() {
        let store = InMemory::new();
        let zone = zone();
        store.set_zone(&zone, ZoneState::new());
        assert_eq!(store.zone_ids(), vec![zone.id().clone()]);
        assert_eq!(store.zone(zone.id()), Some(zone.clone()));
        store.delete_zone(zone.id());
        assert!(store.zone_ids().is_empty());
    }
}
