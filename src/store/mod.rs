//! Storage of zone state snapshots.
//!
//! A [`RecordStore`] keeps at most one [`ZoneState`] per zone. It does no
//! expiry of its own: deciding when a snapshot is stale and when it is no
//! longer needed is left to the zone cache that owns the store.

mod in_memory;

pub use self::in_memory::InMemory;

use std::fmt::Debug;

use crate::error::Error;
use crate::state::{ChangeRequest, ZoneState};
use crate::zone::{HostedZone, ZoneId};

//------------ RecordStore ---------------------------------------------------

pub trait RecordStore: Debug + Send + Sync {
    /// Stores the state of a zone, replacing any earlier one.
    fn set_zone(&self, zone: &HostedZone, state: ZoneState);

    /// Returns a deep copy of the stored state of a zone.
    ///
    /// Fails with [`Error::ZoneNotCached`] if there is none.
    fn clone_zone_state(&self, zone: &HostedZone) -> Result<ZoneState, Error>;

    /// Applies a change to the stored state of a zone.
    ///
    /// A failed change leaves the stored state as it was before the call.
    fn apply(
        &self,
        zone_id: &ZoneId,
        request: &ChangeRequest,
    ) -> Result<(), Error>;

    /// Removes the state of a zone.
    fn delete_zone(&self, zone_id: &ZoneId);

    /// Returns the ids of all zones with a stored state.
    fn zone_ids(&self) -> Vec<ZoneId>;
}
