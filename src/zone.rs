//! Hosted zones as listed by a provider account.

use std::fmt;

//------------ ZoneId --------------------------------------------------------

/// A key that uniquely identifies a hosted zone.
///
/// A zone is identified by the type of the provider hosting it and the
/// provider specific zone id. Ids are only unique within one provider type,
/// so both parts are needed.
///
/// The derived ordering compares the provider type first and the id second.
/// It is used to produce a deterministic set of used zones.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneId {
    provider_type: String,
    id: String,
}

impl ZoneId {
    /// Creates a new zone id.
    pub fn new(provider_type: impl Into<String>, id: impl Into<String>) -> Self {
        ZoneId {
            provider_type: provider_type.into(),
            id: id.into(),
        }
    }

    /// Returns the provider type, e.g. `aws-route53`.
    pub fn provider_type(&self) -> &str {
        &self.provider_type
    }

    /// Returns the provider specific zone id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

//--- Display

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_type, self.id)
    }
}

//------------ HostedZone ----------------------------------------------------

/// A zone as returned by listing the zones of a provider account.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostedZone {
    id: ZoneId,
    domain: String,
    key: String,
    is_private: bool,
}

impl HostedZone {
    /// Creates a new hosted zone.
    ///
    /// The `key` is the handle the provider uses to address the zone in its
    /// API. For many providers it equals the zone id.
    pub fn new(
        id: ZoneId,
        domain: impl Into<String>,
        key: impl Into<String>,
        is_private: bool,
    ) -> Self {
        HostedZone {
            id,
            domain: domain.into(),
            key: key.into(),
            is_private,
        }
    }

    pub fn id(&self) -> &ZoneId {
        &self.id
    }

    /// Returns the base domain of the zone.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }
}

//------------ HostedZones ---------------------------------------------------

/// The zones of one provider account, in no particular order.
pub type HostedZones = Vec<HostedZone>;

/// Returns the ids of the given zones in ascending order.
///
/// Duplicate ids collapse into one entry.
pub fn sorted_zone_ids(zones: &[HostedZone]) -> Vec<ZoneId> {
    let mut ids: Vec<ZoneId> =
        zones.iter().map(|zone| zone.id().clone()).collect();
    ids.sort();
    ids.dedup();
    ids
}

//============ Tests =========================================================
