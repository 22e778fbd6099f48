//! Error types.
//!
//! Errors reported by a provider pass through the zone cache without being
//! wrapped. Callers inspect them again after the cache has seen them, e.g.
//! via [`Error::is_throttling`] or [`Error::owner_conflict`], so the
//! classification must survive.

use std::fmt;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::state::{DnsSetName, RecordType};
use crate::zone::ZoneId;

//------------ Error ---------------------------------------------------------

/// An error from a provider or from the zone cache itself.
///
/// The type is cheap to clone since the zones cache hands out the error of
/// the last zones listing until the next refresh.
#[derive(Clone, Debug)]
pub enum Error {
    /// The provider rejected the call because of rate limiting.
    ///
    /// A throttled call is assumed to not have changed anything on the
    /// provider side.
    Throttled(String),

    /// A DNS entry is owned by a different controller instance.
    AlreadyBusyForOwner(AlreadyBusyForOwner),

    /// Any other provider error.
    Provider(Arc<dyn std::error::Error + Send + Sync>),

    /// The zone has no cached state.
    ZoneNotCached(ZoneId),

    /// A change request could not be applied to a cached zone state.
    Apply(ZoneId, ApplyError),
}

impl Error {
    /// Creates a generic provider error from a message.
    pub fn provider(msg: impl Into<String>) -> Self {
        Error::Provider(Arc::new(Message(msg.into())))
    }

    /// Wraps any other error as a generic provider error.
    pub fn from_provider<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Provider(Arc::new(err))
    }

    /// Returns whether the error is the result of throttling.
    pub fn is_throttling(&self) -> bool {
        matches!(self, Error::Throttled(_))
    }

    /// Returns the details of an ownership conflict, if this is one.
    pub fn owner_conflict(&self) -> Option<&AlreadyBusyForOwner> {
        match self {
            Error::AlreadyBusyForOwner(conflict) => Some(conflict),
            _ => None,
        }
    }
}

//--- From

impl From<AlreadyBusyForOwner> for Error {
    fn from(conflict: AlreadyBusyForOwner) -> Self {
        Error::AlreadyBusyForOwner(conflict)
    }
}

//--- Display and Error

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Throttled(msg) => write!(f, "throttled: {msg}"),
            Error::AlreadyBusyForOwner(conflict) => conflict.fmt(f),
            Error::Provider(err) => err.fmt(f),
            Error::ZoneNotCached(zone_id) => {
                write!(f, "zone {zone_id} not cached")
            }
            Error::Apply(zone_id, err) => {
                write!(f, "cannot apply change to zone {zone_id}: {err}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Provider(err) => Some(err.as_ref()),
            Error::Apply(_, err) => Some(err),
            _ => None,
        }
    }
}

//------------ AlreadyBusyForOwner -------------------------------------------

/// A DNS entry is already claimed by another owner.
///
/// The creation time of the claiming entry allows to decide whether the
/// cached zone state can know about that claim at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlreadyBusyForOwner {
    pub dns_name: String,
    pub owner: String,
    pub entry_created_at: OffsetDateTime,
}

impl AlreadyBusyForOwner {
    pub fn new(
        dns_name: impl Into<String>,
        owner: impl Into<String>,
        entry_created_at: OffsetDateTime,
    ) -> Self {
        AlreadyBusyForOwner {
            dns_name: dns_name.into(),
            owner: owner.into(),
            entry_created_at,
        }
    }
}

impl fmt::Display for AlreadyBusyForOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DNS name {} already busy for owner {} (entry created at {})",
            self.dns_name, self.owner, self.entry_created_at
        )
    }
}

impl std::error::Error for AlreadyBusyForOwner {}

//------------ ApplyError ----------------------------------------------------

/// A change request does not fit the cached zone state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ApplyError {
    /// A create found the record set already present.
    RecordSetExists(DnsSetName, RecordType),

    /// A delete did not find the record set.
    RecordSetMissing(DnsSetName, RecordType),

    /// A create or update carried no records to add.
    MissingAddition(DnsSetName, RecordType),
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyError::RecordSetExists(name, rtype) => {
                write!(f, "record set {name} {rtype} already exists")
            }
            ApplyError::RecordSetMissing(name, rtype) => {
                write!(f, "record set {name} {rtype} does not exist")
            }
            ApplyError::MissingAddition(name, rtype) => {
                write!(f, "no records given for {name} {rtype}")
            }
        }
    }
}

impl std::error::Error for ApplyError {}

//------------ Message -------------------------------------------------------

/// A provider error that only consists of a message.
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

//============ Tests =========================================================
