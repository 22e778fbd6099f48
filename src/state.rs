//! Snapshots of the records of a zone and changes to them.
//!
//! A [`ZoneState`] holds the DNS sets of a zone as fetched from the provider.
//! A DNS set groups all record sets sharing one owner name (and, for
//! providers supporting routing policies, one set identifier). Changes the
//! controller performs on the provider are described by [`ChangeRequest`]s
//! which can be replayed on a cached snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

//------------ RecordType ----------------------------------------------------

/// The type of a record set.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Ns,
    Txt,
    Mx,
    Srv,
    Caa,

    /// Any other type, by its mnemonic.
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(mnemonic) => mnemonic,
        }
    }
}

//--- FromStr

impl FromStr for RecordType {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rtype = match s.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "NS" => RecordType::Ns,
            "TXT" => RecordType::Txt,
            "MX" => RecordType::Mx,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            other => RecordType::Other(other.into()),
        };
        Ok(rtype)
    }
}

//--- Display

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ DnsSetName ----------------------------------------------------

/// The name of a DNS set.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DnsSetName {
    dns_name: String,
    set_identifier: String,
}

impl DnsSetName {
    /// Creates a name without a set identifier.
    pub fn new(dns_name: impl Into<String>) -> Self {
        Self::with_set_identifier(dns_name, "")
    }

    /// Creates a name for a routing policy set.
    pub fn with_set_identifier(
        dns_name: impl Into<String>,
        set_identifier: impl Into<String>,
    ) -> Self {
        DnsSetName {
            dns_name: dns_name.into(),
            set_identifier: set_identifier.into(),
        }
    }

    pub fn dns_name(&self) -> &str {
        &self.dns_name
    }

    /// Returns the set identifier or an empty string if there is none.
    pub fn set_identifier(&self) -> &str {
        &self.set_identifier
    }
}

impl fmt::Display for DnsSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.set_identifier.is_empty() {
            f.write_str(&self.dns_name)
        } else {
            write!(f, "{}#{}", self.dns_name, self.set_identifier)
        }
    }
}

//------------ RecordSet -----------------------------------------------------

/// The records of one type of a DNS set.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordSet {
    /// The TTL of the records in seconds.
    pub ttl: u32,

    /// The record values in their presentation format.
    pub records: Vec<String>,
}

impl RecordSet {
    pub fn new(ttl: u32, records: impl IntoIterator<Item = String>) -> Self {
        RecordSet {
            ttl,
            records: records.into_iter().collect(),
        }
    }
}

//------------ DnsSet --------------------------------------------------------

/// All record sets of one DNS set name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DnsSet {
    sets: BTreeMap<RecordType, RecordSet>,
}

impl DnsSet {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, rtype: &RecordType) -> Option<&RecordSet> {
        self.sets.get(rtype)
    }

    /// Sets the record set of the given type, returning the previous one.
    pub fn set(
        &mut self,
        rtype: RecordType,
        record_set: RecordSet,
    ) -> Option<RecordSet> {
        self.sets.insert(rtype, record_set)
    }

    pub fn remove(&mut self, rtype: &RecordType) -> Option<RecordSet> {
        self.sets.remove(rtype)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordType, &RecordSet)> {
        self.sets.iter()
    }
}

//------------ ZoneState -----------------------------------------------------

/// A snapshot of the DNS sets of a zone.
///
/// Cloning a zone state is a deep copy. The zone cache relies on this: a
/// consumer may freely modify a state it received without affecting the
/// cached snapshot.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ZoneState {
    dns_sets: BTreeMap<DnsSetName, DnsSet>,
}

impl ZoneState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn dns_set(&self, name: &DnsSetName) -> Option<&DnsSet> {
        self.dns_sets.get(name)
    }

    pub fn dns_set_mut(&mut self, name: &DnsSetName) -> Option<&mut DnsSet> {
        self.dns_sets.get_mut(name)
    }

    /// Returns the DNS set of the given name, adding an empty one if needed.
    pub fn dns_set_entry(&mut self, name: DnsSetName) -> &mut DnsSet {
        self.dns_sets.entry(name).or_default()
    }

    pub fn remove_dns_set(&mut self, name: &DnsSetName) -> Option<DnsSet> {
        self.dns_sets.remove(name)
    }

    /// Returns the DNS sets ordered by name.
    pub fn dns_sets(&self) -> impl Iterator<Item = (&DnsSetName, &DnsSet)> {
        self.dns_sets.iter()
    }

    pub fn len(&self) -> usize {
        self.dns_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dns_sets.is_empty()
    }
}

//------------ ChangeAction --------------------------------------------------

/// What a change request does to a record set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeAction::Create => f.write_str("create"),
            ChangeAction::Update => f.write_str("update"),
            ChangeAction::Delete => f.write_str("delete"),
        }
    }
}

//------------ ChangeRequest -------------------------------------------------

/// A single change of one record set.
///
/// The same request is first sent to the provider and, once the provider
/// accepted it, replayed on the cached zone state.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeRequest {
    pub action: ChangeAction,
    pub dns_set_name: DnsSetName,
    pub record_type: RecordType,

    /// The new records. Required for creates and updates.
    pub addition: Option<RecordSet>,

    /// The records to be removed, if known.
    pub deletion: Option<RecordSet>,
}

impl ChangeRequest {
    pub fn create(
        dns_set_name: DnsSetName,
        record_type: RecordType,
        addition: RecordSet,
    ) -> Self {
        ChangeRequest {
            action: ChangeAction::Create,
            dns_set_name,
            record_type,
            addition: Some(addition),
            deletion: None,
        }
    }

    pub fn update(
        dns_set_name: DnsSetName,
        record_type: RecordType,
        addition: RecordSet,
    ) -> Self {
        ChangeRequest {
            action: ChangeAction::Update,
            dns_set_name,
            record_type,
            addition: Some(addition),
            deletion: None,
        }
    }

    pub fn delete(
        dns_set_name: DnsSetName,
        record_type: RecordType,
        deletion: Option<RecordSet>,
    ) -> Self {
        ChangeRequest {
            action: ChangeAction::Delete,
            dns_set_name,
            record_type,
            addition: None,
            deletion,
        }
    }
}

impl fmt::Display for ChangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.action, self.dns_set_name, self.record_type
        )
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn clone_is_deep() {
        let name = DnsSetName::new("www.example.com");
        let mut state = ZoneState::new();
        state
            .dns_set_entry(name.clone())
            .set(RecordType::A, RecordSet::new(300, ["1.2.3.4".into()]));

        let mut copy = state.clone();
        copy.dns_set_mut(&name)
            .unwrap()
            .set(RecordType::A, RecordSet::new(60, ["5.6.7.8".into()]));

        let original = state.dns_set(&name).unwrap();
        assert_eq!(
            original.get(&RecordType::A),
            Some(&RecordSet::new(300, ["1.2.3.4".into()]))
        );
    }

    #[rstest]
    #[case("A", RecordType::A)]
    #[case("aaaa", RecordType::Aaaa)]
    #[case("cname", RecordType::Cname)]
    #[case("Txt", RecordType::Txt)]
    #[case("HTTPS", RecordType::Other("HTTPS".into()))]
    #[case("https", RecordType::Other("HTTPS".into()))]
    fn record_type_mnemonics(#[case] text: &str, #[case] rtype: RecordType) {
        assert_eq!(text.parse::<RecordType>().unwrap(), rtype);
        assert_eq!(rtype.to_string(), text.to_ascii_uppercase());
    }

    #[test]
    fn set_identifier_in_display() {
        assert_eq!(DnsSetName::new("a.example.com").to_string(), "a.example.com");
        assert_eq!(
            DnsSetName::with_set_identifier("a.example.com", "eu").to_string(),
            "a.example.com#eu"
        );
    }
}
