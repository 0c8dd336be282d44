//! Record model: query keys, record types and decoded resource records.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::net::IpAddr;

/// Identity of a query and of a cache entry.
///
/// Host names are compared exactly as stored; no case folding or trailing-dot
/// normalization happens anywhere in the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub host: String,
    pub rtype: RecordType,
}

impl RecordKey {
    pub fn new(host: impl Into<String>, rtype: RecordType) -> Self {
        Self {
            host: host.into(),
            rtype,
        }
    }
}

/// Record types understood by the resolver, mapped to their IANA wire codes.
///
/// `Other` remembers the wire code it was decoded from so the shell can show
/// it, but all unrecognized codes are the same type as far as equality and
/// cache keying are concerned.
#[derive(Debug, Clone, Copy)]
pub enum RecordType {
    A,
    Aaaa,
    Ns,
    Cname,
    Soa,
    Mx,
    Other(u16),
}

impl RecordType {
    /// Wire code used when encoding a question for this type.
    pub fn code(self) -> u16 {
        match self {
            Self::A => 1,
            Self::Ns => 2,
            Self::Cname => 5,
            Self::Soa => 6,
            Self::Mx => 15,
            Self::Aaaa => 28,
            Self::Other(code) => code,
        }
    }

    /// Classify a wire code found in a response.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::A,
            2 => Self::Ns,
            5 => Self::Cname,
            6 => Self::Soa,
            15 => Self::Mx,
            28 => Self::Aaaa,
            other => Self::Other(other),
        }
    }

    /// Parse a type name as typed in a `lookup` command (case-insensitive).
    ///
    /// Only the types that make sense to ask for are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "A" => Some(Self::A),
            "AAAA" => Some(Self::Aaaa),
            "NS" => Some(Self::Ns),
            "MX" => Some(Self::Mx),
            "CNAME" => Some(Self::Cname),
            _ => None,
        }
    }
}

// Unrecognized codes all land in one cache bucket; the concrete code on
// `Other` is display-only.
impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::Aaaa => f.write_str("AAAA"),
            Self::Ns => f.write_str("NS"),
            Self::Cname => f.write_str("CNAME"),
            Self::Soa => f.write_str("SOA"),
            Self::Mx => f.write_str("MX"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

/// Decoded RDATA.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    /// A or AAAA address.
    Address(IpAddr),
    /// A domain name (NS and CNAME records).
    Name(String),
    /// RDATA the client deliberately leaves undecoded (SOA, MX, unknown types).
    Opaque,
}

impl RecordData {
    /// The address, for records that carry one.
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            Self::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    /// The target name, for records that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => write!(f, "{addr}"),
            Self::Name(name) => f.write_str(name),
            Self::Opaque => f.write_str("----"),
        }
    }
}

/// One decoded resource record.
///
/// Immutable once decoded. Equality covers every field, so the cache can keep
/// records in a set and deduplicate repeats across responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRecord {
    pub host: String,
    pub rtype: RecordType,
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn new(host: impl Into<String>, rtype: RecordType, ttl: u32, data: RecordData) -> Self {
        Self {
            host: host.into(),
            rtype,
            ttl,
            data,
        }
    }

    /// The cache key this record is stored under.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.host.clone(), self.rtype)
    }
}
