//! DNS message codec.
//!
//! Queries are fixed single-question messages sent without the
//! recursion-desired bit: the resolver walks the hierarchy itself. Responses
//! are parsed into resource records tagged with the section they came from;
//! unrecognized record types are skipped over via RDLENGTH rather than
//! aborting the message.

mod cursor;

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::ProtocolError;
use crate::record::{RecordData, RecordKey, RecordType, ResourceRecord};
use self::cursor::Cursor;

/// Maximum DNS message size over UDP.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Longest label the wire format can carry.
const MAX_LABEL_LEN: usize = 63;

/// Fixed header length.
const HEADER_LEN: usize = 12;

/// Authoritative-Answer bit in the header flags.
const FLAG_AUTHORITATIVE: u16 = 0x0400;

/// Internet class.
const CLASS_IN: u16 = 1;

/// Which response section a record was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answer => f.write_str("answer"),
            Self::Authority => f.write_str("authority"),
            Self::Additional => f.write_str("additional"),
        }
    }
}

/// A parsed response.
#[derive(Debug)]
pub struct DecodedMessage {
    pub id: u16,
    pub authoritative: bool,
    /// Every record of the reply, in wire order, tagged by section.
    pub records: Vec<(Section, ResourceRecord)>,
}

impl DecodedMessage {
    /// Records belonging to one section, in wire order.
    pub fn section(&self, section: Section) -> impl Iterator<Item = &ResourceRecord> {
        self.records
            .iter()
            .filter(move |(s, _)| *s == section)
            .map(|(_, record)| record)
    }
}

/// An encoded query plus the transaction id it was stamped with.
#[derive(Debug, Clone)]
pub struct Query {
    pub id: u16,
    pub bytes: Vec<u8>,
}

/// Build a single-question query for `key` with a random transaction id.
pub fn encode_query(key: &RecordKey) -> Result<Query, ProtocolError> {
    encode_query_with_id(key, fastrand::u16(..))
}

pub(crate) fn encode_query_with_id(key: &RecordKey, id: u16) -> Result<Query, ProtocolError> {
    if !key.host.is_ascii() {
        return Err(ProtocolError::NonAsciiName {
            host: key.host.clone(),
        });
    }

    let mut bytes = Vec::with_capacity(HEADER_LEN + key.host.len() + 6);
    bytes.extend_from_slice(&id.to_be_bytes());
    // flags stay zero: no recursion desired, this client iterates itself
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&[0; 6]);

    for label in key.host.split('.') {
        if label.is_empty() {
            return Err(ProtocolError::EmptyLabel {
                host: key.host.clone(),
            });
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(ProtocolError::LabelTooLong {
                label: label.to_string(),
            });
        }
        bytes.push(label.len() as u8);
        bytes.extend_from_slice(label.as_bytes());
    }
    bytes.push(0);

    bytes.extend_from_slice(&key.rtype.code().to_be_bytes());
    bytes.extend_from_slice(&CLASS_IN.to_be_bytes());

    Ok(Query { id, bytes })
}

/// Parse a response buffer.
///
/// Only the Authoritative-Answer flag is interpreted; the question section is
/// read and discarded; every resource record of the three sections is
/// decoded in order.
pub fn decode_response(buf: &[u8]) -> Result<DecodedMessage, ProtocolError> {
    let mut cursor = Cursor::new(buf);

    let id = cursor.read_u16()?;
    let flags = cursor.read_u16()?;
    let authoritative = flags & FLAG_AUTHORITATIVE != 0;
    let qd_count = cursor.read_u16()?;
    let an_count = cursor.read_u16()?;
    let ns_count = cursor.read_u16()?;
    let ar_count = cursor.read_u16()?;

    for _ in 0..qd_count {
        cursor.read_name()?;
        // QTYPE + QCLASS
        cursor.skip(4)?;
    }

    let total = usize::from(an_count) + usize::from(ns_count) + usize::from(ar_count);
    let mut records = Vec::with_capacity(total);
    let sections = [
        (Section::Answer, an_count),
        (Section::Authority, ns_count),
        (Section::Additional, ar_count),
    ];
    for (section, count) in sections {
        for _ in 0..count {
            records.push((section, decode_record(&mut cursor)?));
        }
    }

    Ok(DecodedMessage {
        id,
        authoritative,
        records,
    })
}

fn decode_record(cursor: &mut Cursor<'_>) -> Result<ResourceRecord, ProtocolError> {
    let host = cursor.read_name()?;
    let rtype = RecordType::from_code(cursor.read_u16()?);
    // class
    cursor.skip(2)?;
    let ttl = cursor.read_u32()?;
    let rd_length = usize::from(cursor.read_u16()?);

    let data = match rtype {
        RecordType::A => RecordData::Address(ipv4_data(cursor, rd_length)?),
        RecordType::Aaaa => RecordData::Address(ipv6_data(cursor, rd_length)?),
        RecordType::Ns | RecordType::Cname => {
            // RDATA is itself a possibly-compressed name; resync to the
            // record boundary afterwards since a pointer reads fewer bytes
            // than RDLENGTH claims.
            let end = cursor
                .position()
                .checked_add(rd_length)
                .ok_or(ProtocolError::UnexpectedEnd {
                    offset: cursor.position(),
                })?;
            let name = cursor.read_name()?;
            cursor.seek(end)?;
            RecordData::Name(name)
        }
        RecordType::Soa | RecordType::Mx | RecordType::Other(_) => {
            // not interpreted; RDLENGTH guarantees forward progress
            cursor.skip(rd_length)?;
            RecordData::Opaque
        }
    };

    Ok(ResourceRecord::new(host, rtype, ttl, data))
}

fn ipv4_data(cursor: &mut Cursor<'_>, rd_length: usize) -> Result<IpAddr, ProtocolError> {
    if rd_length != 4 {
        return Err(ProtocolError::AddressLength {
            expected: 4,
            found: rd_length,
        });
    }
    let bytes = cursor.read_bytes(4)?;
    Ok(IpAddr::V4(Ipv4Addr::new(
        bytes[0], bytes[1], bytes[2], bytes[3],
    )))
}

fn ipv6_data(cursor: &mut Cursor<'_>, rd_length: usize) -> Result<IpAddr, ProtocolError> {
    if rd_length != 16 {
        return Err(ProtocolError::AddressLength {
            expected: 16,
            found: rd_length,
        });
    }
    let bytes = cursor.read_bytes(16)?;
    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ok(IpAddr::V6(Ipv6Addr::from(octets)))
}
