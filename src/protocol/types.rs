//! In-memory representation of DNS messages.
//!
//! See `deserialise` and `serialise` for the wire format these types
//! correspond to, and section 4.1 of RFC 1035 for the reference.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Basic DNS message format, used for both queries and responses.
///
/// ```text
///     +---------------------+
///     |        Header       |
///     +---------------------+
///     |       Question      | the question for the name server
///     +---------------------+
///     |        Answer       | RRs answering the question
///     +---------------------+
///     |      Authority      | RRs pointing toward an authority
///     +---------------------+
///     |      Additional     | RRs holding additional information
///     +---------------------+
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    pub id: u16,
    pub flags: Flags,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl Message {
    /// Build a query message: a single question, RD set, everything else
    /// zeroed, a fresh id.
    pub fn query(id: u16, question: Question) -> Self {
        Self {
            id,
            flags: Flags {
                is_response: false,
                opcode: Opcode::Query,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: true,
                recursion_available: false,
                reserved: 0,
                rcode: Rcode::NoError,
            },
            questions: vec![question],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Build an empty SERVFAIL response preserving the client's id and
    /// questions.
    pub fn servfail(id: u16, questions: Vec<Question>) -> Self {
        Self {
            id,
            flags: Flags {
                is_response: true,
                opcode: Opcode::Query,
                is_authoritative: false,
                is_truncated: false,
                recursion_desired: true,
                recursion_available: true,
                reserved: 0,
                rcode: Rcode::ServerFailure,
            },
            questions,
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }
}

/// The 16-bit flags field, decomposed.
///
/// ```text
///     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
/// ```
///
/// The 3-bit `reserved` (Z) field is carried through unchanged rather than
/// assumed to be zero, so that every 16-bit value round-trips losslessly.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Flags {
    pub is_response: bool,
    pub opcode: Opcode,
    pub is_authoritative: bool,
    pub is_truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub reserved: u8,
    pub rcode: Rcode,
}

pub(crate) const MASK_QR: u8 = 0b1000_0000;
pub(crate) const MASK_OPCODE: u8 = 0b0111_1000;
pub(crate) const OFFSET_OPCODE: u8 = 3;
pub(crate) const MASK_AA: u8 = 0b0000_0100;
pub(crate) const MASK_TC: u8 = 0b0000_0010;
pub(crate) const MASK_RD: u8 = 0b0000_0001;
pub(crate) const MASK_RA: u8 = 0b1000_0000;
pub(crate) const MASK_Z: u8 = 0b0111_0000;
pub(crate) const OFFSET_Z: u8 = 4;
pub(crate) const MASK_RCODE: u8 = 0b0000_1111;

/// A four bit field specifying the kind of query. Values 3-15 are
/// reserved for future use and are kept in `Reserved` so that every raw
/// value round-trips.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Opcode {
    Query,
    InverseQuery,
    Status,
    Reserved(OpcodeReserved),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OpcodeReserved(u8);

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value {
            0 => Opcode::Query,
            1 => Opcode::InverseQuery,
            2 => Opcode::Status,
            other => Opcode::Reserved(OpcodeReserved(other & 0b1111)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        match opcode {
            Opcode::Query => 0,
            Opcode::InverseQuery => 1,
            Opcode::Status => 2,
            Opcode::Reserved(OpcodeReserved(value)) => value,
        }
    }
}

/// The response code. Values 6-15 are reserved for future use.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(RcodeReserved),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RcodeReserved(u8);

impl From<u8> for Rcode {
    fn from(value: u8) -> Self {
        match value {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(RcodeReserved(other & 0b1111)),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(rcode: Rcode) -> u8 {
        match rcode {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(RcodeReserved(value)) => value,
        }
    }
}

/// A single label: 1 to 63 bytes, kept byte-exact (no ASCII case-folding).
pub type Label = Vec<u8>;

/// A domain name: an ordered sequence of labels, terminated on the wire by
/// a zero-length label.
///
/// `octets` holds the full wire encoding (length-prefixed labels plus the
/// terminator) so that equality and hashing are cheap and the encoded form
/// never needs to be recomputed.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DomainName {
    pub labels: Vec<Label>,
    pub octets: Vec<u8>,
}

/// The maximum encoded size of a domain name, per RFC 1035 section 3.1.
pub const DOMAIN_NAME_MAX_LEN: usize = 255;

/// The maximum length of a single label.
pub const LABEL_MAX_LEN: usize = 63;

impl DomainName {
    pub fn root() -> Self {
        Self {
            labels: vec![Vec::new()],
            octets: vec![0],
        }
    }

    pub fn is_root(&self) -> bool {
        self.labels.len() == 1 && self.labels[0].is_empty()
    }

    /// Build a `DomainName` from labels (not including the terminating
    /// empty label).
    ///
    /// Returns `None` if any label is empty or longer than
    /// `LABEL_MAX_LEN`, or if the total wire size would exceed
    /// `DOMAIN_NAME_MAX_LEN`.
    pub fn from_labels(labels: Vec<Label>) -> Option<Self> {
        let mut octets = Vec::with_capacity(DOMAIN_NAME_MAX_LEN);
        for label in &labels {
            if label.is_empty() || label.len() > LABEL_MAX_LEN {
                return None;
            }
            octets.push(label.len() as u8);
            octets.extend_from_slice(label);
        }
        octets.push(0);

        if octets.len() > DOMAIN_NAME_MAX_LEN {
            return None;
        }

        let mut all_labels = labels;
        all_labels.push(Vec::new());
        Some(Self {
            labels: all_labels,
            octets,
        })
    }

    /// Join the non-root labels with `.`, decoding each as UTF-8 lossily.
    /// A trailing dot is never produced.
    pub fn to_dotted_string(&self) -> String {
        if self.is_root() {
            return ".".to_string();
        }

        let mut out = String::new();
        for (i, label) in self.labels.iter().enumerate() {
            if label.is_empty() {
                break; // the root label terminates the name
            }
            if i > 0 {
                out.push('.');
            }
            out.push_str(&String::from_utf8_lossy(label));
        }
        out
    }

    /// Inverse of `to_dotted_string`. Accepts (and ignores) a trailing
    /// dot.
    pub fn from_dotted_string(s: &str) -> Option<Self> {
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Some(Self::root());
        }

        let labels = trimmed
            .split('.')
            .map(|chunk| chunk.as_bytes().to_vec())
            .collect::<Vec<_>>();
        Self::from_labels(labels)
    }
}

/// The question section has a list of questions (usually 1) being asked.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

/// A two-octet record type. Only types 1 (A) and 2 (NS) are given names
/// here, since those are the only two the builder and resolver treat
/// specially; everything else is carried as an opaque `u16`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordType(pub u16);

impl RecordType {
    pub const A: RecordType = RecordType(1);
    pub const NS: RecordType = RecordType(2);
    pub const CNAME: RecordType = RecordType(5);
    pub const SOA: RecordType = RecordType(6);
    pub const PTR: RecordType = RecordType(12);
    pub const MX: RecordType = RecordType(15);
    pub const TXT: RecordType = RecordType(16);
    pub const AAAA: RecordType = RecordType(28);
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::SOA => write!(f, "SOA"),
            RecordType::PTR => write!(f, "PTR"),
            RecordType::MX => write!(f, "MX"),
            RecordType::TXT => write!(f, "TXT"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType(other) => write!(f, "TYPE{other}"),
        }
    }
}

/// A two-octet record class. Only IN is named, since this resolver only
/// ever deals in class IN (the cache key intentionally omits class
/// entirely — see `cache::CacheKey`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RecordClass(pub u16);

impl RecordClass {
    pub const IN: RecordClass = RecordClass(1);
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RecordClass::IN => write!(f, "IN"),
            RecordClass(other) => write!(f, "CLASS{other}"),
        }
    }
}

/// A single resource record.
///
/// `decoded_name` is populated only when this is a type-2 (NS) record and
/// the decoder was asked to resolve it (see `deserialise`); it is
/// deliberately excluded from `Eq`/`Hash`/`Ord`, since records are
/// value-equal by `(name, rtype, rclass, ttl, rdata)` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype: RecordType,
    pub rclass: RecordClass,
    pub ttl: u32,
    pub rdata: Vec<u8>,
    pub decoded_name: Option<Vec<String>>,
}

impl ResourceRecord {
    fn key_tuple(&self) -> (&DomainName, RecordType, RecordClass, u32, &[u8]) {
        (&self.name, self.rtype, self.rclass, self.ttl, &self.rdata)
    }
}

impl PartialEq for ResourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key_tuple() == other.key_tuple()
    }
}

impl Eq for ResourceRecord {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_name_round_trips_through_dotted_string() {
        let name = DomainName::from_dotted_string("www.example.com").unwrap();
        assert_eq!("www.example.com", name.to_dotted_string());
        assert_eq!(
            name,
            DomainName::from_dotted_string("www.example.com.").unwrap()
        );
    }

    #[test]
    fn root_domain_is_the_empty_label() {
        assert_eq!(Some(DomainName::root()), DomainName::from_dotted_string("."));
        assert_eq!(".", DomainName::root().to_dotted_string());
    }

    #[test]
    fn from_labels_rejects_oversized_label() {
        assert_eq!(None, DomainName::from_labels(vec![vec![b'x'; 64]]));
    }

    #[test]
    fn from_labels_rejects_empty_label() {
        assert_eq!(None, DomainName::from_labels(vec![Vec::new()]));
    }

    #[test]
    fn resource_record_equality_ignores_decoded_name() {
        let a = ResourceRecord {
            name: DomainName::root(),
            rtype: RecordType::NS,
            rclass: RecordClass::IN,
            ttl: 60,
            rdata: vec![1, 2, 3],
            decoded_name: None,
        };
        let mut b = a.clone();
        b.decoded_name = Some(vec!["a".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn opcode_round_trips_through_reserved_values() {
        for raw in 0u8..16 {
            let opcode = Opcode::from(raw);
            assert_eq!(raw, u8::from(opcode));
        }
    }

    #[test]
    fn rcode_round_trips_through_reserved_values() {
        for raw in 0u8..16 {
            let rcode = Rcode::from(raw);
            assert_eq!(raw, u8::from(rcode));
        }
    }
}
