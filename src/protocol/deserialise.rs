//! Decoding `Message` and its components from wire bytes.

use crate::buffer::{ConsumableBuffer, Error};
use crate::protocol::types::{
    DomainName, Flags, Message, Opcode, Question, Rcode, RecordClass, RecordType, ResourceRecord,
    DOMAIN_NAME_MAX_LEN, MASK_AA, MASK_OPCODE, MASK_QR, MASK_RA, MASK_RCODE, MASK_RD, MASK_TC,
    MASK_Z, OFFSET_OPCODE, OFFSET_Z,
};

/// The header counts, which exist only on the wire: once a `Message` is
/// decoded, the lengths of its `Vec`s carry the same information.
struct WireHeader {
    id: u16,
    flags_raw: u16,
    qdcount: u16,
    ancount: u16,
    nscount: u16,
    arcount: u16,
}

impl WireHeader {
    fn decode(buf: &mut ConsumableBuffer) -> Result<Self, Error> {
        Ok(Self {
            id: buf.next_u16()?,
            flags_raw: buf.next_u16()?,
            qdcount: buf.next_u16()?,
            ancount: buf.next_u16()?,
            nscount: buf.next_u16()?,
            arcount: buf.next_u16()?,
        })
    }
}

impl Flags {
    pub(crate) fn decode(raw: u16) -> Self {
        let hi = (raw >> 8) as u8;
        let lo = raw as u8;
        Flags {
            is_response: hi & MASK_QR != 0,
            opcode: Opcode::from((hi & MASK_OPCODE) >> OFFSET_OPCODE),
            is_authoritative: hi & MASK_AA != 0,
            is_truncated: hi & MASK_TC != 0,
            recursion_desired: hi & MASK_RD != 0,
            recursion_available: lo & MASK_RA != 0,
            reserved: (lo & MASK_Z) >> OFFSET_Z,
            rcode: Rcode::from(lo & MASK_RCODE),
        }
    }
}

impl DomainName {
    /// Decode a domain name starting at the cursor's current position,
    /// following at most one level of compression pointer indirection per
    /// label run (the loop below handles any number of pointer hops, but
    /// each hop must strictly decrease the offset, which rules out
    /// cycles).
    pub fn decode(buf: &mut ConsumableBuffer) -> Result<Self, Error> {
        let mut labels = Vec::new();
        let mut octets = Vec::new();
        // Cursor used while following pointers; `buf` itself is only
        // advanced past the point where the *original* name ends.
        let mut cursor = *buf;
        let mut jumped = false;
        let mut end_position = None;

        loop {
            let introducing_position = cursor.position();
            let size = cursor.next_u8()?;

            if size == 0 {
                octets.push(0);
                if !jumped {
                    end_position = Some(cursor.position());
                }
                break;
            } else if size & 0b1100_0000 == 0b1100_0000 {
                let lo = cursor.next_u8()?;
                let pointer = (((size & 0b0011_1111) as usize) << 8) | lo as usize;
                if pointer >= introducing_position {
                    return Err(Error::MalformedName);
                }
                if !jumped {
                    end_position = Some(cursor.position());
                }
                jumped = true;
                cursor = cursor.at_offset(pointer);
            } else if size & 0b1100_0000 == 0 {
                let size = size as usize;
                let label = cursor.take(size)?;
                labels.push(label.to_vec());
                octets.push(size as u8);
                octets.extend_from_slice(label);
            } else {
                return Err(Error::MalformedName);
            }

            if octets.len() > DOMAIN_NAME_MAX_LEN {
                return Err(Error::MalformedName);
            }
        }

        labels.push(Vec::new());
        buf.advance_to(end_position.expect("terminating label always sets end_position"));

        Ok(DomainName { labels, octets })
    }
}

impl Question {
    fn decode(buf: &mut ConsumableBuffer) -> Result<Self, Error> {
        Ok(Question {
            name: DomainName::decode(buf)?,
            qtype: RecordType(buf.next_u16()?),
            qclass: RecordClass(buf.next_u16()?),
        })
    }
}

impl ResourceRecord {
    /// Decode a resource record. When `resolve_ns_name` is set and this
    /// turns out to be an NS record, `decoded_name` is additionally
    /// populated by decoding the rdata as a domain name (rdata may itself
    /// use compression pointers back into the message).
    fn decode(buf: &mut ConsumableBuffer, resolve_ns_name: bool) -> Result<Self, Error> {
        let name = DomainName::decode(buf)?;
        let rtype = RecordType(buf.next_u16()?);
        let rclass = RecordClass(buf.next_u16()?);
        let ttl = buf.next_u32()?;
        let rdlength = buf.next_u16()? as usize;
        let rdata = buf.take(rdlength)?.to_vec();

        let decoded_name = if resolve_ns_name && rtype == RecordType::NS {
            let mut rdata_cursor = buf.at_offset(buf.position() - rdlength);
            let name = DomainName::decode(&mut rdata_cursor)?;
            Some(
                name.labels
                    .iter()
                    .filter(|label| !label.is_empty())
                    .map(|label| String::from_utf8_lossy(label).into_owned())
                    .collect(),
            )
        } else {
            None
        };

        Ok(ResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
            decoded_name,
        })
    }
}

impl Message {
    /// Decode a complete message from `octets`.
    ///
    /// `resolve_authority_ns_names` controls whether NS records in the
    /// Authority section get their rdata eagerly decoded into
    /// `decoded_name` (the recursive resolver needs this to find the next
    /// nameserver to query; a plain cache lookup does not).
    pub fn decode(octets: &[u8], resolve_authority_ns_names: bool) -> Result<Self, Error> {
        let mut buf = ConsumableBuffer::new(octets);
        let header = WireHeader::decode(&mut buf)?;
        let flags = Flags::decode(header.flags_raw);

        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            questions.push(Question::decode(&mut buf)?);
        }

        let mut answers = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            answers.push(ResourceRecord::decode(&mut buf, false)?);
        }

        let mut authority = Vec::with_capacity(header.nscount as usize);
        for _ in 0..header.nscount {
            authority.push(ResourceRecord::decode(&mut buf, resolve_authority_ns_names)?);
        }

        let mut additional = Vec::with_capacity(header.arcount as usize);
        for _ in 0..header.arcount {
            additional.push(ResourceRecord::decode(&mut buf, false)?);
        }

        Ok(Message {
            id: header.id,
            flags,
            questions,
            answers,
            authority,
            additional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::serialise::*;

    #[test]
    fn decodes_a_simple_query() {
        let mut buf = crate::buffer::WritableBuffer::new();
        buf.write_u16(0x1234); // id
        buf.write_u16(0x0100); // RD set
        buf.write_u16(1); // qdcount
        buf.write_u16(0);
        buf.write_u16(0);
        buf.write_u16(0);
        DomainName::from_dotted_string("example.com")
            .unwrap()
            .encode(&mut buf);
        buf.write_u16(RecordType::A.0);
        buf.write_u16(RecordClass::IN.0);

        let message = Message::decode(&buf.octets, false).unwrap();
        assert_eq!(0x1234, message.id);
        assert!(message.flags.recursion_desired);
        assert_eq!(1, message.questions.len());
        assert_eq!(
            "example.com",
            message.questions[0].name.to_dotted_string()
        );
    }

    #[test]
    fn follows_a_compression_pointer() {
        let mut buf = crate::buffer::WritableBuffer::new();
        let name = DomainName::from_dotted_string("ns1.example.com").unwrap();
        let start = buf.index();
        name.encode(&mut buf);
        // A second name that is just a pointer back to the first.
        buf.write_u8(0b1100_0000);
        buf.write_u8(start as u8);

        let mut cursor = ConsumableBuffer::new(&buf.octets);
        let _ = DomainName::decode(&mut cursor).unwrap();
        let second = DomainName::decode(&mut cursor).unwrap();
        assert_eq!("ns1.example.com", second.to_dotted_string());
    }

    #[test]
    fn rejects_a_pointer_that_does_not_go_strictly_backwards() {
        let mut buf = crate::buffer::WritableBuffer::new();
        buf.write_u8(0b1100_0000);
        buf.write_u8(0); // points at itself
        let mut cursor = ConsumableBuffer::new(&buf.octets);
        assert_eq!(Err(Error::MalformedName), DomainName::decode(&mut cursor));
    }

    #[test]
    fn rejects_a_reserved_label_length_pattern() {
        let octets = vec![0b1000_0000u8];
        let mut cursor = ConsumableBuffer::new(&octets);
        assert_eq!(Err(Error::MalformedName), DomainName::decode(&mut cursor));
    }

    #[test]
    fn resolves_ns_rdata_when_requested() {
        let mut buf = crate::buffer::WritableBuffer::new();
        buf.write_u16(1);
        buf.write_u16(0x8000);
        buf.write_u16(0);
        buf.write_u16(0);
        buf.write_u16(1);
        buf.write_u16(0);

        DomainName::from_dotted_string("example.com")
            .unwrap()
            .encode(&mut buf);
        buf.write_u16(RecordType::NS.0);
        buf.write_u16(RecordClass::IN.0);
        buf.write_u32(3600);
        let rdlen_index = buf.index();
        buf.write_u16(0);
        let rdata_start = buf.index();
        DomainName::from_dotted_string("ns1.example.com")
            .unwrap()
            .encode(&mut buf);
        let rdlen = buf.index() - rdata_start;
        buf.patch_u16(rdlen_index, rdlen as u16);

        let message = Message::decode(&buf.octets, true).unwrap();
        assert_eq!(
            Some(vec![
                "ns1".to_string(),
                "example".to_string(),
                "com".to_string()
            ]),
            message.authority[0].decoded_name
        );
    }

    #[test]
    fn truncated_message_is_an_error() {
        assert_eq!(Err(Error::InputTruncated), Message::decode(&[0, 1, 2], false));
    }
}
