//! Encoding `Message` and its components to wire bytes.
//!
//! Names are always written out in full: this resolver never bothers
//! compressing outgoing messages, only decompressing incoming ones. That
//! keeps the encoder simple and is well within the 512-byte UDP budget for
//! the messages this resolver sends and answers.

use crate::buffer::WritableBuffer;
use crate::protocol::types::{
    DomainName, Flags, Message, Opcode, Question, Rcode, ResourceRecord, MASK_AA, MASK_OPCODE,
    MASK_QR, MASK_RA, MASK_RCODE, MASK_RD, MASK_TC, MASK_Z, OFFSET_OPCODE, OFFSET_Z,
};

impl Flags {
    fn encode(&self) -> u16 {
        let mut hi = 0u8;
        if self.is_response {
            hi |= MASK_QR;
        }
        hi |= (u8::from(self.opcode) << OFFSET_OPCODE) & MASK_OPCODE;
        if self.is_authoritative {
            hi |= MASK_AA;
        }
        if self.is_truncated {
            hi |= MASK_TC;
        }
        if self.recursion_desired {
            hi |= MASK_RD;
        }

        let mut lo = 0u8;
        if self.recursion_available {
            lo |= MASK_RA;
        }
        lo |= (self.reserved << OFFSET_Z) & MASK_Z;
        lo |= u8::from(self.rcode) & MASK_RCODE;

        u16::from_be_bytes([hi, lo])
    }
}

impl DomainName {
    pub fn encode(&self, buf: &mut WritableBuffer) {
        buf.write_octets(&self.octets);
    }
}

impl Question {
    fn encode(&self, buf: &mut WritableBuffer) {
        self.name.encode(buf);
        buf.write_u16(self.qtype.0);
        buf.write_u16(self.qclass.0);
    }
}

impl ResourceRecord {
    fn encode(&self, buf: &mut WritableBuffer) {
        self.name.encode(buf);
        buf.write_u16(self.rtype.0);
        buf.write_u16(self.rclass.0);
        buf.write_u32(self.ttl);

        let rdlength_index = buf.index();
        buf.write_u16(0);
        let rdata_start = buf.index();
        buf.write_octets(&self.rdata);
        let rdlength = buf.index() - rdata_start;
        buf.patch_u16(rdlength_index, rdlength as u16);
    }
}

impl Message {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = WritableBuffer::new();

        buf.write_u16(self.id);
        buf.write_u16(self.flags.encode());
        buf.write_u16(self.questions.len() as u16);
        buf.write_u16(self.answers.len() as u16);
        buf.write_u16(self.authority.len() as u16);
        buf.write_u16(self.additional.len() as u16);

        for question in &self.questions {
            question.encode(&mut buf);
        }
        for record in self
            .answers
            .iter()
            .chain(self.authority.iter())
            .chain(self.additional.iter())
        {
            record.encode(&mut buf);
        }

        buf.octets
    }
}
