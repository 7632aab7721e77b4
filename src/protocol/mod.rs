//! The DNS wire format: message types, and their encoding/decoding.

pub mod deserialise;
pub mod serialise;
pub mod types;

pub use types::*;

/// Assembles a response message, sorting each added record into the
/// Answer, Authority, or Additional section by its record type: an A
/// record is an answer, an NS record belongs to authority, anything else
/// is additional.
pub struct ResponseBuilder {
    id: u16,
    flags: Flags,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    additional: Vec<ResourceRecord>,
}

impl ResponseBuilder {
    pub fn new(id: u16, flags: Flags, questions: Vec<Question>) -> Self {
        Self {
            id,
            flags,
            questions,
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: ResourceRecord) {
        match record.rtype {
            RecordType::A => self.answers.push(record),
            RecordType::NS => self.authority.push(record),
            _ => self.additional.push(record),
        }
    }

    pub fn finish(self) -> Message {
        Message {
            id: self.id,
            flags: self.flags,
            questions: self.questions,
            answers: self.answers,
            authority: self.authority,
            additional: self.additional,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_record_sorts_by_type() {
        let question = Question {
            name: DomainName::root(),
            qtype: RecordType::A,
            qclass: RecordClass::IN,
        };
        let flags = Message::query(1, question.clone()).flags;
        let mut builder = ResponseBuilder::new(1, flags, vec![question]);

        let a = ResourceRecord {
            name: DomainName::root(),
            rtype: RecordType::A,
            rclass: RecordClass::IN,
            ttl: 60,
            rdata: vec![1, 2, 3, 4],
            decoded_name: None,
        };
        let ns = ResourceRecord {
            rtype: RecordType::NS,
            ..a.clone()
        };
        let mx = ResourceRecord {
            rtype: RecordType::MX,
            ..a.clone()
        };

        builder.add_record(a);
        builder.add_record(ns);
        builder.add_record(mx);

        let message = builder.finish();
        assert_eq!(1, message.answers.len());
        assert_eq!(1, message.authority.len());
        assert_eq!(1, message.additional.len());
    }
}
