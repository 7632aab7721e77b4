//! Mode B: forward unresolved questions to a single upstream recursive
//! resolver, trusting it to have already walked any referrals. One
//! message carries every outstanding question to a fixed upstream; every
//! record from the reply's three sections is accepted as-is.

use std::net::SocketAddr;

use crate::protocol::types::{Message, Opcode, Question, ResourceRecord};
use crate::protocol::Flags;
use crate::resolver::net::query_udp;
use crate::resolver::ResolverError;

/// Forward every question in `questions` as a single message to
/// `forwarder`, returning every record in the reply's Answer, Authority,
/// and Additional sections. Does not follow referrals itself.
pub async fn resolve(
    questions: &[Question],
    forwarder: SocketAddr,
) -> Result<Vec<ResourceRecord>, ResolverError> {
    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let query = Message {
        id: rand::random::<u16>(),
        flags: Flags {
            is_response: false,
            opcode: Opcode::Query,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: true,
            recursion_available: false,
            reserved: 0,
            rcode: crate::protocol::types::Rcode::NoError,
        },
        questions: questions.to_vec(),
        answers: Vec::new(),
        authority: Vec::new(),
        additional: Vec::new(),
    };

    let raw = query_udp(forwarder, &query).await?;
    let response = Message::decode(&raw, false).map_err(|_| ResolverError::UpstreamUnreachable)?;

    Ok(response
        .answers
        .into_iter()
        .chain(response.authority)
        .chain(response.additional)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_question_list_resolves_to_no_records_without_a_query() {
        let forwarder: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let records = resolve(&[], forwarder).await.unwrap();
        assert!(records.is_empty());
    }
}
