//! Mode A: recursive descent starting from a root server. Follows the
//! first usable NS referral in the Authority section, hop by hop, until
//! an authoritative answer comes back.

use std::net::SocketAddr;

use crate::protocol::types::{Message, Question, ResourceRecord};
use crate::resolver::net::query_udp;
use crate::resolver::{lookup_host_port_53, ResolverError, RECURSION_LIMIT};

/// Resolve `question` by walking referrals from `root_server`, returning
/// every record from the eventual authoritative reply's three sections.
pub async fn resolve(
    question: &Question,
    root_server: SocketAddr,
) -> Result<Vec<ResourceRecord>, ResolverError> {
    let mut server = root_server;

    for _ in 0..RECURSION_LIMIT {
        let query = Message::query(rand::random::<u16>(), question.clone());
        let raw = query_udp(server, &query).await?;

        // Decode without NS-name resolution first: an authoritative
        // answer is returned as-is, and its Authority section (if any)
        // never needs its rdata interpreted as a domain name.
        let response =
            Message::decode(&raw, false).map_err(|_| ResolverError::UpstreamUnreachable)?;

        if response.flags.is_authoritative {
            return Ok(response
                .answers
                .into_iter()
                .chain(response.authority)
                .chain(response.additional)
                .collect());
        }

        // Non-authoritative: re-decode with NS-name resolution enabled,
        // purely to find the next server to query.
        let response =
            Message::decode(&raw, true).map_err(|_| ResolverError::UpstreamUnreachable)?;

        let next_hostname = response
            .authority
            .iter()
            .find_map(|record| record.decoded_name.as_ref())
            .map(|labels| labels.join("."))
            .ok_or(ResolverError::ResolutionFailed)?;

        server = lookup_host_port_53(&next_hostname).await?;
    }

    Err(ResolverError::ResolutionFailed)
}
