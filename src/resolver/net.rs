//! A single UDP round-trip to a nameserver, with a fixed timeout: a
//! fresh ephemeral socket per query, `connect`ed to the one peer, no
//! pooling or retry.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::protocol::types::Message;
use crate::resolver::ResolverError;

const RESPONSE_BUFFER_SIZE: usize = 512;
const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Send `query` to `server` over UDP and return whatever comes back,
/// undecoded. Left to the caller, since whether a reply's Authority
/// section needs NS-name resolution depends on what the caller finds in
/// it (see `resolver::recursive::resolve`), not on anything known here.
pub async fn query_udp(server: SocketAddr, query: &Message) -> Result<Vec<u8>, ResolverError> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|_| ResolverError::UpstreamUnreachable)?;
    socket
        .connect(server)
        .await
        .map_err(|_| ResolverError::UpstreamUnreachable)?;

    let encoded = query.encode();

    tokio::time::timeout(QUERY_TIMEOUT, socket.send(&encoded))
        .await
        .map_err(|_| ResolverError::UpstreamTimeout)?
        .map_err(|_| ResolverError::UpstreamUnreachable)?;

    let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
    let n = tokio::time::timeout(QUERY_TIMEOUT, socket.recv(&mut buf))
        .await
        .map_err(|_| ResolverError::UpstreamTimeout)?
        .map_err(|_| ResolverError::UpstreamUnreachable)?;

    Ok(buf[..n].to_vec())
}
