//! Resolution: turning an inbound client message into a response,
//! consulting and populating the cache along the way. Two resolution
//! modes share one cache-integration policy and differ only in how a
//! cache miss gets resolved upstream.

pub mod forwarding;
pub mod net;
pub mod recursive;

use std::net::SocketAddr;
use std::time::SystemTime;

use crate::cache::SharedCache;
use crate::protocol::{Flags, Message, Opcode, Question, Rcode, RecordType, ResponseBuilder};

/// How unresolved questions get their answers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResolverMode {
    /// Walk referrals starting from `root_server`.
    Recursive { root_server: SocketAddr },
    /// Forward unresolved questions to a single upstream.
    Forwarding { forwarder: SocketAddr },
}

/// The number of referral hops `Recursive` mode will follow before
/// giving up.
pub const RECURSION_LIMIT: usize = 16;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResolverError {
    UpstreamTimeout,
    UpstreamUnreachable,
    ResolutionFailed,
}

impl std::fmt::Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverError::UpstreamTimeout => write!(f, "upstream query timed out"),
            ResolverError::UpstreamUnreachable => write!(f, "upstream unreachable or sent an unreadable reply"),
            ResolverError::ResolutionFailed => write!(f, "referral chain exhausted without an authoritative answer"),
        }
    }
}

impl std::error::Error for ResolverError {}

/// Answer every question in `query`, consulting `cache` first and
/// resolving upstream (per `mode`) on a miss. Implements the
/// cache-integration policy shared by both resolver modes.
pub async fn resolve_message(cache: &SharedCache, mode: ResolverMode, query: &Message) -> Message {
    let now = SystemTime::now();
    cache.refresh(now).await;

    let response_flags = Flags {
        is_response: true,
        opcode: Opcode::Query,
        is_authoritative: false,
        is_truncated: false,
        recursion_desired: query.flags.recursion_desired,
        recursion_available: true,
        reserved: 0,
        rcode: Rcode::NoError,
    };

    let mut missing = Vec::new();
    for question in &query.questions {
        if cache.get(question.qtype, &question.name, now).await.is_empty() {
            missing.push(question.clone());
        }
    }

    let any_resolved = if missing.is_empty() {
        true
    } else {
        match mode {
            ResolverMode::Recursive { root_server } => {
                let mut resolved_any = false;
                for question in &missing {
                    match recursive::resolve(question, root_server).await {
                        Ok(records) => {
                            resolved_any = true;
                            for record in records {
                                cache.put(record, now).await;
                            }
                        }
                        Err(error) => {
                            tracing::debug!(name = %question.name.to_dotted_string(), %error, "recursive resolution failed");
                        }
                    }
                }
                resolved_any
            }
            ResolverMode::Forwarding { forwarder } => {
                match forwarding::resolve(&missing, forwarder).await {
                    Ok(records) => {
                        for record in records {
                            cache.put(record, now).await;
                        }
                        true
                    }
                    Err(error) => {
                        tracing::debug!(%error, "forwarding resolution failed");
                        false
                    }
                }
            }
        }
    };

    if !any_resolved {
        return Message::servfail(query.id, query.questions.clone());
    }

    let mut builder = ResponseBuilder::new(query.id, response_flags, query.questions.clone());
    for question in &query.questions {
        for record in cache.get(question.qtype, &question.name, now).await {
            builder.add_record(record);
        }
    }
    builder.finish()
}

/// Resolve a hostname (e.g. a referred nameserver's name) to a
/// `SocketAddr` on port 53, via the host OS resolver.
pub(crate) async fn lookup_host_port_53(host: &str) -> Result<SocketAddr, ResolverError> {
    tokio::net::lookup_host((host, 53))
        .await
        .map_err(|_| ResolverError::ResolutionFailed)?
        .next()
        .ok_or(ResolverError::ResolutionFailed)
}
