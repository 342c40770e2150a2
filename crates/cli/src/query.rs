//! One-shot queries through the outgoing engine.

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, Record, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use outnet_domain::{DomainError, QueryOutcome};
use outnet_infrastructure::outside_network::{OutsideNetwork, QueryReply};
use outnet_infrastructure::reactor::TokioReactor;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

/// Result of one query towards one upstream server.
#[derive(Debug, Clone)]
pub struct ServerResult {
    pub server: SocketAddr,
    pub outcome: QueryOutcome,
    pub reply: Option<Vec<u8>>,
}

/// What the CLI prints for a reply.
#[derive(Debug)]
pub struct ReplySummary {
    pub rcode: ResponseCode,
    pub truncated: bool,
    pub answers: Vec<Record>,
}

pub fn parse_record_type(value: &str) -> Result<RecordType, DomainError> {
    RecordType::from_str(&value.to_ascii_uppercase())
        .map_err(|e| DomainError::UnknownRecordType(format!("'{}': {}", value, e)))
}

/// Builds a recursive query in wire format. The transaction ID is left at
/// zero; the engine stamps a random one when sending.
pub fn build_query(domain: &str, record_type: RecordType) -> Result<Vec<u8>, DomainError> {
    let name = Name::from_str(domain).map_err(|e| {
        DomainError::InvalidDomainName(format!("Invalid domain '{}': {}", domain, e))
    })?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(0, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(query);

    let mut buf = Vec::with_capacity(512);
    let mut encoder = BinEncoder::new(&mut buf);
    message
        .emit(&mut encoder)
        .map_err(|e| DomainError::MessageEncoding(e.to_string()))?;

    Ok(buf)
}

pub fn summarize_reply(bytes: &[u8]) -> Result<ReplySummary, DomainError> {
    let message =
        Message::from_vec(bytes).map_err(|e| DomainError::InvalidResponse(e.to_string()))?;

    Ok(ReplySummary {
        rcode: message.response_code(),
        truncated: message.truncated(),
        answers: message.answers().to_vec(),
    })
}

/// Sends `packet` to every server and drives the engine until each query
/// has reported back.
pub async fn run_queries(
    network: &mut OutsideNetwork<TokioReactor>,
    packet: &[u8],
    servers: &[SocketAddr],
    timeout_secs: u64,
) -> Vec<ServerResult> {
    let results: Rc<RefCell<Vec<Option<ServerResult>>>> =
        Rc::new(RefCell::new(vec![None; servers.len()]));

    for (slot, &server) in servers.iter().enumerate() {
        let sink = results.clone();
        let mut outgoing = packet.to_vec();
        let query = network.send(
            &mut outgoing,
            server,
            timeout_secs,
            Box::new(move |reply: QueryReply<'_>| {
                sink.borrow_mut()[slot] = Some(ServerResult {
                    server,
                    outcome: reply.outcome,
                    reply: reply.packet.map(<[u8]>::to_vec),
                });
            }),
        );
        debug!(server = %server, query = ?query, "Query dispatched");
    }

    while results.borrow().iter().any(Option::is_none) {
        network.process_next_event().await;
    }

    results.take().into_iter().flatten().collect()
}
