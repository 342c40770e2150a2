use super::{wire, OutsideNetwork, PendingKey, QueryId, QueryReply, RandomSource};
use crate::reactor::{NetEvent, Reactor, SocketId};
use outnet_domain::QueryOutcome;
use std::io;
use std::net::SocketAddr;
use tracing::{debug, warn};

impl<R: Reactor, G: RandomSource> OutsideNetwork<R, G> {
    /// Entry point for everything the reactor reports.
    pub fn dispatch(&mut self, event: NetEvent) {
        match event {
            NetEvent::Datagram { socket, from, len } => self.handle_reply(socket, Ok((from, len))),
            NetEvent::UdpError { socket, error } => self.handle_reply(socket, Err(error)),
            NetEvent::TimerFired(query) => self.handle_timeout(query),
        }
    }

    /// A datagram arrived on one of the outgoing sockets; its payload is in
    /// the shared receive buffer.
    ///
    /// Replies that match no pending query, or that arrive on a different
    /// socket than the query left from, are dropped without touching any
    /// pending state.
    pub fn handle_reply(&mut self, socket: SocketId, result: io::Result<(SocketAddr, usize)>) {
        let (from, len) = match result {
            Ok(received) => received,
            Err(error) => {
                warn!(socket = %socket, error = %error, "Outgoing UDP socket error");
                return;
            }
        };

        let len = len.min(self.udp_buff.len());
        let Some(id) = wire::read_id(&self.udp_buff[..len]) else {
            debug!(socket = %socket, peer = %from, len, "Datagram too short for a DNS header. dropped.");
            return;
        };

        let key = PendingKey::new(id, from);
        debug!(
            id = %format_args!("{:04x}", id),
            peer = %from,
            pending = self.pending.len(),
            "Incoming reply"
        );

        let Some(query) = self.pending.lookup(&key) else {
            debug!(id = %format_args!("{:04x}", id), peer = %from, "Received unsolicited udp reply. dropped.");
            return;
        };

        let sent_on = self.pending.get(query).and_then(|pend| pend.socket);
        if sent_on != Some(socket) {
            debug!(
                id = %format_args!("{:04x}", id),
                peer = %from,
                socket = %socket,
                "Received reply id,addr on wrong port. dropped."
            );
            return;
        }

        let Some((_, pend)) = self.pending.remove(query) else {
            return;
        };
        self.reactor.timer_disable(pend.timer);
        self.reactor.timer_delete(pend.timer);

        debug!(query = %query, "Handling udp reply");
        (pend.callback)(QueryReply {
            socket: Some(socket),
            outcome: QueryOutcome::Reply,
            packet: Some(&self.udp_buff[..len]),
        });
    }

    /// The timer of `query` expired. A query that already completed or was
    /// cancelled is ignored.
    pub fn handle_timeout(&mut self, query: QueryId) {
        let Some((key, pend)) = self.pending.remove(query) else {
            debug!(query = %query, "Timer fired for a query no longer pending");
            return;
        };

        debug!(query = %query, id = %format_args!("{:04x}", key.id), peer = %key.addr, "Timeout udp");
        self.reactor.timer_delete(pend.timer);
        (pend.callback)(QueryReply {
            socket: pend.socket,
            outcome: QueryOutcome::Timeout,
            packet: None,
        });
    }
}
