use super::{
    wire, OutsideNetwork, PendingKey, PendingQuery, QueryCallback, QueryId, QueryReply,
    RandomSource, MAX_ID_RETRY,
};
use crate::reactor::{Reactor, SocketId};
use outnet_domain::AddressFamily;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, error, warn};

impl<R: Reactor, G: RandomSource> OutsideNetwork<R, G> {
    /// Sends `packet` to `dest` from a random outgoing port, after stamping
    /// a fresh random transaction ID into it.
    ///
    /// The callback runs exactly once: synchronously with
    /// [`QueryOutcome::Closed`](outnet_domain::QueryOutcome::Closed) when
    /// the query cannot be sent (the return value is then `None`), or later
    /// from [`Self::dispatch`] with the reply or a timeout. The timer of
    /// `timeout_secs` starts once the datagram has been handed to the
    /// socket.
    pub fn send(
        &mut self,
        packet: &mut [u8],
        dest: SocketAddr,
        timeout_secs: u64,
        callback: QueryCallback,
    ) -> Option<QueryId> {
        if packet.len() < wire::ID_LEN {
            warn!(len = packet.len(), peer = %dest, "Outgoing packet too short for a DNS header");
            callback(QueryReply::closed(None));
            return None;
        }

        let query = match self.new_pending(packet, dest, callback) {
            Ok(query) => query,
            Err(callback) => {
                callback(QueryReply::closed(None));
                return None;
            }
        };

        let Some(socket) = self.select_port(query, &dest) else {
            self.fail_pending(query);
            return None;
        };

        if let Err(e) = self.reactor.send_to(socket, packet, dest) {
            warn!(socket = %socket, peer = %dest, error = %e, "Failed to send outgoing query");
            self.fail_pending(query);
            return None;
        }

        // Armed after the send so the system call does not count against
        // the round trip.
        if let Some(pend) = self.pending.get(query) {
            self.reactor
                .timer_set(pend.timer, Duration::from_secs(timeout_secs));
        }
        Some(query)
    }

    /// Removes a pending query without invoking its callback. Returns false
    /// when the query already completed.
    pub fn cancel(&mut self, query: QueryId) -> bool {
        match self.pending.remove(query) {
            Some((key, pend)) => {
                debug!(query = %query, id = %format_args!("{:04x}", key.id), "Cancelled pending query");
                self.reactor.timer_delete(pend.timer);
                true
            }
            None => false,
        }
    }

    /// Registers a new pending query under a transaction ID not yet in use
    /// towards `dest`. On failure nothing is retained and the callback is
    /// handed back.
    fn new_pending(
        &mut self,
        packet: &mut [u8],
        dest: SocketAddr,
        callback: QueryCallback,
    ) -> Result<QueryId, QueryCallback> {
        let query = self.pending.allocate_id();
        let timer = match self.reactor.timer_create(query) {
            Ok(timer) => timer,
            Err(e) => {
                error!(error = %e, "Failed to create query timer");
                return Err(callback);
            }
        };

        let mut pend = PendingQuery {
            timer,
            socket: None,
            callback,
        };
        let mut id_tries = 0;

        loop {
            let id = match self.rnd.transaction_id() {
                Ok(id) => id,
                Err(e) => {
                    error!(error = %e, "Cannot draw transaction ID");
                    self.reactor.timer_delete(timer);
                    return Err(pend.callback);
                }
            };
            wire::set_id(packet, id);

            match self.pending.insert(query, PendingKey::new(id, dest), pend) {
                Ok(()) => {
                    debug!(id = %format_args!("{:04x}", id), peer = %dest, "Inserted new pending reply");
                    return Ok(query);
                }
                Err(back) => {
                    pend = back;
                    id_tries += 1;
                    if id_tries == MAX_ID_RETRY {
                        error!(peer = %dest, "Failed to generate unique ID, drop msg");
                        self.reactor.timer_delete(timer);
                        return Err(pend.callback);
                    }
                }
            }
        }
    }

    /// Picks one of the outgoing sockets of the destination's family at
    /// random and records it on the pending query.
    fn select_port(&mut self, query: QueryId, dest: &SocketAddr) -> Option<SocketId> {
        let family = AddressFamily::of(dest);
        let nummax = self.ports.count(family);

        if nummax == 0 {
            error!(family = %family, peer = %dest, "Need to send query but have no ports of that family");
            return None;
        }

        let bound = u32::try_from(nummax).unwrap_or(u32::MAX);
        let chosen = match self.rnd.uniform(bound) {
            Ok(chosen) => chosen as usize,
            Err(e) => {
                error!(error = %e, "Cannot draw outgoing port");
                return None;
            }
        };

        let socket = self.ports.get(family, chosen)?;
        if let Some(pend) = self.pending.get_mut(query) {
            pend.socket = Some(socket);
        }

        debug!(query = %query, socket = %socket, chosen, nummax, "Selected outbound port");
        Some(socket)
    }

    /// Removes a query that could not be sent and reports it as closed.
    fn fail_pending(&mut self, query: QueryId) {
        if let Some((_, pend)) = self.pending.remove(query) {
            self.reactor.timer_delete(pend.timer);
            (pend.callback)(QueryReply::closed(pend.socket));
        }
    }
}
