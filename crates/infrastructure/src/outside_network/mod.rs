//! Outgoing side of the resolver: sends queries to upstream servers over
//! UDP and waits for the matching answers.
//!
//! One [`OutsideNetwork`] is owned by one event loop; nothing in it is
//! shared across threads. All results, including immediate failures, are
//! delivered through the query's callback.

mod dispatcher;
mod handlers;
pub mod pending;
pub mod port_pool;
pub mod random;
pub mod resolve;
pub mod wire;

pub use pending::{PendingIndex, PendingKey, QueryId};
pub use port_pool::PortPool;
pub use random::{RandomError, RandomSource, SecureRandom};
pub use resolve::{InterfaceResolver, NumericHostResolver};

use crate::reactor::{Reactor, SocketId, TimerId, TokioReactor};
use outnet_domain::{AddressFamily, DomainError, OutgoingConfig, QueryOutcome};
use tracing::debug;

/// Number of times to draw a new transaction ID before giving up on a
/// query whose (ID, peer) pair keeps colliding.
pub const MAX_ID_RETRY: usize = 1000;

/// What a query's callback receives.
#[derive(Debug, Clone, Copy)]
pub struct QueryReply<'a> {
    /// Socket the query went out on, when one had been chosen.
    pub socket: Option<SocketId>,
    pub outcome: QueryOutcome,
    /// The reply datagram on [`QueryOutcome::Reply`]. It borrows the shared
    /// receive buffer, which is overwritten by the next datagram.
    pub packet: Option<&'a [u8]>,
}

impl QueryReply<'_> {
    fn closed(socket: Option<SocketId>) -> Self {
        Self {
            socket,
            outcome: QueryOutcome::Closed,
            packet: None,
        }
    }
}

/// Called exactly once per `send`.
pub type QueryCallback = Box<dyn FnOnce(QueryReply<'_>)>;

struct PendingQuery {
    timer: TimerId,
    socket: Option<SocketId>,
    callback: QueryCallback,
}

/// The outgoing query engine.
pub struct OutsideNetwork<R: Reactor, G: RandomSource = SecureRandom> {
    reactor: R,
    rnd: G,
    /// Receive buffer shared by every outgoing socket.
    udp_buff: Vec<u8>,
    ports: PortPool,
    pending: PendingIndex<PendingQuery>,
}

impl<R: Reactor> OutsideNetwork<R, SecureRandom> {
    /// Opens the port pool described by `config` using the system CSPRNG
    /// and numeric interface resolution.
    pub fn create(reactor: R, config: &OutgoingConfig) -> Result<Self, DomainError> {
        Self::create_with(reactor, SecureRandom::new(), &NumericHostResolver, config)
    }
}

impl<R: Reactor, G: RandomSource> OutsideNetwork<R, G> {
    pub fn create_with(
        mut reactor: R,
        rnd: G,
        resolver: &dyn InterfaceResolver,
        config: &OutgoingConfig,
    ) -> Result<Self, DomainError> {
        let ports = PortPool::open(&mut reactor, resolver, config)?;

        Ok(Self {
            reactor,
            rnd,
            udp_buff: vec![0u8; config.buffer_size],
            ports,
            pending: PendingIndex::new(),
        })
    }

    /// Tears the engine down. Pending queries are released without their
    /// callbacks being invoked.
    pub fn destroy(self) {
        drop(self)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, query: QueryId) -> bool {
        self.pending.get(query).is_some()
    }

    pub fn num_udp4(&self) -> usize {
        self.ports.count(AddressFamily::Inet)
    }

    pub fn num_udp6(&self) -> usize {
        self.ports.count(AddressFamily::Inet6)
    }

    pub fn port_pool(&self) -> &PortPool {
        &self.ports
    }

    pub fn reactor(&self) -> &R {
        &self.reactor
    }

    pub fn reactor_mut(&mut self) -> &mut R {
        &mut self.reactor
    }

    /// Buffer a reactor writes an incoming datagram into before handing
    /// the engine a [`crate::reactor::NetEvent::Datagram`].
    pub fn recv_buffer_mut(&mut self) -> &mut [u8] {
        &mut self.udp_buff
    }

    fn teardown(&mut self) {
        for (_, key, pend) in self.pending.drain() {
            debug!(id = %format_args!("{:04x}", key.id), peer = %key.addr, "Dropping pending query on shutdown");
            self.reactor.timer_delete(pend.timer);
        }
        self.ports.close(&mut self.reactor);
    }
}

impl<R: Reactor, G: RandomSource> Drop for OutsideNetwork<R, G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<G: RandomSource> OutsideNetwork<TokioReactor, G> {
    /// Waits for one socket or timer event and handles it.
    pub async fn process_next_event(&mut self) {
        let event = self.reactor.next_event(&mut self.udp_buff).await;
        self.dispatch(event);
    }
}
