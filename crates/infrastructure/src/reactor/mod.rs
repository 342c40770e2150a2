//! Seam between the query engine and the event loop that owns the sockets
//! and timers.
//!
//! The engine never blocks and never awaits: it asks the reactor to open
//! sockets, send datagrams and arm timers, and the reactor later hands back
//! [`NetEvent`]s one at a time for the engine to dispatch.

mod tokio_reactor;

pub use tokio_reactor::{TokioReactor, MAX_TIMER_DELAY};

use crate::outside_network::QueryId;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Handle of a UDP socket registered with a reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub u32);

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "udp#{}", self.0)
    }
}

/// Handle of a single-shot timer registered with a reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

/// One event delivered by the reactor.
#[derive(Debug)]
pub enum NetEvent {
    /// A datagram of `len` bytes from `from` arrived on `socket` and has
    /// been written to the start of the engine's receive buffer.
    Datagram {
        socket: SocketId,
        from: SocketAddr,
        len: usize,
    },
    /// Receiving on `socket` failed.
    UdpError { socket: SocketId, error: io::Error },
    /// The timer created for `query` expired.
    TimerFired(QueryId),
}

pub trait Reactor {
    /// Creates a non-blocking UDP socket bound to `bind` and starts watching
    /// it for datagrams.
    fn open_udp(&mut self, bind: SocketAddr) -> io::Result<SocketId>;

    fn close_udp(&mut self, socket: SocketId);

    /// Sends one datagram without blocking. A send that would block is an
    /// error.
    fn send_to(&mut self, socket: SocketId, packet: &[u8], dest: SocketAddr) -> io::Result<()>;

    /// Creates a disarmed single-shot timer whose expiry is reported as
    /// [`NetEvent::TimerFired`] for `query`.
    fn timer_create(&mut self, query: QueryId) -> io::Result<TimerId>;

    /// Arms (or re-arms) the timer to fire once after `after`.
    fn timer_set(&mut self, timer: TimerId, after: Duration);

    /// Disarms the timer; no-op when not armed.
    fn timer_disable(&mut self, timer: TimerId);

    /// Disarms and releases the timer.
    fn timer_delete(&mut self, timer: TimerId);
}

impl<R: Reactor + ?Sized> Reactor for Box<R> {
    fn open_udp(&mut self, bind: SocketAddr) -> io::Result<SocketId> {
        (**self).open_udp(bind)
    }

    fn close_udp(&mut self, socket: SocketId) {
        (**self).close_udp(socket)
    }

    fn send_to(&mut self, socket: SocketId, packet: &[u8], dest: SocketAddr) -> io::Result<()> {
        (**self).send_to(socket, packet, dest)
    }

    fn timer_create(&mut self, query: QueryId) -> io::Result<TimerId> {
        (**self).timer_create(query)
    }

    fn timer_set(&mut self, timer: TimerId, after: Duration) {
        (**self).timer_set(timer, after)
    }

    fn timer_disable(&mut self, timer: TimerId) {
        (**self).timer_disable(timer)
    }

    fn timer_delete(&mut self, timer: TimerId) {
        (**self).timer_delete(timer)
    }
}
