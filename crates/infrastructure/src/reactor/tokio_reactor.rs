use super::{NetEvent, Reactor, SocketId, TimerId};
use crate::outside_network::QueryId;
use futures::future::poll_fn;
use rustc_hash::FxHashMap;
use socket2::{Domain, Protocol, SockAddr, SockRef, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::ReadBuf;
use tokio::net::UdpSocket;
use tokio_util::time::{delay_queue, DelayQueue};
use tracing::debug;

const RECV_BUFFER_SIZE: usize = 256 * 1024;
const SEND_BUFFER_SIZE: usize = 128 * 1024;

/// Longest delay a timer is armed for. `DelayQueue` cannot hold deadlines
/// past its wheel range (about two years); longer requests are clamped.
pub const MAX_TIMER_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

struct TimerSlot {
    query: QueryId,
    armed: Option<delay_queue::Key>,
}

/// Reactor backed by tokio sockets and a delay queue. Must be created and
/// driven from within a tokio runtime; one instance per thread.
pub struct TokioReactor {
    sockets: Vec<(SocketId, UdpSocket)>,
    next_socket: u32,
    timers: FxHashMap<TimerId, TimerSlot>,
    next_timer: u32,
    queue: DelayQueue<TimerId>,
    poll_start: usize,
}

impl Default for TokioReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioReactor {
    pub fn new() -> Self {
        Self {
            sockets: Vec::new(),
            next_socket: 0,
            timers: FxHashMap::default(),
            next_timer: 0,
            queue: DelayQueue::new(),
            poll_start: 0,
        }
    }

    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn local_addr(&self, socket: SocketId) -> Option<SocketAddr> {
        self.socket(socket).and_then(|s| s.local_addr().ok())
    }

    fn socket(&self, socket: SocketId) -> Option<&UdpSocket> {
        self.sockets
            .iter()
            .find(|(id, _)| *id == socket)
            .map(|(_, s)| s)
    }

    /// Waits for the next readable datagram or expired timer. Datagram
    /// payloads are written to the start of `buf`.
    ///
    /// Never completes when no socket is open and no timer is armed.
    pub async fn next_event(&mut self, buf: &mut [u8]) -> NetEvent {
        poll_fn(|cx| self.poll_event(cx, buf)).await
    }

    pub fn poll_event(&mut self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<NetEvent> {
        while let Poll::Ready(Some(expired)) = self.queue.poll_expired(cx) {
            let timer = expired.into_inner();
            if let Some(slot) = self.timers.get_mut(&timer) {
                slot.armed = None;
                return Poll::Ready(NetEvent::TimerFired(slot.query));
            }
        }

        // Start after the socket served last so one busy socket cannot
        // starve the rest.
        let count = self.sockets.len();
        for offset in 0..count {
            let idx = (self.poll_start + offset) % count;
            let (id, socket) = &self.sockets[idx];
            let id = *id;
            let mut read_buf = ReadBuf::new(buf);
            match socket.poll_recv_from(cx, &mut read_buf) {
                Poll::Ready(Ok(from)) => {
                    let len = read_buf.filled().len();
                    self.poll_start = idx + 1;
                    return Poll::Ready(NetEvent::Datagram {
                        socket: id,
                        from,
                        len,
                    });
                }
                Poll::Ready(Err(error)) => {
                    self.poll_start = idx + 1;
                    return Poll::Ready(NetEvent::UdpError { socket: id, error });
                }
                Poll::Pending => {}
            }
        }

        Poll::Pending
    }

    fn create_socket(bind: SocketAddr) -> io::Result<UdpSocket> {
        let domain = if bind.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        if bind.is_ipv6() {
            socket.set_only_v6(true)?;
        }

        socket.set_recv_buffer_size(RECV_BUFFER_SIZE)?;
        socket.set_send_buffer_size(SEND_BUFFER_SIZE)?;

        socket.bind(&bind.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        UdpSocket::from_std(std_socket)
    }
}

impl Reactor for TokioReactor {
    fn open_udp(&mut self, bind: SocketAddr) -> io::Result<SocketId> {
        let socket = Self::create_socket(bind)?;
        let id = SocketId(self.next_socket);
        self.next_socket += 1;
        debug!(socket = %id, bind = %bind, local = ?socket.local_addr().ok(), "Opened outgoing UDP socket");
        self.sockets.push((id, socket));
        Ok(id)
    }

    fn close_udp(&mut self, socket: SocketId) {
        self.sockets.retain(|(id, _)| *id != socket);
    }

    fn send_to(&mut self, socket: SocketId, packet: &[u8], dest: SocketAddr) -> io::Result<()> {
        let udp = self.socket(socket).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("unknown socket {}", socket))
        })?;
        // Straight to the kernel: tokio's cached readiness would report
        // WouldBlock on a socket the driver has not polled yet.
        let sent = SockRef::from(udp).send_to(packet, &SockAddr::from(dest))?;
        if sent != packet.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send {} of {} bytes", sent, packet.len()),
            ));
        }
        Ok(())
    }

    fn timer_create(&mut self, query: QueryId) -> io::Result<TimerId> {
        let id = TimerId(self.next_timer);
        self.next_timer = self.next_timer.wrapping_add(1);
        self.timers.insert(id, TimerSlot { query, armed: None });
        Ok(id)
    }

    fn timer_set(&mut self, timer: TimerId, after: Duration) {
        let Some(slot) = self.timers.get_mut(&timer) else {
            return;
        };
        if after > MAX_TIMER_DELAY {
            debug!(?after, max = ?MAX_TIMER_DELAY, "Clamping timer delay");
        }
        let after = after.min(MAX_TIMER_DELAY);
        if let Some(key) = slot.armed.as_ref() {
            self.queue.reset(key, after);
        } else {
            slot.armed = Some(self.queue.insert(timer, after));
        }
    }

    fn timer_disable(&mut self, timer: TimerId) {
        if let Some(key) = self.timers.get_mut(&timer).and_then(|slot| slot.armed.take()) {
            self.queue.try_remove(&key);
        }
    }

    fn timer_delete(&mut self, timer: TimerId) {
        self.timer_disable(timer);
        self.timers.remove(&timer);
    }
}
