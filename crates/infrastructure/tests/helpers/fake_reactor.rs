#![allow(dead_code)]
use outnet_infrastructure::outside_network::QueryId;
use outnet_infrastructure::reactor::{Reactor, SocketId, TimerId};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SentDatagram {
    pub socket: SocketId,
    pub packet: Vec<u8>,
    pub dest: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct FakeTimer {
    pub query: QueryId,
    pub armed: Option<Duration>,
}

#[derive(Debug, Default)]
struct FakeState {
    bind_attempts: Vec<SocketAddr>,
    open_sockets: BTreeMap<SocketId, SocketAddr>,
    failing_ports: HashSet<u16>,
    failing_ipv6: bool,
    fail_sends: bool,
    fail_timer_create: bool,
    sends: Vec<SentDatagram>,
    timers: BTreeMap<TimerId, FakeTimer>,
    next_socket: u32,
    next_timer: u32,
}

/// In-memory reactor that records every resource it hands out.
///
/// Clones share state, so a test keeps one clone as a probe after moving
/// the other into the engine.
#[derive(Debug, Clone, Default)]
pub struct FakeReactor {
    state: Rc<RefCell<FakeState>>,
}

impl FakeReactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_port(&self, port: u16) {
        self.state.borrow_mut().failing_ports.insert(port);
    }

    pub fn fail_ipv6(&self) {
        self.state.borrow_mut().failing_ipv6 = true;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.borrow_mut().fail_sends = fail;
    }

    pub fn fail_timer_create(&self, fail: bool) {
        self.state.borrow_mut().fail_timer_create = fail;
    }

    pub fn bind_attempts(&self) -> Vec<SocketAddr> {
        self.state.borrow().bind_attempts.clone()
    }

    pub fn attempted_ports(&self) -> Vec<u16> {
        self.bind_attempts().iter().map(|a| a.port()).collect()
    }

    pub fn open_sockets(&self) -> BTreeSet<SocketId> {
        self.state.borrow().open_sockets.keys().copied().collect()
    }

    pub fn open_socket_count(&self) -> usize {
        self.state.borrow().open_sockets.len()
    }

    pub fn bound_addr(&self, socket: SocketId) -> Option<SocketAddr> {
        self.state.borrow().open_sockets.get(&socket).copied()
    }

    pub fn sends(&self) -> Vec<SentDatagram> {
        self.state.borrow().sends.clone()
    }

    pub fn last_send(&self) -> Option<SentDatagram> {
        self.state.borrow().sends.last().cloned()
    }

    pub fn live_timer_count(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn armed_timer_count(&self) -> usize {
        self.state
            .borrow()
            .timers
            .values()
            .filter(|t| t.armed.is_some())
            .count()
    }

    pub fn timer_for(&self, query: QueryId) -> Option<FakeTimer> {
        self.state
            .borrow()
            .timers
            .values()
            .find(|t| t.query == query)
            .cloned()
    }
}

impl Reactor for FakeReactor {
    fn open_udp(&mut self, bind: SocketAddr) -> io::Result<SocketId> {
        let mut state = self.state.borrow_mut();
        state.bind_attempts.push(bind);

        if state.failing_ports.contains(&bind.port()) {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "port in use"));
        }
        if state.failing_ipv6 && bind.is_ipv6() {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "address family not supported",
            ));
        }

        let id = SocketId(state.next_socket);
        state.next_socket += 1;
        state.open_sockets.insert(id, bind);
        Ok(id)
    }

    fn close_udp(&mut self, socket: SocketId) {
        let removed = self.state.borrow_mut().open_sockets.remove(&socket);
        assert!(removed.is_some(), "closed unknown socket {}", socket);
    }

    fn send_to(&mut self, socket: SocketId, packet: &[u8], dest: SocketAddr) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        assert!(
            state.open_sockets.contains_key(&socket),
            "send on closed socket {}",
            socket
        );
        if state.fail_sends {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "send would block"));
        }
        state.sends.push(SentDatagram {
            socket,
            packet: packet.to_vec(),
            dest,
        });
        Ok(())
    }

    fn timer_create(&mut self, query: QueryId) -> io::Result<TimerId> {
        let mut state = self.state.borrow_mut();
        if state.fail_timer_create {
            return Err(io::Error::new(io::ErrorKind::OutOfMemory, "no timers"));
        }
        let id = TimerId(state.next_timer);
        state.next_timer += 1;
        state.timers.insert(id, FakeTimer { query, armed: None });
        Ok(id)
    }

    fn timer_set(&mut self, timer: TimerId, after: Duration) {
        let mut state = self.state.borrow_mut();
        let slot = state.timers.get_mut(&timer).expect("timer_set on deleted timer");
        slot.armed = Some(after);
    }

    fn timer_disable(&mut self, timer: TimerId) {
        let mut state = self.state.borrow_mut();
        let slot = state
            .timers
            .get_mut(&timer)
            .expect("timer_disable on deleted timer");
        slot.armed = None;
    }

    fn timer_delete(&mut self, timer: TimerId) {
        let removed = self.state.borrow_mut().timers.remove(&timer);
        assert!(removed.is_some(), "timer deleted twice");
    }
}
