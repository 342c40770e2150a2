#![allow(dead_code)]
use super::fake_reactor::FakeReactor;
use outnet_domain::{OutgoingConfig, QueryOutcome};
use outnet_infrastructure::outside_network::{
    NumericHostResolver, OutsideNetwork, QueryCallback, QueryReply, RandomError, RandomSource,
};
use outnet_infrastructure::reactor::{NetEvent, SocketId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::rc::Rc;

pub type FakeNetwork = OutsideNetwork<FakeReactor, ScriptedRandom>;

/// Random source that replays a script, then counts upwards.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    inner: Rc<RefCell<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    script: VecDeque<u32>,
    fallback: u32,
    draws: usize,
    failing: bool,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: u32) {
        self.inner.borrow_mut().script.push_back(value);
    }

    pub fn push_repeated(&self, value: u32, times: usize) {
        let mut state = self.inner.borrow_mut();
        state.script.extend(std::iter::repeat(value).take(times));
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }

    pub fn draws(&self) -> usize {
        self.inner.borrow().draws
    }

    pub fn remaining(&self) -> usize {
        self.inner.borrow().script.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self, bound: u32) -> Result<u32, RandomError> {
        let mut state = self.inner.borrow_mut();
        if state.failing {
            return Err(RandomError);
        }
        state.draws += 1;
        let value = match state.script.pop_front() {
            Some(value) => value,
            None => {
                state.fallback = state.fallback.wrapping_add(1);
                state.fallback
            }
        };
        Ok(value % bound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub socket: Option<SocketId>,
    pub outcome: QueryOutcome,
    pub packet: Option<Vec<u8>>,
}

/// Collects every callback invocation, in order.
#[derive(Debug, Clone, Default)]
pub struct CallbackLog {
    calls: Rc<RefCell<Vec<Recorded>>>,
}

impl CallbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> QueryCallback {
        let calls = self.calls.clone();
        Box::new(move |reply: QueryReply<'_>| {
            calls.borrow_mut().push(Recorded {
                socket: reply.socket,
                outcome: reply.outcome,
                packet: reply.packet.map(<[u8]>::to_vec),
            });
        })
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn outcomes(&self) -> Vec<QueryOutcome> {
        self.calls.borrow().iter().map(|c| c.outcome).collect()
    }
}

pub struct ConfigBuilder;

impl ConfigBuilder {
    pub fn ip4_only(num_ports: usize) -> OutgoingConfig {
        OutgoingConfig {
            num_ports,
            do_ip6: false,
            buffer_size: 4096,
            ..OutgoingConfig::default()
        }
    }

    pub fn dual_stack(num_ports: usize) -> OutgoingConfig {
        OutgoingConfig {
            num_ports,
            buffer_size: 4096,
            ..OutgoingConfig::default()
        }
    }

    pub fn with_interfaces(num_ports: usize, interfaces: &[&str]) -> OutgoingConfig {
        OutgoingConfig {
            num_ports,
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            buffer_size: 4096,
            ..OutgoingConfig::default()
        }
    }
}

pub fn upstream() -> SocketAddr {
    "192.0.2.53:53".parse().unwrap()
}

pub fn upstream_v6() -> SocketAddr {
    "[2001:db8::53]:53".parse().unwrap()
}

/// Minimal 12-byte query header with a zero ID.
pub fn query_packet() -> Vec<u8> {
    vec![0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// Reply to `sent`: same ID, QR bit set.
pub fn reply_to(sent: &[u8]) -> Vec<u8> {
    let mut reply = sent.to_vec();
    reply[2] |= 0x80;
    reply
}

pub fn build_network(
    config: &OutgoingConfig,
) -> (FakeNetwork, FakeReactor, ScriptedRandom) {
    let reactor = FakeReactor::new();
    let rnd = ScriptedRandom::new();
    let network = OutsideNetwork::create_with(
        reactor.clone(),
        rnd.clone(),
        &NumericHostResolver,
        config,
    )
    .expect("fake reactor binds every port");
    (network, reactor, rnd)
}

/// Writes `payload` into the engine's receive buffer and dispatches it as
/// a datagram from `from` on `socket`.
pub fn deliver(network: &mut FakeNetwork, socket: SocketId, from: SocketAddr, payload: &[u8]) {
    let buf = network.recv_buffer_mut();
    buf[..payload.len()].copy_from_slice(payload);
    network.dispatch(NetEvent::Datagram {
        socket,
        from,
        len: payload.len(),
    });
}
