pub mod builders;
pub mod dns_server_mock;
pub mod fake_reactor;

#[allow(unused_imports)]
pub use builders::{
    build_network, deliver, query_packet, reply_to, upstream, upstream_v6, CallbackLog,
    ConfigBuilder, FakeNetwork, Recorded, ScriptedRandom,
};
#[allow(unused_imports)]
pub use dns_server_mock::{MockBehavior, MockDnsServer};
#[allow(unused_imports)]
pub use fake_reactor::{FakeReactor, SentDatagram};
