//! Outgoing query engine: sends DNS queries over a pool of randomised UDP
//! source ports and matches replies back to their pending queries.
pub mod outside_network;
pub mod reactor;

pub use outside_network::{
    OutsideNetwork, PendingIndex, PendingKey, PortPool, QueryCallback, QueryId, QueryReply,
};
pub use reactor::{NetEvent, Reactor, SocketId, TimerId, TokioReactor};
