use std::fmt;

/// How an outbound query ended, as reported to the caller's callback.
///
/// Every per-request result, including immediate send failures, travels
/// through the same callback distinguished only by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOutcome {
    /// A reply matching the transaction ID and peer arrived on the socket
    /// the query was sent from.
    Reply,
    /// The query timer expired before any matching reply.
    Timeout,
    /// The query could not be sent or could not be registered.
    Closed,
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply => write!(f, "reply"),
            Self::Timeout => write!(f, "timeout"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
