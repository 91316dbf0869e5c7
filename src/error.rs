use std::io;

use thiserror::Error;

/// Everything that can go wrong while querying a server.
#[derive(Debug, Error)]
pub enum SourceQueryError {
    /// The session address was not a literal `ip:port`.
    #[error("invalid address `{0}`, expected a literal ip:port")]
    InvalidAddress(String),

    #[error("failed to bind local port")]
    FailedPortBind(#[source] io::Error),

    #[error("host is unreachable")]
    UnreachableHost(#[source] io::Error),

    #[error("failed to send packet")]
    SendError(#[source] io::Error),

    #[error("failed to receive packet")]
    ReceiveError(#[source] io::Error),

    #[error("operation timed out")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// A header or type byte did not match anything the protocol allows here.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// The server split its reply across several datagrams.
    #[error("multi-packet responses are not supported")]
    MultiPacketUnsupported,

    /// The buffer ran out before a field could be read.
    #[error("unexpected end of packet at offset {offset}: needed {needed} bytes, {remaining} left")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("session is closed")]
    SessionClosed,
}
