//! Declare an error type for the remora_socksproto crate.

use thiserror::Error;

/// An error that occurs while negotiating a SOCKS handshake.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The handshake's current message is incomplete; keep reading
    /// from the client and try again with the longer input.
    #[error("Message truncated; need to wait for more")]
    Truncated,

    /// The client's message violated the SOCKS protocol syntax.
    #[error("SOCKS protocol syntax violation")]
    Syntax,

    /// The client asked for a SOCKS version we don't recognize.
    #[error("Unrecognized SOCKS protocol version {0}")]
    BadProtocol(u8),

    /// The client asked for something we don't implement.
    #[error("SOCKS feature not supported")]
    NoSupport,

    /// The caller kept feeding us input after the handshake was over.
    #[error("SOCKS handshake was finished; no need to call this again")]
    AlreadyFinished,
}

impl From<remora_bytes::Error> for Error {
    fn from(e: remora_bytes::Error) -> Error {
        use remora_bytes::Error as E;
        match e {
            E::Truncated => Error::Truncated,
            _ => Error::Syntax,
        }
    }
}
