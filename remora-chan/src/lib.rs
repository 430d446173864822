//! Outbound channels: the target-facing half of a proxied connection.
//!
//! A [`Channel`] knows where the client wants to go (a host and a
//! port), and how to get there: resolve the host into an ordered list
//! of candidate endpoints, then try connecting to each in turn until
//! one accepts or all of them have failed.  Errors say which stage
//! fell over, since the proxy answers a failed resolution differently
//! from a failed connection.
//!
//! The channel hands back a plain connected stream; the relay loop
//! that pumps bytes through it lives with the session that owns both
//! sides.

#![deny(missing_docs)]
#![deny(unreachable_pub)]
#![deny(clippy::await_holding_lock)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::cognitive_complexity)]
#![deny(clippy::debug_assert_with_mut_call)]
#![deny(clippy::exhaustive_enums)]
#![deny(clippy::exhaustive_structs)]
#![deny(clippy::fallible_impl_from)]
#![deny(clippy::large_stack_arrays)]
#![warn(clippy::manual_ok_or)]
#![deny(clippy::missing_docs_in_private_items)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::option_option)]
#![deny(clippy::ref_option_ref)]
#![warn(clippy::unseparated_literal_suffix)]

use remora_rtcompat::{Runtime, SleepProviderExt, TcpProvider};
use retry_error::RetryError;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error as ThisError;
use tracing::{debug, info};

/// How long do we wait for any single connection attempt before
/// moving on to the next candidate endpoint?
///
/// The OS has its own idea of a connect timeout, but it tends to be
/// generous to the point of uselessness for a cascade.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from trying to open an outbound channel.
///
/// The variants correspond to the stages of channel construction, so
/// the caller can pick the right SOCKS status to report.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    /// We couldn't resolve the target into any endpoints at all.
    #[error("Couldn't resolve {host}: {source}")]
    Resolve {
        /// The host we were trying to resolve.
        host: String,
        /// The underlying resolver error.
        source: io::Error,
    },

    /// Resolution succeeded but produced an empty endpoint list.
    #[error("No addresses found for {host}")]
    NoAddrs {
        /// The host we were trying to resolve.
        host: String,
    },

    /// Every resolved endpoint refused or failed the connection.
    #[error("{0}")]
    Exhausted(RetryError<io::Error>),
}

impl Error {
    /// Return the `io::ErrorKind` of the last connection attempt, if
    /// this error came from the connect stage.
    ///
    /// The last attempt is the most recent information we have about
    /// the target, so it's the one worth reporting to the client.
    pub fn last_connect_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Exhausted(e) => e.sources().last().map(|ioe| ioe.kind()),
            _ => None,
        }
    }
}

/// An outbound channel under construction: a target, and the runtime
/// we'll use to reach it.
pub struct Channel<R: Runtime> {
    /// Runtime used for resolution, connection, and attempt deadlines.
    runtime: R,
    /// Target host: a hostname or the string form of an IP address.
    host: String,
    /// Target port.
    port: u16,
}

impl<R: Runtime> Channel<R> {
    /// Construct a new Channel aimed at `host`:`port`.
    ///
    /// Nothing happens on the network until [`Channel::connect`] is
    /// called.
    pub fn new<T: Into<String>>(runtime: R, host: T, port: u16) -> Self {
        Channel {
            runtime,
            host: host.into(),
            port,
        }
    }

    /// Return the target host for this channel.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the target port for this channel.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve the target, then try to connect to each of its
    /// endpoints in order.  Return the first stream that connects.
    ///
    /// Each attempt gets its own deadline; an attempt that times out
    /// is recorded like any other failure and the cascade moves on.
    pub async fn connect(&self) -> Result<R::TcpStream> {
        let addrs = self
            .runtime
            .resolve(&self.host, self.port)
            .await
            .map_err(|e| {
                info!("Failed to resolve {}: {}", self.host, e);
                Error::Resolve {
                    host: self.host.clone(),
                    source: e,
                }
            })?;
        if addrs.is_empty() {
            info!("Resolved {} to an empty address list", self.host);
            return Err(Error::NoAddrs {
                host: self.host.clone(),
            });
        }
        self.connect_to_addrs(&addrs).await
    }

    /// Run the connect cascade over an already-resolved endpoint list.
    async fn connect_to_addrs(&self, addrs: &[SocketAddr]) -> Result<R::TcpStream> {
        let mut errs =
            RetryError::in_attempt_to(format!("connect to {}:{}", self.host, self.port));
        for addr in addrs {
            match self
                .runtime
                .timeout(CONNECT_TIMEOUT, self.runtime.connect(addr))
                .await
            {
                Ok(Ok(stream)) => {
                    debug!("Connected to {}", addr);
                    return Ok(stream);
                }
                Ok(Err(e)) => {
                    debug!("Failed to connect to {}: {}", addr, e);
                    errs.push(e);
                }
                Err(timeout) => {
                    debug!("Connection attempt to {} timed out", addr);
                    errs.push(io::Error::from(timeout));
                }
            }
        }
        info!(
            "Couldn't connect to {}:{} on any of {} addresses",
            self.host,
            self.port,
            addrs.len()
        );
        Err(Error::Exhausted(errs))
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::missing_docs_in_private_items)]

    use super::*;
    use remora_rtcompat::tokio::test_with_runtime;
    use remora_rtcompat::TcpListener;

    use futures::io::{AsyncReadExt, AsyncWriteExt};
    use std::net::{Ipv4Addr, SocketAddrV4};

    /// Bind a throwaway listener just to learn a port number that is
    /// (very probably) not listening once we drop it.
    async fn dead_port<R: Runtime>(rt: &R) -> SocketAddr {
        let lis = rt
            .listen(&SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0).into())
            .await
            .unwrap();
        lis.local_addr().unwrap()
    }

    #[test]
    fn connect_to_literal() {
        test_with_runtime(|rt| async move {
            let lis = rt
                .listen(&SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0).into())
                .await
                .unwrap();
            let port = lis.local_addr().unwrap().port();

            let chan = Channel::new(rt.clone(), "127.0.0.1", port);
            assert_eq!(chan.host(), "127.0.0.1");
            assert_eq!(chan.port(), port);

            let connecting = chan.connect();
            let accepting = lis.accept();
            let (conn, accepted) = futures::join!(connecting, accepting);
            let mut conn = conn.unwrap();
            let (mut peer, _addr) = accepted.unwrap();

            conn.write_all(b"ping").await.unwrap();
            conn.flush().await.unwrap();
            let mut buf = [0_u8; 4];
            peer.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"ping");
        });
    }

    #[test]
    fn cascade_skips_dead_endpoints() {
        test_with_runtime(|rt| async move {
            let dead = dead_port(&rt).await;

            let lis = rt
                .listen(&SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0).into())
                .await
                .unwrap();
            let live = lis.local_addr().unwrap();

            let chan = Channel::new(rt.clone(), "127.0.0.1", live.port());
            let addrs = [dead, live];
            let connecting = chan.connect_to_addrs(&addrs);
            let accepting = lis.accept();
            let (conn, accepted) = futures::join!(connecting, accepting);
            assert!(conn.is_ok());
            assert!(accepted.is_ok());
        });
    }

    #[test]
    fn all_endpoints_dead() {
        test_with_runtime(|rt| async move {
            let dead = dead_port(&rt).await;

            let chan = Channel::new(rt.clone(), "127.0.0.1", dead.port());
            let err = chan.connect().await.err().unwrap();
            match &err {
                Error::Exhausted(retry) => assert_eq!(retry.len(), 1),
                other => panic!("unexpected error: {:?}", other),
            }
            assert_eq!(
                err.last_connect_kind(),
                Some(io::ErrorKind::ConnectionRefused)
            );
        });
    }

    #[test]
    fn resolution_failure() {
        test_with_runtime(|rt| async move {
            let chan = Channel::new(rt.clone(), "not a hostname at all", 80);
            let err = chan.connect().await.err().unwrap();
            assert!(matches!(err, Error::Resolve { .. }));
            assert!(err.last_connect_kind().is_none());
        });
    }
}
