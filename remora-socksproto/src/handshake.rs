//! Types to implement the SOCKS handshake.

use crate::msg::{SocksAddr, SocksAuth, SocksCmd, SocksRequest, SocksStatus};
use crate::{Error, Result};

use remora_bytes::{Reader, Writer};

use std::convert::TryInto;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// An object that can check SOCKS5 username/password credentials.
///
/// The server installs one of these on a handshake when it wants the
/// USERNAME/PASSWORD method (RFC 1929) to be on offer.  The check runs
/// in the middle of the handshake, before the client may send its
/// request.
pub trait Authenticator: Send + Sync {
    /// Return true if this username/password pair is allowed to proceed.
    fn check(&self, username: &[u8], password: &[u8]) -> bool;
}

/// An ongoing SOCKS handshake.
///
/// To perform a handshake, call the [SocksHandshake::handshake]
/// method repeatedly with new inputs, until the resulting [Action]
/// has `finished` set to true.
#[derive(Clone)]
pub struct SocksHandshake {
    /// Current state of the handshake. Each completed message
    /// advances the state.
    state: State,
    /// Where to check username/password credentials, if we are
    /// willing to negotiate them at all.
    auth_store: Option<Arc<dyn Authenticator>>,
    /// SOCKS5 authentication that has been received (but not yet put
    /// in a SocksRequest object.)
    socks5_auth: Option<SocksAuth>,
    /// Completed SOCKS handshake.
    handshake: Option<SocksRequest>,
}

/// Possible state for a Socks connection.
///
/// Each completed message advances the state.
#[derive(Clone, Debug, Copy, PartialEq)]
enum State {
    /// Starting state: no messages have been handled yet.
    Initial,
    /// SOCKS5: we've negotiated Username/Password authentication, and
    /// are waiting for the client to send it.
    Socks5Username,
    /// SOCKS5: we've finished the authentication (if any), and
    /// we're waiting for the actual request.
    Socks5Wait,
    /// Ending (successful) state: the client has sent all its messages.
    ///
    /// (Note that we still need to send a reply.)
    Done,
    /// Ending (failed) state: we told the client to go away, and any
    /// reply bytes have already been handed out in an [Action].
    ///
    /// There is no request to extract in this state.
    Failed,
}

/// An action to take in response to a SOCKS handshake message.
#[derive(Clone, Debug)]
pub struct Action {
    /// If nonzero, this many bytes should be drained from the
    /// client's inputs.
    pub drain: usize,
    /// If nonempty, this reply should be sent to the client.
    pub reply: Vec<u8>,
    /// If true, then this handshake is over, either successfully or not.
    pub finished: bool,
}

/// Constant for Username/Password-style authentication.
/// (See RFC 1929)
const USERNAME_PASSWORD: u8 = 0x02;
/// Constant for "no authentication".
const NO_AUTHENTICATION: u8 = 0x00;
/// Constant for "no methods from your list were acceptable".
const NO_ACCEPTABLE_METHODS: u8 = 0xFF;

impl SocksHandshake {
    /// Construct a new SocksHandshake in its initial state.
    ///
    /// The only SOCKS5 method this handshake will accept is "no
    /// authentication".
    pub fn new() -> Self {
        SocksHandshake {
            state: State::Initial,
            auth_store: None,
            socks5_auth: None,
            handshake: None,
        }
    }

    /// Construct a new SocksHandshake that additionally accepts the
    /// SOCKS5 Username/Password method, checking the pairs it
    /// receives against `auth_store`.
    ///
    /// SOCKS4 has no authentication at all, so a handshake built this
    /// way refuses SOCKS4 clients.
    pub fn with_authenticator(auth_store: Arc<dyn Authenticator>) -> Self {
        SocksHandshake {
            state: State::Initial,
            auth_store: Some(auth_store),
            socks5_auth: None,
            handshake: None,
        }
    }

    /// Try to advance a SocksHandshake, given some client input in
    /// `input`.
    ///
    /// If there isn't enough input, gives [Error::Truncated].  Other
    /// errors indicate a failure.
    ///
    /// On success, return an Action describing what to tell the client,
    /// and how much of its input to consume.
    pub fn handshake(&mut self, input: &[u8]) -> Result<Action> {
        if input.is_empty() {
            return Err(Error::Truncated);
        }
        match (self.state, input[0]) {
            (State::Initial, 4) => self.s4(input),
            (State::Initial, 5) => self.s5_initial(input),
            (State::Initial, v) => Err(Error::BadProtocol(v)),
            (State::Socks5Username, 1) => self.s5_uname(input),
            (State::Socks5Wait, 5) => self.s5(input),
            (State::Done, _) => Err(Error::AlreadyFinished),
            (State::Failed, _) => Err(Error::AlreadyFinished),
            (_, _) => Err(Error::Syntax),
        }
    }

    /// Complete a socks4 or socks4a handshake.
    fn s4(&mut self, input: &[u8]) -> Result<Action> {
        let mut r = Reader::from_slice(input);
        let version = r.take_u8()?;
        assert_eq!(version, 4);

        let cmd: SocksCmd = r.take_u8()?.into();
        let port = r.take_u16()?;
        let ip = r.take_u32()?;
        let username = r.take_until(0)?.into();
        let auth = SocksAuth::Socks4(username);

        let addr = if ip != 0 && (ip >> 8) == 0 {
            // Socks4a; a hostname is given.
            let hostname = r.take_until(0)?;
            let hostname = std::str::from_utf8(hostname)
                .map_err(|_| Error::Syntax)?
                .to_string();
            let hostname = hostname.try_into()?;
            SocksAddr::Hostname(hostname)
        } else {
            let ip4: Ipv4Addr = ip.into();
            SocksAddr::Ip(ip4.into())
        };

        if self.auth_store.is_some() {
            // SOCKS4 can't carry credentials, and we require them.
            let mut w = Vec::new();
            w.write_u8(0);
            w.write_u8(SocksStatus::NOT_ALLOWED.into_socks4_status());
            w.write_u16(0);
            w.write_u32(0);
            self.state = State::Failed;
            return Ok(Action {
                drain: r.consumed(),
                reply: w,
                finished: true,
            });
        }

        let request = SocksRequest::new(version, cmd, addr, port, auth)?;

        self.state = State::Done;
        self.handshake = Some(request);

        Ok(Action {
            drain: r.consumed(),
            reply: Vec::new(),
            finished: true,
        })
    }

    /// Socks5: initial handshake to negotiate authentication method.
    fn s5_initial(&mut self, input: &[u8]) -> Result<Action> {
        let mut r = Reader::from_slice(input);
        let version = r.take_u8()?;
        assert_eq!(version, 5);

        let nmethods = r.take_u8()?;
        if nmethods == 0 {
            return Err(Error::Syntax);
        }
        let methods = r.take(nmethods as usize)?;

        // Pick the first offered method that we find acceptable.  "No
        // authentication" is always acceptable; Username/Password is
        // acceptable whenever we have somewhere to check the pair.
        let selected = methods.iter().copied().find(|m| {
            *m == NO_AUTHENTICATION || (*m == USERNAME_PASSWORD && self.auth_store.is_some())
        });

        match selected {
            Some(NO_AUTHENTICATION) => {
                self.socks5_auth = Some(SocksAuth::NoAuth);
                self.state = State::Socks5Wait;
                Ok(Action {
                    drain: r.consumed(),
                    reply: vec![5, NO_AUTHENTICATION],
                    finished: false,
                })
            }
            Some(_) => {
                self.state = State::Socks5Username;
                Ok(Action {
                    drain: r.consumed(),
                    reply: vec![5, USERNAME_PASSWORD],
                    finished: false,
                })
            }
            None => {
                self.state = State::Failed;
                Ok(Action {
                    drain: r.consumed(),
                    reply: vec![5, NO_ACCEPTABLE_METHODS],
                    finished: true,
                })
            }
        }
    }

    /// Socks5: second step for username/password authentication.
    fn s5_uname(&mut self, input: &[u8]) -> Result<Action> {
        let mut r = Reader::from_slice(input);

        let ver = r.take_u8()?;
        if ver != 1 {
            return Err(Error::NoSupport);
        }

        let ulen = r.take_u8()?;
        let username = r.take(ulen as usize)?;
        let plen = r.take_u8()?;
        let passwd = r.take(plen as usize)?;

        let accepted = match &self.auth_store {
            Some(store) => store.check(username, passwd),
            None => false,
        };

        if accepted {
            self.socks5_auth = Some(SocksAuth::Username(username.into(), passwd.into()));
            self.state = State::Socks5Wait;
            Ok(Action {
                drain: r.consumed(),
                reply: vec![1, 0],
                finished: false,
            })
        } else {
            self.state = State::Failed;
            Ok(Action {
                drain: r.consumed(),
                reply: vec![1, 1],
                finished: true,
            })
        }
    }

    /// Socks5: final step, to receive client's request.
    fn s5(&mut self, input: &[u8]) -> Result<Action> {
        let mut r = Reader::from_slice(input);

        let version = r.take_u8()?;
        if version != 5 {
            return Err(Error::Syntax);
        }
        let cmd = r.take_u8()?.into();
        let _ignore = r.take_u8()?;
        let addr = r.extract()?;
        let port = r.take_u16()?;

        let auth = self.socks5_auth.take().unwrap();

        let request = SocksRequest::new(version, cmd, addr, port, auth)?;

        self.state = State::Done;
        self.handshake = Some(request);

        Ok(Action {
            drain: r.consumed(),
            reply: Vec::new(),
            finished: true,
        })
    }

    /// Return true if this handshake is finished.
    pub fn finished(&self) -> bool {
        self.state == State::Done || self.state == State::Failed
    }

    /// Consume this handshake's state; if it finished successfully,
    /// return a SocksRequest.
    pub fn into_request(self) -> Option<SocksRequest> {
        self.handshake
    }
}

impl Default for SocksHandshake {
    fn default() -> Self {
        Self::new()
    }
}

impl SocksRequest {
    /// Format a reply to this request, indicating success or failure.
    ///
    /// `bound` is the local endpoint of the outbound connection we
    /// opened for the client, if we opened one.  The encoded address
    /// type always matches the bound endpoint's address family; with
    /// no bound endpoint we encode the zero IPv4 endpoint.
    pub fn reply(&self, status: SocksStatus, bound: Option<&SocketAddr>) -> Vec<u8> {
        match self.version() {
            4 => self.s4_reply(status, bound),
            _ => self.s5_reply(status, bound),
        }
    }

    /// Format a SOCKS4 reply.
    fn s4_reply(&self, status: SocksStatus, bound: Option<&SocketAddr>) -> Vec<u8> {
        let mut w = Vec::new();
        w.write_u8(0);
        w.write_u8(status.into_socks4_status());
        match bound {
            Some(SocketAddr::V4(a)) => {
                w.write_u16(a.port());
                w.write(a.ip());
            }
            _ => {
                w.write_u16(0);
                w.write_u32(0);
            }
        }
        w
    }

    /// Format a SOCKS5 reply.
    fn s5_reply(&self, status: SocksStatus, bound: Option<&SocketAddr>) -> Vec<u8> {
        let mut w = Vec::new();
        w.write_u8(5);
        w.write_u8(status.into());
        w.write_u8(0); // reserved.
        match bound {
            Some(SocketAddr::V4(a)) => {
                w.write_u8(1);
                w.write(a.ip());
                w.write_u16(a.port());
            }
            Some(SocketAddr::V6(a)) => {
                w.write_u8(4);
                w.write(a.ip());
                w.write_u16(a.port());
            }
            None => {
                w.write_u8(1);
                w.write_u32(0);
                w.write_u16(0);
            }
        }
        w
    }
}

impl remora_bytes::Readable for SocksAddr {
    fn take_from(r: &mut Reader<'_>) -> remora_bytes::Result<SocksAddr> {
        use remora_bytes::Error as BytesError;
        let atype = r.take_u8()?;
        match atype {
            1 => {
                let ip4: Ipv4Addr = r.extract()?;
                Ok(SocksAddr::Ip(ip4.into()))
            }
            3 => {
                let hlen = r.take_u8()?;
                let hostname = r.take(hlen as usize)?;
                let hostname = std::str::from_utf8(hostname)
                    .map_err(|_| BytesError::BadMessage("bad utf8 on hostname"))?
                    .to_string();
                let hostname = hostname
                    .try_into()
                    .map_err(|_| BytesError::BadMessage("hostname too long"))?;
                Ok(SocksAddr::Hostname(hostname))
            }
            4 => {
                let ip6: std::net::Ipv6Addr = r.extract()?;
                Ok(SocksAddr::Ip(ip6.into()))
            }
            _ => Err(BytesError::BadMessage("unrecognized address type.")),
        }
    }
}
