//! Implement a simple SOCKS proxy that relays connections to the
//! targets its clients name.

use futures::future::Either;
use futures::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use futures::stream::StreamExt;
use futures::task::SpawnExt;
use std::io::Result as IoResult;
use std::net::SocketAddr;
use std::sync::Arc;

use remora_chan::Channel;
use remora_rtcompat::{Runtime, TcpListener, TcpProvider, TcpStream};
use remora_socksproto::{SocksAddr, SocksCmd, SocksHandshake, SocksStatus};

use crate::auth::CredentialStore;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

/// Size of the read buffer on each side of a session.
///
/// The handshake also has to fit within one buffer of this size; any
/// legitimate handshake is far smaller.
const BUF_LEN: usize = 4096;

/// Given a just-received TCP connection on a SOCKS port, handle the
/// SOCKS handshake, open a channel to the requested target, and relay
/// the two connections until either of them is done.
///
/// Protocol violations close the connection; the client gets a SOCKS
/// error reply first whenever the protocol has one for the occasion.
async fn handle_socks_conn<R: Runtime>(
    runtime: R,
    stream: R::TcpStream,
    store: Option<Arc<CredentialStore>>,
) -> Result<()> {
    let mut handshake = match store {
        Some(store) => SocksHandshake::with_authenticator(store),
        None => SocksHandshake::new(),
    };

    let (mut r, mut w) = stream.split();
    let mut inbuf = vec![0_u8; BUF_LEN];
    let mut n_read = 0;
    let request = loop {
        // Try to advance the handshake with what the buffer already
        // holds; a client may well have sent several messages in one
        // burst.
        match handshake.handshake(&inbuf[..n_read]) {
            Err(remora_socksproto::Error::Truncated) => {
                // Fall through and read some more below.
            }
            Err(e) => {
                debug!("SOCKS handshake failed: {}", e);
                return Ok(());
            }
            Ok(action) => {
                if action.drain > 0 {
                    inbuf.copy_within(action.drain..n_read, 0);
                    n_read -= action.drain;
                }
                if !action.reply.is_empty() {
                    w.write_all(&action.reply[..])
                        .await
                        .context("Error while writing reply to SOCKS handshake")?;
                    w.flush()
                        .await
                        .context("Error while writing reply to SOCKS handshake")?;
                }
                if action.finished {
                    break handshake.into_request();
                }
                continue;
            }
        }

        if n_read == inbuf.len() {
            // The invariant for this buffer is that it is never
            // written past its filled extent; a handshake that
            // doesn't fit is not a handshake we want.
            error!("SOCKS handshake did not fit in the read buffer");
            return Ok(());
        }

        // Read some more stuff.
        let n = r
            .read(&mut inbuf[n_read..])
            .await
            .context("Error while reading SOCKS handshake")?;
        if n == 0 {
            debug!("Client closed connection mid-handshake");
            return Ok(());
        }
        n_read += n;
    };
    let request = match request {
        Some(r) => r,
        None => {
            // The handshake already sent its parting reply (0xFF, a
            // failed authentication, or a SOCKS4 refusal).
            debug!("SOCKS handshake finished without a usable request");
            return Ok(());
        }
    };

    let addr = request.addr().to_string();
    let port = request.port();
    info!("Got a socks request for {}:{}", addr, port);

    if request.command() != SocksCmd::CONNECT {
        debug!("Refusing request; {} is unsupported", request.command());
        let reply = request.reply(SocksStatus::COMMAND_NOT_SUPPORTED, None);
        w.write_all(&reply[..])
            .await
            .context("Couldn't write SOCKS reply")?;
        return Ok(());
    }
    if matches!(request.addr(), SocksAddr::Hostname(_)) {
        // We never resolve names on the client's behalf.
        debug!("Refusing request; hostname targets are unsupported");
        let reply = request.reply(SocksStatus::ADDRTYPE_NOT_SUPPORTED, None);
        w.write_all(&reply[..])
            .await
            .context("Couldn't write SOCKS reply")?;
        return Ok(());
    }

    let chan = Channel::new(runtime, addr.clone(), port);
    let outbound = match chan.connect().await {
        Ok(s) => s,
        Err(e) => {
            let reply = request.reply(connect_status(&e), None);
            w.write_all(&reply[..])
                .await
                .context("Couldn't write SOCKS reply")?;
            return Ok(());
        }
    };

    // The command response carries the local endpoint of the socket
    // we just opened.
    let local = match outbound.local_addr() {
        Ok(local) => local,
        Err(e) => {
            warn!("Couldn't learn local endpoint of outbound socket: {}", e);
            let reply = request.reply(SocksStatus::GENERAL_FAILURE, None);
            w.write_all(&reply[..])
                .await
                .context("Couldn't write SOCKS reply")?;
            return Ok(());
        }
    };
    info!("Connected to {}:{} from {}", addr, port, local);
    let reply = request.reply(SocksStatus::SUCCEEDED, Some(&local));
    w.write_all(&reply[..])
        .await
        .context("Couldn't write SOCKS reply")?;
    w.flush().await.context("Couldn't write SOCKS reply")?;

    let (rtarget, wtarget) = outbound.split();

    // One pump per direction, each owning one session buffer: the
    // client side keeps the buffer the handshake already filled from,
    // and the target side gets its own of the same size.  The first
    // pump to finish, whether by EOF or by error, ends the session:
    // the other side's in-flight operations are cancelled when its
    // future is dropped, and both sockets close when the halves are
    // dropped.
    let client_to_target = pump(r, wtarget, inbuf);
    let target_to_client = pump(rtarget, w, vec![0_u8; BUF_LEN]);
    futures::pin_mut!(client_to_target, target_to_client);
    match futures::future::select(client_to_target, target_to_client).await {
        Either::Left((res, _)) => {
            if let Err(e) = res {
                debug!("Relay from client to {}:{} ended: {}", addr, port, e);
            }
        }
        Either::Right((res, _)) => {
            if let Err(e) = res {
                debug!("Relay from {}:{} to client ended: {}", addr, port, e);
            }
        }
    }
    debug!("Closing session to {}:{}", addr, port);

    Ok(())
}

/// Pick the SOCKS status that best describes why the outbound channel
/// couldn't be opened.
fn connect_status(e: &remora_chan::Error) -> SocksStatus {
    use std::io::ErrorKind;
    match e {
        remora_chan::Error::Resolve { .. } | remora_chan::Error::NoAddrs { .. } => {
            SocksStatus::HOST_UNREACHABLE
        }
        _ => match e.last_connect_kind() {
            Some(ErrorKind::TimedOut) => SocksStatus::TTL_EXPIRED,
            Some(ErrorKind::PermissionDenied) => SocksStatus::NOT_ALLOWED,
            // "Connection refused" is the honest default for a
            // cascade that ran out of endpoints.
            _ => SocksStatus::CONNECTION_REFUSED,
        },
    }
}

/// Drive one relay direction: read from `reader` into `buf`, write
/// everything that arrived to `writer`, and repeat until the reader
/// reports EOF or either side fails.
///
/// `buf` belongs to the session and caps how much this direction can
/// have in flight; a new read never starts before the previous chunk
/// has been written out in full, which is what holds a fast sender to
/// the pace of a slow receiver.  The writer is flushed only at the
/// moments when the reader has nothing ready, so a burst travels in
/// as few segments as the transport allows while a quiet peer still
/// gets its last bytes promptly.  A clean EOF closes the writer so
/// the far side sees the end of the stream.
async fn pump<R, W>(mut reader: R, mut writer: W, mut buf: Vec<u8>) -> IoResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    use futures::{poll, task::Poll};

    loop {
        // Start a read, but don't commit to waiting on it until any
        // buffered output has been pushed toward the socket.
        let mut next_read = reader.read(&mut buf[..]);
        let n = match poll!(&mut next_read) {
            Poll::Ready(ready) => ready?,
            Poll::Pending => {
                writer.flush().await?;
                next_read.await?
            }
        };
        if n == 0 {
            // EOF
            writer.close().await?;
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
    }
}

/// Launch a SOCKS proxy to listen on a given `listen` address, and
/// run indefinitely.
pub(crate) async fn run_socks_proxy<R: Runtime>(
    runtime: R,
    listen: SocketAddr,
    store: Option<Arc<CredentialStore>>,
) -> Result<()> {
    let listener = runtime
        .listen(&listen)
        .await
        .with_context(|| format!("Can't listen on {:?}", listen))?;
    // The configured port may have been 0.
    let actual = listener.local_addr()?;
    info!("Listening on {:?}.", actual);
    serve(runtime, listener, store).await
}

/// Accept clients from `listener` and spawn one session task each.
async fn serve<R: Runtime>(
    runtime: R,
    listener: R::TcpListener,
    store: Option<Arc<CredentialStore>>,
) -> Result<()> {
    let mut incoming = listener.incoming();

    while let Some(stream) = incoming.next().await {
        let (stream, peer) = match stream {
            Ok(s) => s,
            Err(e) => {
                // Not necessarily fatal: the next accept may work.
                error!("Error while accepting socket: {}", e);
                continue;
            }
        };
        debug!("Accepted connection from {:?}", peer);
        let store = store.clone();
        let runtime_copy = runtime.clone();
        runtime.spawn(async move {
            let res = handle_socks_conn(runtime_copy, stream, store).await;
            if let Err(e) = res {
                warn!("connection exited with error: {}", e);
            }
        })?;
    }

    Ok(())
}
