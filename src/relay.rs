use std::io::ErrorKind;

use strum_macros::Display;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Largest chunk moved per read.
pub const BUF_SIZE: usize = 1024;

/// How much of the first client payload goes into the log.
pub const PREVIEW_LEN: usize = 99;

/// Why a session stopped. The text is what ends up in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EndReason {
    #[strum(serialize = "main select")]
    Wait,
    #[strum(serialize = "server receive exit")]
    UpstreamReadFailed,
    #[strum(serialize = "server receive end")]
    UpstreamClosed,
    #[strum(serialize = "client send incomplete / closed")]
    ClientWriteFailed,
    #[strum(serialize = "client receive exit")]
    ClientReadFailed,
    #[strum(serialize = "client receive end")]
    ClientClosed,
    #[strum(serialize = "send server incomplete / closed")]
    UpstreamWriteFailed,
}

impl EndReason {
    /// An orderly close by either peer, as opposed to an I/O failure.
    pub fn is_clean(&self) -> bool {
        matches!(self, EndReason::UpstreamClosed | EndReason::ClientClosed)
    }
}

/// One client paired with one granted upstream connection.
///
/// Both sockets are closed when the session is dropped.
pub struct TunnelSession {
    client: TcpStream,
    upstream: TcpStream,
    buf: [u8; BUF_SIZE],
    first_payload_logged: bool,
}

impl TunnelSession {
    pub fn new(client: TcpStream, upstream: TcpStream) -> Self {
        Self {
            client,
            upstream,
            buf: [0; BUF_SIZE],
            first_payload_logged: false,
        }
    }

    /// Relay until either side closes or fails.
    ///
    /// Each wake services both sockets, upstream first, so data pending on
    /// both is moved in the same pass. There is no idle timeout.
    pub async fn run(mut self) -> EndReason {
        loop {
            let ready = tokio::select! {
                r = self.upstream.readable() => r,
                r = self.client.readable() => r,
            };
            if ready.is_err() {
                return EndReason::Wait;
            }

            match try_read(&self.upstream, &mut self.buf) {
                Read::Idle => {}
                Read::Failed => return EndReason::UpstreamReadFailed,
                Read::Closed => return EndReason::UpstreamClosed,
                Read::Data(n) => {
                    if self.client.write_all(&self.buf[..n]).await.is_err() {
                        return EndReason::ClientWriteFailed;
                    }
                }
            }

            match try_read(&self.client, &mut self.buf) {
                Read::Idle => {}
                Read::Failed => return EndReason::ClientReadFailed,
                Read::Closed => return EndReason::ClientClosed,
                Read::Data(n) => {
                    if !self.first_payload_logged {
                        self.first_payload_logged = true;
                        log::info!("Data: {}", sanitize(&self.buf[..n]));
                    }
                    if self.upstream.write_all(&self.buf[..n]).await.is_err() {
                        return EndReason::UpstreamWriteFailed;
                    }
                }
            }
        }
    }
}

enum Read {
    Idle,
    Data(usize),
    Closed,
    Failed,
}

/// Non-blocking read; readiness may be spurious, so `WouldBlock` is idle.
fn try_read(stream: &TcpStream, buf: &mut [u8]) -> Read {
    match stream.try_read(buf) {
        Ok(0) => Read::Closed,
        Ok(n) => Read::Data(n),
        Err(e) if e.kind() == ErrorKind::WouldBlock => Read::Idle,
        Err(e) if e.kind() == ErrorKind::Interrupted => Read::Idle,
        Err(_) => Read::Failed,
    }
}

/// Printable preview of a payload: at most [`PREVIEW_LEN`] bytes, anything
/// outside `0x20..=0x7e` shown as `.`.
pub fn sanitize(data: &[u8]) -> String {
    data.iter()
        .take(PREVIEW_LEN)
        .map(|&b| if (0x20..=0x7e).contains(&b) { b as char } else { '.' })
        .collect()
}
