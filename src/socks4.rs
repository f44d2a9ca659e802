//! SOCKS4 CONNECT, client side.
//!
//! ```text
//! request  | VN=4 | CD=1 | DSTPORT (2) | DSTIP (4) | NUL |   9 bytes
//! response | VN   | CD   | DSTPORT (2) | DSTIP (4) |         8 bytes
//! ```
//!
//! Port and address are in network byte order. The user id is always
//! empty, so the request ends right after its terminator.

use std::net::Ipv4Addr;
use std::time::Duration;

use bytebuffer::ByteBuffer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time;

use crate::error::Error;
use crate::origdst::OriginalDestination;
use crate::Result;

pub const VERSION: u8 = 4;
pub const CMD_CONNECT: u8 = 1;

pub const REPLY_GRANTED: u8 = 0x5A;
pub const REPLY_REJECTED: u8 = 0x5B;
pub const REPLY_NO_IDENTD: u8 = 0x5C;
pub const REPLY_IDENTD_MISMATCH: u8 = 0x5D;

pub const REQUEST_LEN: usize = 9;
pub const RESPONSE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub port: u16,
    pub addr: Ipv4Addr,
}

impl Request {
    pub fn connect(dest: OriginalDestination) -> Self {
        Self {
            port: dest.port,
            addr: dest.addr,
        }
    }

    /// Serialize to the exact wire layout; any other size is
    /// [`Error::WireFormat`], which stops the whole relay.
    pub fn encode(&self) -> Result<[u8; REQUEST_LEN]> {
        let mut msg = ByteBuffer::new();
        msg.write_u8(VERSION);
        msg.write_u8(CMD_CONNECT);
        msg.write_u16(self.port);
        msg.write_u32(u32::from(self.addr));
        msg.write_u8(0);

        let bytes = msg.into_vec();
        let len = bytes.len();
        bytes.try_into().map_err(|_| Error::WireFormat(len))
    }
}

/// Only `status` matters; the rest is kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub version: u8,
    pub status: u8,
    pub port: u16,
    pub addr: Ipv4Addr,
}

impl Response {
    pub fn decode(raw: &[u8; RESPONSE_LEN]) -> Self {
        Self {
            version: raw[0],
            status: raw[1],
            port: u16::from_be_bytes([raw[2], raw[3]]),
            addr: Ipv4Addr::new(raw[4], raw[5], raw[6], raw[7]),
        }
    }

    pub fn is_granted(&self) -> bool {
        self.status == REPLY_GRANTED
    }
}

pub fn describe_status(status: u8) -> &'static str {
    match status {
        REPLY_GRANTED => "request granted",
        REPLY_REJECTED => "request rejected or failed",
        REPLY_NO_IDENTD => "no identd on client",
        REPLY_IDENTD_MISMATCH => "identd user id mismatch",
        _ => "malformed response",
    }
}

/// Ask the upstream proxy to CONNECT to `dest`.
///
/// `timeout` bounds only the wait for the 8 response bytes; once this
/// returns, the stream carries no timeout at all.
pub async fn handshake<S>(stream: &mut S, dest: OriginalDestination, timeout: Duration) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = Request::connect(dest).encode()?;
    stream.write_all(&request).await?;

    let mut raw = [0u8; RESPONSE_LEN];
    let mut got = 0;
    if let Ok(read) = time::timeout(timeout, read_full(stream, &mut raw, &mut got)).await {
        read?;
    }
    if got != RESPONSE_LEN {
        return Err(Error::ResponseLength(got));
    }

    let response = Response::decode(&raw);
    if !response.is_granted() {
        log::debug!("upstream says: {}", describe_status(response.status));
        return Err(Error::Rejected(response.status));
    }
    Ok(response)
}

/// Read until `buf` is full or the peer closes. `filled` counts what
/// arrived so far and stays valid if the future is dropped midway.
async fn read_full<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut [u8],
    filled: &mut usize,
) -> std::io::Result<()> {
    while *filled < buf.len() {
        match stream.read(&mut buf[*filled..]).await? {
            0 => break,
            n => *filled += n,
        }
    }
    Ok(())
}
