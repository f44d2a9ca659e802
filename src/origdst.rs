//! Recover where a NAT-redirected connection was originally headed.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::AsRawFd;

/// The address/port the client dialed before the redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalDestination {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl OriginalDestination {
    /// What resolution falls back to when the kernel has no mapping.
    pub const UNSPECIFIED: Self = Self {
        addr: Ipv4Addr::UNSPECIFIED,
        port: 0,
    };

    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }
}

impl From<SocketAddrV4> for OriginalDestination {
    fn from(addr: SocketAddrV4) -> Self {
        Self {
            addr: *addr.ip(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for OriginalDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Ask netfilter for the pre-DNAT destination of an accepted socket.
///
/// Best effort: a socket that was never redirected, or any failure of the
/// query itself, yields [`OriginalDestination::UNSPECIFIED`]. The query
/// has no side effects, so calling it again gives the same answer.
pub fn resolve<S: AsRawFd>(socket: &S) -> OriginalDestination {
    match query(socket.as_raw_fd()) {
        Ok(dest) => dest,
        Err(e) => {
            log::debug!("no original destination: {e}");
            OriginalDestination::UNSPECIFIED
        }
    }
}

#[cfg(target_os = "linux")]
fn query(fd: std::os::unix::io::RawFd) -> std::io::Result<OriginalDestination> {
    use std::mem;

    // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
    let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;

    // SAFETY: addr/len describe a writable buffer of the advertised size,
    // and fd stays open for the duration of the borrow held by `resolve`.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_IP,
            libc::SO_ORIGINAL_DST,
            &mut addr as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(OriginalDestination {
        addr: Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)),
        port: u16::from_be(addr.sin_port),
    })
}

#[cfg(not(target_os = "linux"))]
fn query(_fd: std::os::unix::io::RawFd) -> std::io::Result<OriginalDestination> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "SO_ORIGINAL_DST is linux only",
    ))
}
