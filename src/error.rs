use std::io;
use std::net::SocketAddrV4;
use std::time::Duration;

use thiserror::Error;

/// Everything that can end a session or the whole relay.
#[derive(Error, Debug)]
pub enum Error {
    /// socket/bind/listen on the local port failed
    #[error("cannot listen on port {port}: {source}")]
    Listen { port: u16, source: io::Error },

    /// accept() reported a hard OS error
    #[error("accept failed: {0}")]
    Accept(io::Error),

    /// serialized request is not the 9 bytes the wire expects
    #[error("socks4 request is {0} bytes, expected 9")]
    WireFormat(usize),

    /// upstream proxy refused or was unreachable; the cause stays in `source`
    #[error("connection failed")]
    Connect { addr: SocketAddrV4, source: io::Error },

    #[error("connection to {0} timed out after {1:?}")]
    ConnectTimeout(SocketAddrV4, Duration),

    /// upstream closed or went quiet before sending all 8 response bytes
    #[error("wrong response length {0}")]
    ResponseLength(usize),

    #[error("wrong socks status code, must be 90, is {0}")]
    Rejected(u8),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the whole process has to stop, not just one session.
    pub fn is_fatal_process(&self) -> bool {
        matches!(
            self,
            Error::Listen { .. } | Error::Accept(_) | Error::WireFormat(_)
        )
    }

    /// The raw OS error number, if any, for the legacy `err <n>` log lines.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Listen { source, .. } | Error::Connect { source, .. } => {
                source.raw_os_error()
            }
            Error::Accept(e) | Error::Io(e) => e.raw_os_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_fatal_classification() {
        assert!(Error::WireFormat(10).is_fatal_process());
        assert!(Error::Accept(io::Error::from_raw_os_error(libc::EBADF)).is_fatal_process());
        assert!(Error::Listen {
            port: 6021,
            source: io::Error::from(io::ErrorKind::AddrInUse),
        }
        .is_fatal_process());

        assert!(!Error::Rejected(91).is_fatal_process());
        assert!(!Error::ResponseLength(0).is_fatal_process());
        assert!(!Error::Io(io::Error::from(io::ErrorKind::BrokenPipe)).is_fatal_process());
    }

    #[test]
    fn messages() {
        assert_eq!(Error::ResponseLength(3).to_string(), "wrong response length 3");
        let refused = Error::Connect {
            addr: "127.0.0.1:6020".parse().unwrap(),
            source: io::Error::from_raw_os_error(libc::ECONNREFUSED),
        };
        assert_eq!(refused.to_string(), "connection failed");
        assert_eq!(
            Error::Rejected(91).to_string(),
            "wrong socks status code, must be 90, is 91"
        );
    }

    #[test]
    fn errno_of_connect() {
        let err = Error::Connect {
            addr: "127.0.0.1:6020".parse().unwrap(),
            source: io::Error::from_raw_os_error(libc::ECONNREFUSED),
        };
        assert_eq!(err.errno(), Some(libc::ECONNREFUSED));
        assert_eq!(Error::Rejected(0).errno(), None);
    }
}
