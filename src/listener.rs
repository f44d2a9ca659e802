use std::io;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;

use crate::config::Config;
use crate::error::Error;
use crate::worker;
use crate::Result;

const BACKLOG: u32 = 5;

/// Accepts redirected connections and hands each one to its own worker.
pub struct Listener {
    inner: TcpListener,
    config: Arc<Config>,
}

impl Listener {
    pub async fn bind(config: Config) -> Result<Listener> {
        let port = config.listen_port;
        let inner = listen(config.listen_addr()).map_err(|source| Error::Listen { port, source })?;
        let port = inner.local_addr()?.port();
        log::info!("bind/listen port {port}");

        Ok(Listener {
            inner,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept forever. Finished workers are reaped as they complete; the
    /// loop only returns on a process-fatal error.
    pub async fn run(self) -> Result<()> {
        let mut workers = JoinSet::new();

        loop {
            tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok((socket, peer)) => {
                        log::debug!("accepted {peer}");
                        workers.spawn(worker::run(socket, self.config.clone()));
                    }
                    Err(e) if is_transient(&e) => log::warn!("accept: {e}"),
                    Err(e) => return Err(Error::Accept(e)),
                },
                Some(done) = workers.join_next() => match done {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => return Err(e),
                    Err(e) => log::error!("worker died: {e}"),
                },
            }
        }
    }
}

fn listen(addr: SocketAddrV4) -> io::Result<TcpListener> {
    let socket = TcpSocket::new_v4()?;
    socket.set_reuseaddr(true)?;
    socket.bind(addr.into())?;
    socket.listen(BACKLOG)
}

/// accept() failures that concern one connection, or a momentary
/// shortage, rather than the listening socket itself.
fn is_transient(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    ) {
        return true;
    }
    matches!(
        e.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM | libc::EPROTO | libc::EPERM)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_accept_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from_raw_os_error(libc::EMFILE)));
        assert!(!is_transient(&io::Error::from_raw_os_error(libc::EBADF)));
        assert!(!is_transient(&io::Error::from_raw_os_error(libc::EINVAL)));
    }
}
