use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::time;

use crate::config::Config;
use crate::error::Error;
use crate::origdst;
use crate::relay::{EndReason, TunnelSession};
use crate::socks4;
use crate::Result;

/// Handles one redirected connection from accept to close.
pub struct Worker {
    client: TcpStream,
    config: Arc<Config>,
}

impl Worker {
    pub fn new(client: TcpStream, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Resolve, connect, handshake, relay. Any error ends this session
    /// only; whatever sockets are open are closed on return.
    pub async fn process(self) -> Result<EndReason> {
        let dest = origdst::resolve(&self.client);
        log::info!("Connection request for: {dest}");

        let mut upstream = self.connect_upstream().await?;
        socks4::handshake(&mut upstream, dest, self.config.handshake_timeout).await?;

        let reason = TunnelSession::new(self.client, upstream).run().await;
        log::info!("end connection: {reason}");
        Ok(reason)
    }

    async fn connect_upstream(&self) -> Result<TcpStream> {
        let addr = self.config.upstream;
        match time::timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(Error::Connect { addr, source }),
            Err(_) => Err(Error::ConnectTimeout(addr, self.config.connect_timeout)),
        }
    }
}

/// Run a worker and log how it ended. Only process-fatal errors are
/// handed back to the supervisor.
pub async fn run(client: TcpStream, config: Arc<Config>) -> Result<()> {
    match Worker::new(client, config).process().await {
        Ok(_) => Ok(()),
        Err(e) if e.is_fatal_process() => {
            log::error!("!!! {e} !!!");
            Err(e)
        }
        Err(e) => {
            if let Error::Connect { addr, source } = &e {
                log::debug!("{addr}: {source}");
            }
            log::info!("{}", describe(&e));
            Ok(())
        }
    }
}

/// Log text for a session-ending error. A failed upstream connect carries
/// its OS error number, as in `connection failed err 111`.
fn describe(e: &Error) -> String {
    match (e, e.errno()) {
        (Error::Connect { .. }, Some(errno)) => format!("{e} err {errno}"),
        _ => e.to_string(),
    }
}
