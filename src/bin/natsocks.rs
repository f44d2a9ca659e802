use std::net::Ipv4Addr;
use std::process;
use std::time::Duration;

use clap::error::ErrorKind;
use clap::Parser;
use natsocks::{logging, Config, Listener};

/// Transparent relay: NAT-redirected TCP goes out through a SOCKS4 proxy.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// port the iptables rule redirects to
    local_port: u16,
    /// SOCKS4 proxy address, e.g. an `ssh -D` forward
    remote_ip: Ipv4Addr,
    remote_port: u16,

    /// log nothing
    #[arg(short, long)]
    quiet: bool,

    /// seconds allowed for connecting to the proxy
    #[arg(long, default_value_t = 15)]
    connect_timeout: u64,
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => {
            let name = std::env::args().next().unwrap_or_else(|| "natsocks".into());
            println!("usage: {name} <local port> <remote IP> <remote port>");
            process::exit(1);
        }
    };

    let config = Config::new(args.local_port, args.remote_ip, args.remote_port)
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .log_enabled(!args.quiet);
    logging::init(config.log_enabled);

    let listener = match Listener::bind(config).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };

    if let Err(e) = listener.run().await {
        log::error!("{e}");
        process::exit(1);
    }
}
