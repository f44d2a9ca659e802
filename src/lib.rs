pub mod config;
pub mod error;
pub mod listener;
pub mod logging;
pub mod origdst;
pub mod relay;
pub mod socks4;
pub mod worker;

pub use config::Config;
pub use error::Error;
pub use listener::Listener;

pub type Result<T> = std::result::Result<T, Error>;
