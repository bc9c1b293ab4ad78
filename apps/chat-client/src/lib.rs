pub mod attention;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod store;
pub mod surface;
pub mod terminal;

pub use client::{ChatClient, ClientHandle, Command};
pub use config::Config;
pub use error::ClientError;
pub use session::ClientSnapshot;
