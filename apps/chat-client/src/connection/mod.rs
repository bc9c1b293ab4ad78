//! Connection lifecycle: one live duplex link, fixed-delay reconnect.

pub mod events;
pub mod manager;
pub mod transport;

pub use events::{ConnectionEvent, ConnectionState, EventSink, TaggedEvent};
pub use manager::ConnectionManager;
pub use transport::{Connector, WsConnector};
