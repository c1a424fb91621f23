//! Connection registry for live charge point sessions.

mod connection;
mod registry;

pub use connection::Connection;
pub use registry::{SessionRegistry, SharedSessionRegistry};
