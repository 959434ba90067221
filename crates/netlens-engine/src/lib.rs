// netlens-engine: Async Rust client for the analysis engine's REST API.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::EngineClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
