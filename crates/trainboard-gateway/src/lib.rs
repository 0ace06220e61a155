//! trainboard-gateway: Data access gateways.
//!
//! Implements the `DataGateway` trait over a PostgREST backend and over an
//! in-memory snapshot, so trainboard can read training records from a live
//! database or from fixtures.

pub mod config;
pub mod error;
pub mod memory;
pub mod postgrest;

pub use config::{load_gateway_config, GatewayConfig, TableNames};
pub use error::GatewayError;
pub use memory::{Entity, MemoryGateway};
pub use postgrest::PostgrestGateway;
