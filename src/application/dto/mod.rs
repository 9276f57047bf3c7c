//! Data Transfer Objects - For API boundaries
//!
//! Bodies accepted and returned by the HTTP and WebSocket adapters that do
//! not map one-to-one onto a domain type.

pub mod combat;

pub use combat::*;
