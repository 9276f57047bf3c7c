//! Application layer - Use cases over the combat engine
//!
//! Services here own the shared encounter state and talk to storage only
//! through the outbound ports.

pub mod dto;
pub mod ports;
pub mod services;
