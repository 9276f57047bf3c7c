//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Persistence: JSON snapshot files and SQLite record stores
//! - HTTP: REST API routes
//! - WebSocket: Real-time state pushes to viewers
//! - Workers: push, persistence and cross-process sync loops
//! - Config: Application configuration
//! - State: Shared application state

pub mod clock;
pub mod config;
pub mod http;
pub mod persistence;
pub mod state;
pub mod viewers;
pub mod websocket;
pub mod workers;
