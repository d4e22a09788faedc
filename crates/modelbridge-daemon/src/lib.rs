//! ModelBridge Daemon library
//!
//! This module provides the pieces of the `modelbridged` binary:
//! - UM-Bridge REST API handlers
//! - Startup configuration
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use server::Server;
