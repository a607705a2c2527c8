pub mod app;
pub mod config;
pub mod db;
pub mod error;

// Search
pub mod indexer;
pub mod search;

// HTTP and real-time surfaces
pub mod api;
pub mod realtime;

pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use app::{build_app, create_app, App};
pub use config::{ConfigOverrides, Settings};
pub use error::{Error, Result};
