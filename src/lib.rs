pub mod analyzer;
pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod host;
pub mod index;
pub mod indexer;
pub mod model;
pub mod server;
pub mod util;
