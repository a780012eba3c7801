pub mod config;
pub mod dataset;
pub mod derive;
pub mod export;
pub mod filter;
pub mod http_cache;
pub mod http_client;
pub mod loader;
pub mod project;
pub mod schema;
pub mod session;
pub mod state;
