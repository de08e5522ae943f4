//! Anonymous pixel grid server library.
//!
//! Every visiting client gets a durable soul keyed by its address, requests
//! pass a per-client rate limit, and each soul may paint a bounded number of
//! grid cells.

pub mod config;
pub mod grid;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;
pub mod souls;
pub mod storage;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use storage::Database;
