//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → security::rate_limit (429 or continue)
//!     → souls::middleware (attach SoulContext)
//!     → compression (br / zstd / gzip)
//!     → handlers.rs (pixels, souls)
//!     → response.rs (error → status + JSON body)
//!     → Send to client
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use handlers::AppState;
pub use response::{ApiError, ErrorBody};
pub use server::HttpServer;
