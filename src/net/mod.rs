//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → peer SocketAddr (ConnectInfo) + X-Forwarded-For
//!     → client_addr.rs (resolve canonical client key)
//!     → rate limiter / soul assignment
//! ```
//!
//! # Design Decisions
//! - Never trust X-Forwarded-For from public peers
//! - Resolution is pure and never fails; worst case is the raw peer string

pub mod client_addr;

pub use client_addr::{resolve, resolve_socket, X_FORWARDED_FOR};
