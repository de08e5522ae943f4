//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (resolve client key, check per-client budget)
//!     → soul assignment
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Over-budget clients never touch storage
//! - Limiter state is process-local and never persisted
//! - The limiter only admits or rejects; it has no failure mode

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateDecision, RateLimitState, RateLimiter};
