//! Anonymous identity ("soul") subsystem.
//!
//! # Data Flow
//! ```text
//! request (+ ClientKey from the rate limiter)
//!     → middleware.rs (get-or-create soul for the client key)
//!     → SoulContext { soul_id } in request extensions
//!     → handlers read it explicitly via Extension<SoulContext>
//! ```
//!
//! # Design Decisions
//! - One soul per client key, ever; creation is race-safe
//! - Assignment failure degrades to "no soul", never to a failed request

pub mod middleware;
pub mod types;

pub use middleware::{soul_middleware, SoulState};
pub use types::{ClientKey, Soul, SoulContext};
