//! Soul records and request-scoped identity.

use serde::Serialize;

/// A durable per-client identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Soul {
    /// Internal row id. Never sent to clients.
    #[serde(skip)]
    pub id: i64,
    /// Resolved client key. Never sent to clients.
    #[serde(skip)]
    pub address: String,
    /// Opaque client-facing token (UUIDv7), fixed at creation.
    pub seed: String,
    pub painted_pixels: i64,
}

/// Attached to the request extensions once a soul has been assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoulContext {
    pub soul_id: i64,
}

/// Resolved client key, attached by the first pipeline stage that computes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);
