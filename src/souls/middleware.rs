//! Soul assignment middleware.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::net::{self, X_FORWARDED_FOR};
use crate::souls::{ClientKey, SoulContext};
use crate::storage::Database;

/// State required for soul assignment.
#[derive(Clone)]
pub struct SoulState {
    pub db: Database,
    pub trust_forwarded: bool,
}

/// Attach a [`SoulContext`] for the caller, creating the soul on first
/// contact.
///
/// Reuses the [`ClientKey`] left by the rate limiter when present. Storage
/// failures are logged and the request continues without a soul; handlers
/// that need one reject it themselves.
pub async fn soul_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<SoulState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let key = match req.extensions().get::<ClientKey>() {
        Some(ClientKey(key)) => key.clone(),
        None => {
            let forwarded = req
                .headers()
                .get(X_FORWARDED_FOR)
                .and_then(|v| v.to_str().ok());
            net::resolve_socket(addr, forwarded, state.trust_forwarded)
        }
    };

    match state.db.assign_soul(&key).await {
        Ok(soul_id) => {
            req.extensions_mut().insert(SoulContext { soul_id });
        }
        Err(e) => {
            tracing::error!(client = %key, error = %e, "Soul assignment failed");
        }
    }

    next.run(req).await
}
