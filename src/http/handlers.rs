//! Route handlers for the pixel grid and soul endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::{CacheConfig, GridConfig};
use crate::grid::{Color, PixelPosition};
use crate::http::response::{cache_rule, ApiError};
use crate::observability::metrics;
use crate::souls::{Soul, SoulContext};
use crate::storage::Database;

/// Souls returned per page by `GET /api/souls`.
pub const SOULS_PAGE_SIZE: u32 = 100;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub grid: GridConfig,
    pub caches: CacheConfig,
    /// Serializes the is-initialized check with the bulk insert.
    pub init_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: Database, grid: GridConfig, caches: CacheConfig) -> Self {
        Self {
            db,
            grid,
            caches,
            init_lock: Arc::new(Mutex::new(())),
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.grid.quota_cooldown_secs)
    }
}

fn require_soul(soul: Option<Extension<SoulContext>>) -> Result<i64, ApiError> {
    soul.map(|Extension(ctx)| ctx.soul_id)
        .ok_or(ApiError::MissingSoul)
}

fn palette() -> BTreeMap<&'static str, u8> {
    Color::ALL.iter().map(|c| (c.name(), c.code())).collect()
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// Column-oriented grid snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct PixelsResponse {
    pub allowed_colors: BTreeMap<String, u8>,
    pub colors: Vec<u8>,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
}

/// `GET /api/pixels`
pub async fn list_pixels(State(state): State<AppState>) -> Result<Json<PixelsResponse>, ApiError> {
    let pixels = state.db.pixels().await?;

    let mut response = PixelsResponse {
        allowed_colors: palette()
            .into_iter()
            .map(|(name, code)| (name.to_string(), code))
            .collect(),
        colors: Vec::with_capacity(pixels.len()),
        x: Vec::with_capacity(pixels.len()),
        y: Vec::with_capacity(pixels.len()),
    };
    for pixel in pixels {
        response.colors.push(pixel.color.code());
        response.x.push(pixel.x);
        response.y.push(pixel.y);
    }
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct PaintRequest {
    pub x: i64,
    pub y: i64,
    pub color: String,
}

/// `POST /api/pixels/paint`
pub async fn paint_pixel(
    State(state): State<AppState>,
    soul: Option<Extension<SoulContext>>,
    payload: Result<Json<PaintRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let soul_id = require_soul(soul)?;
    let Json(data) = payload.map_err(ApiError::from_json_rejection)?;

    let color: Color = data
        .color
        .parse()
        .map_err(|_| ApiError::validation("invalid color"))?;
    let position = PixelPosition { x: data.x, y: data.y };
    if !position.is_valid() {
        return Err(ApiError::validation("invalid x/y"));
    }

    match state
        .db
        .claim_pixel(soul_id, position, color, state.grid.quota)
        .await
    {
        Ok(()) => {
            tracing::info!(soul_id, x = position.x, y = position.y, %color, "Pixel painted");
            metrics::record_claim("painted");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => {
            let err = ApiError::from_claim(e, state.cooldown());
            metrics::record_claim(match err {
                ApiError::QuotaExceeded { .. } => "quota_exceeded",
                ApiError::Storage(_) => "error",
                _ => "rejected",
            });
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub pixels: Vec<PixelPosition>,
}

/// `POST /api/pixels/register`
///
/// Creates the grid once, owned by the caller and painted white.
pub async fn register_pixels(
    State(state): State<AppState>,
    soul: Option<Extension<SoulContext>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let soul_id = require_soul(soul)?;
    let Json(data) = payload.map_err(ApiError::from_json_rejection)?;

    if data.pixels.is_empty() {
        return Err(ApiError::validation("no pixels given"));
    }
    if data.pixels.len() > state.grid.max_register_cells {
        return Err(ApiError::validation(format!(
            "at most {} pixels may be registered",
            state.grid.max_register_cells
        )));
    }
    if data.pixels.iter().any(|p| !p.is_valid()) {
        return Err(ApiError::validation("invalid x/y"));
    }

    let _guard = state.init_lock.lock().await;
    if state.db.is_initialized().await? {
        return Err(ApiError::AlreadyInitialized);
    }
    let inserted = state
        .db
        .initialize_grid(data.pixels, soul_id, Color::White)
        .await?;

    tracing::info!(soul_id, inserted, "Pixel field registered");
    Ok(StatusCode::NO_CONTENT)
}

/// Caller's own soul and remaining quota.
#[derive(Debug, Serialize, Deserialize)]
pub struct SoulResponse {
    pub seed: String,
    pub painted_pixels: i64,
    pub quota: u32,
    pub remaining: i64,
}

/// `GET /api/souls/me`
pub async fn get_my_soul(
    State(state): State<AppState>,
    soul: Option<Extension<SoulContext>>,
) -> Result<Response, ApiError> {
    let soul_id = require_soul(soul)?;
    let soul: Soul = state
        .db
        .soul(soul_id)
        .await?
        .ok_or(ApiError::MissingSoul)?;

    let quota = state.grid.quota;
    let body = SoulResponse {
        remaining: (i64::from(quota) - soul.painted_pixels).max(0),
        seed: soul.seed,
        painted_pixels: soul.painted_pixels,
        quota,
    };

    let mut response = Json(body).into_response();
    if state.caches.souls_me_secs > 0 {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            cache_rule(Duration::from_secs(state.caches.souls_me_secs)),
        );
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// `GET /api/souls?page=N` (1-based)
pub async fn list_souls(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Soul>>, ApiError> {
    let Query(query) = query.map_err(|_| ApiError::validation("page param must be int"))?;
    let page = query.page.unwrap_or(1);
    if page <= 0 {
        return Err(ApiError::validation("page param must be positive"));
    }

    let offset = (page as u64 - 1).saturating_mul(u64::from(SOULS_PAGE_SIZE));
    let souls = state.db.souls_page(SOULS_PAGE_SIZE, offset).await?;
    Ok(Json(souls))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_lists_all_colors() {
        let colors = palette();
        assert_eq!(colors.len(), 8);
        assert_eq!(colors["black"], 1);
        assert_eq!(colors["orange"], 8);
    }

    #[test]
    fn test_missing_soul_is_rejected() {
        assert!(matches!(require_soul(None), Err(ApiError::MissingSoul)));
        let ctx = Extension(SoulContext { soul_id: 3 });
        assert_eq!(require_soul(Some(ctx)).unwrap(), 3);
    }
}
