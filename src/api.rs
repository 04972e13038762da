//! HTTP API.
//!
//! * `GET /apy` - current and SMA reference APR, reporting partial failures
//!   in the `error` field.
//! * `GET /activity?first=N` - most recent APY updates and ownership transfers.
//! * `GET /entities/:kind?first=N` - most recent records of one kind.
//! * `GET /entities/:kind/:id` - single record.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use fastnum::UD128;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    feed::ApyFeed,
    query::{RECENT_ACTIVITY_SIZE, RecentActivity},
    store::{Entity, EntityId, EntityKind, Store},
};

/// Upper bound of records returned by a single request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Routes serving the reference APR.
pub fn apy_router<F>(feed: Arc<F>) -> Router
where
    F: ApyFeed + Send + Sync + 'static,
{
    Router::new().route("/apy", get(apy::<F>)).with_state(feed)
}

/// Routes serving the indexed records.
pub fn records_router(store: Arc<Store>) -> Router {
    Router::new()
        .route("/activity", get(activity))
        .route("/entities/:kind", get(list_entities))
        .route("/entities/:kind/:id", get(get_entity))
        .with_state(store)
}

/// Reference APR values, in percent.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApyResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_apr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma_apr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub first: Option<usize>,
}

impl PageQuery {
    fn size(&self) -> usize {
        self.first.unwrap_or(RECENT_ACTIVITY_SIZE).min(MAX_PAGE_SIZE)
    }
}

fn to_f64(value: UD128) -> f64 {
    value.to_string().parse().unwrap_or_default()
}

async fn apy<F: ApyFeed>(State(feed): State<Arc<F>>) -> Json<ApyResponse> {
    let (current, sma) = futures::join!(feed.current_apr(), feed.sma_apr());

    let response = match (current, sma) {
        (Ok(current), Ok(sma)) => ApyResponse {
            current_apr: Some(to_f64(current)),
            sma_apr: Some(to_f64(sma)),
            error: None,
        },
        (Err(current_err), Err(sma_err)) => {
            warn!(%current_err, %sma_err, "Failed to fetch both APR values");
            ApyResponse {
                error: Some("Failed to fetch both APR values.".to_string()),
                ..Default::default()
            }
        }
        (Err(current_err), Ok(sma)) => {
            warn!(%current_err, %sma, "Failed to fetch current APR");
            ApyResponse {
                sma_apr: Some(to_f64(sma)),
                error: Some("Failed to fetch current APR.".to_string()),
                ..Default::default()
            }
        }
        (Ok(current), Err(sma_err)) => {
            warn!(%sma_err, %current, "Failed to fetch SMA APR");
            ApyResponse {
                current_apr: Some(to_f64(current)),
                error: Some("Failed to fetch SMA APR.".to_string()),
                ..Default::default()
            }
        }
    };

    Json(response)
}

async fn activity(
    State(store): State<Arc<Store>>,
    Query(page): Query<PageQuery>,
) -> Json<RecentActivity> {
    Json(RecentActivity::from_store(&store, page.size()))
}

async fn list_entities(
    State(store): State<Arc<Store>>,
    Path(kind): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Entity>>, StatusCode> {
    let kind: EntityKind = kind.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(store.recent(kind, page.size())))
}

async fn get_entity(
    State(store): State<Arc<Store>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Entity>, StatusCode> {
    let kind: EntityKind = kind.parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    store
        .get(kind, &EntityId::from(id))
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
