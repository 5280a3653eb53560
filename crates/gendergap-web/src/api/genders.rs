use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use gendergap_core::gender::{CacheLayer, UpsertOutcome};
use gendergap_core::{Gender, GenderOracle};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-genders", get(get_genders))
        .route("/overrides/{name}", put(put_override))
}

#[derive(Debug, Deserialize)]
pub struct GendersQuery {
    #[serde(default)]
    people: String,
}

fn split_people(people: &str) -> Vec<String> {
    people
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

async fn get_genders(
    State(state): State<AppState>,
    Query(query): Query<GendersQuery>,
) -> Result<Json<HashMap<String, Gender>>, (StatusCode, String)> {
    let names = split_people(&query.people);
    let genders = state.resolver.genders(&names).await.map_err(|e| {
        tracing::error!(names = names.len(), error = %e, "gender lookup failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    tracing::debug!(names = names.len(), "genders served");
    Ok(Json(genders))
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub gender: Gender,
}

#[derive(Debug, Serialize)]
pub struct OverrideResponse {
    pub name: String,
    pub gender: Gender,
}

/// Record a manual correction. A different correction already on file is
/// kept and reported as a conflict.
async fn put_override(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<OverrideRequest>,
) -> Result<Json<OverrideResponse>, (StatusCode, String)> {
    let outcome = state
        .store
        .upsert(CacheLayer::Manual, &name, body.gender)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match outcome {
        UpsertOutcome::Conflict { kept } => Err((
            StatusCode::CONFLICT,
            format!("{name} is already recorded as {kept}"),
        )),
        _ => Ok(Json(OverrideResponse {
            name,
            gender: body.gender,
        })),
    }
}
