mod genders;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(genders::router())
}

async fn health() -> &'static str {
    "ok"
}
