//! Thin HTTP surface. Two behaviors on `/`:
//! `?url=<post url>` resolves a post and returns it as JSON;
//! `?video-done=<filename>` releases a previously delivered local file.
//! Status mapping only — all logic lives behind [`Picker`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::dispatch::Picker;

pub fn router(picker: Arc<Picker>) -> Router {
    Router::new().route("/", get(handle)).with_state(picker)
}

async fn handle(State(picker): State<Arc<Picker>>, Query(queries): Query<HashMap<String, String>>) -> Response {
    if let Some(filename) = queries.get("video-done") {
        picker.release(filename);
        return StatusCode::OK.into_response();
    }

    let Some(url) = queries.get("url") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match picker.resolve(url).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            log::error!("failed to resolve {url}: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
