pub mod actions;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::AppState;

/// Catches paths no route matched. `/v1/actions/` (trailing slash, empty
/// action segment) still belongs to the actions endpoint.
pub async fn fallback(
    state: State<AppState>,
    method: Method,
    uri: Uri,
    query: Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    if actions::is_actions_path(uri.path()) {
        return actions::execute_action(state, method, uri, query, body)
            .await
            .into_response();
    }
    let body = serde_json::json!({
        "error": StatusCode::NOT_FOUND.as_u16(),
        "status": "The requested path was not found.",
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
