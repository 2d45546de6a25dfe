use actiond_core::endpoint::validate;
use actiond_core::{ActionRequest, Envelope, ParameterSet, RequestError};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, Uri};
use axum::Json;
use tracing::info_span;

use crate::error::AppError;
use crate::state::AppState;

const ACTIONS_PREFIX: &str = "/v1/actions";

pub fn is_actions_path(path: &str) -> bool {
    path == ACTIONS_PREFIX
        || path
            .strip_prefix(ACTIONS_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

// ---------------------------------------------------------------------------
// POST /v1/actions/:name
// ---------------------------------------------------------------------------

/// POST /v1/actions/:name. Resolve targets from the body and query
/// parameters, invoke the action once per target, and return
/// `{"results": [...]}` in target order.
///
/// Returns 400 for a non-POST method, a missing action name, an unparseable
/// body, or a type/filter that cannot be resolved.
/// Returns 404 if the action is not registered.
/// Returns 200 whenever dispatch ran, even if some or all targets failed;
/// failed targets appear as `{"code": 500, ...}` entries.
pub async fn execute_action(
    State(app): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Json<Envelope>, AppError> {
    let mut query_params = ParameterSet::new();
    query_params.merge_query(query);

    // Method and path are checked before the body is looked at.
    let probe = ActionRequest::new(
        method.as_str(),
        uri.path(),
        query_params.clone(),
        app.verbose_errors,
    );
    validate(&probe)?;

    let mut params = ParameterSet::from_body(&body).map_err(|e| RequestError::InvalidBody {
        diagnostic: probe.verbose.then(|| e.to_string()),
    })?;
    params.merge(query_params);

    let request = ActionRequest::new(method.as_str(), uri.path(), params, app.verbose_errors);
    let span = info_span!(
        "action_request",
        request_id = %uuid::Uuid::new_v4(),
        path = %uri.path(),
    );

    let endpoint = app.endpoint.clone();
    let envelope = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        endpoint.handle(&request)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(envelope))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use actiond_core::config::Config;
    use actiond_core::{ActionRegistry, FnAction};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const INVENTORY: &str = r#"
objects:
  - { type: Host, name: h1, attrs: { vars: { os: linux } } }
  - { type: Host, name: h2, attrs: { vars: { os: windows } } }
  - { type: Host, name: h3, attrs: { vars: { os: linux } } }
"#;

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::with_builtins().unwrap();
        registry
            .register(FnAction::new("foo", &["Host"], |target, _| {
                let obj = target
                    .object()
                    .ok_or_else(|| anyhow::anyhow!("no target"))?;
                if obj.name == "h2" {
                    anyhow::bail!("connection refused by {}", obj.name);
                }
                Ok(json!({ "code": 200, "status": format!("done {}", obj.name) }))
            }))
            .unwrap();
        registry
    }

    fn app_with(yaml: &str) -> Router {
        let config = Config::from_yaml(yaml).unwrap();
        build_router(AppState::from_config(&config, registry()))
    }

    fn app() -> Router {
        app_with(INVENTORY)
    }

    async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    // -----------------------------------------------------------------
    // Request-level failures
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn get_is_rejected_with_400() {
        for method in ["GET", "PUT", "DELETE"] {
            let (status, body) = send(app(), method, "/v1/actions/foo", "").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body,
                json!({ "error": 400, "status": "Invalid request type. Must be POST." })
            );
        }
    }

    #[tokio::test]
    async fn method_is_checked_before_body() {
        let (status, body) = send(app(), "GET", "/v1/actions/foo", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "Invalid request type. Must be POST.");
    }

    #[tokio::test]
    async fn missing_action_segment_is_400() {
        for uri in ["/v1/actions", "/v1/actions/"] {
            let (status, body) = send(app(), "POST", uri, "").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["status"], "Action is missing.");
        }
    }

    #[tokio::test]
    async fn unknown_action_is_404() {
        let (status, body) = send(app(), "POST", "/v1/actions/no-such-action", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], 404);
        assert_eq!(body["status"], "Action 'no-such-action' could not be found.");
    }

    #[tokio::test]
    async fn unknown_action_name_is_decoded_in_404() {
        let (status, body) = send(app(), "POST", "/v1/actions/no%20such", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "Action 'no such' could not be found.");
    }

    #[tokio::test]
    async fn empty_selector_does_not_target_everything() {
        for body in [r#"{"type": "Host", "filter": []}"#, r#"{"type": "Host", "host": []}"#] {
            let (status, resp) = send(app(), "POST", "/v1/actions/describe-object", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(resp.get("results").is_none());
        }
    }

    #[tokio::test]
    async fn invalid_filter_is_400_without_diagnostic() {
        let (status, body) = send(
            app(),
            "POST",
            "/v1/actions/foo",
            r#"{"filter": "host.name =="}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["status"],
            "Type/Filter was required but not provided or was invalid."
        );
        assert!(body.get("diagnostic information").is_none());
    }

    #[tokio::test]
    async fn invalid_filter_diagnostic_in_verbose_mode() {
        let (status, body) = send(
            app(),
            "POST",
            "/v1/actions/foo?verbose=1",
            r#"{"type": "Service"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["diagnostic information"],
            "Invalid type 'Service' specified for this query."
        );
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let (status, body) = send(app(), "POST", "/v1/actions/foo", "[1, 2, 3]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "Invalid request body.");
        assert!(body.get("diagnostic information").is_none());

        let (_, verbose) = send(app(), "POST", "/v1/actions/foo?verbose=true", "{").await;
        assert!(verbose.get("diagnostic information").is_some());
    }

    #[tokio::test]
    async fn unrelated_path_is_404() {
        let (status, body) = send(app(), "POST", "/v1/objects/hosts", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], 404);
    }

    // -----------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn partial_failure_is_200_with_ordered_entries() {
        let (status, body) = send(app(), "POST", "/v1/actions/foo", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "results": [
                { "code": 200, "status": "done h1" },
                { "code": 500, "status": "Action execution failed." },
                { "code": 200, "status": "done h3" },
            ]})
        );
    }

    #[tokio::test]
    async fn verbose_body_parameter_adds_per_target_diagnostic() {
        let (status, body) = send(app(), "POST", "/v1/actions/foo", r#"{"verbose": true}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["results"][1]["diagnostic information"],
            "connection refused by h2"
        );
    }

    #[tokio::test]
    async fn server_wide_verbose_errors() {
        let yaml = format!("verbose_errors: true\n{INVENTORY}");
        let (_, body) = send(app_with(&yaml), "POST", "/v1/actions/foo", "").await;
        assert!(body["results"][1].get("diagnostic information").is_some());
    }

    #[tokio::test]
    async fn query_selects_targets() {
        let (status, body) = send(
            app(),
            "POST",
            "/v1/actions/describe-object?type=Host&hosts=h3&hosts=h1",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["h3", "h1"]);
    }

    #[tokio::test]
    async fn body_filter_selects_targets() {
        let (status, body) = send(
            app(),
            "POST",
            "/v1/actions/require-attribute",
            r#"{"type": "Host", "filter": "host.vars.os == os", "filter_vars": {"os": "linux"}, "attribute": "vars.os"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
        assert_eq!(body["results"][0]["value"], "linux");
    }

    #[tokio::test]
    async fn zero_targets_is_empty_results() {
        let (status, body) = send(
            app(),
            "POST",
            "/v1/actions/foo",
            r#"{"filter": "host.vars.os == \"aix\""}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "results": [] }));
    }

    #[tokio::test]
    async fn typeless_action_runs_once() {
        let (status, body) = send(app(), "POST", "/v1/actions/ping?note=hi", "").await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["status"], "pong");
        assert_eq!(results[0]["params"]["note"], "hi");
    }

    #[tokio::test]
    async fn worker_pool_preserves_order() {
        let yaml = format!("dispatch:\n  workers: 3\n{INVENTORY}");
        let (status, body) = send(app_with(&yaml), "POST", "/v1/actions/foo", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["status"], "done h1");
        assert_eq!(body["results"][1]["code"], 500);
        assert_eq!(body["results"][2]["status"], "done h3");
    }

    #[tokio::test]
    async fn identical_requests_give_identical_envelopes() {
        let (_, first) = send(app(), "POST", "/v1/actions/foo", "").await;
        let (_, second) = send(app(), "POST", "/v1/actions/foo", "").await;
        assert_eq!(first, second);
    }

    #[test]
    fn actions_path_detection() {
        assert!(is_actions_path("/v1/actions"));
        assert!(is_actions_path("/v1/actions/"));
        assert!(is_actions_path("/v1/actions/foo"));
        assert!(!is_actions_path("/v1/actionsfoo"));
        assert!(!is_actions_path("/v1/objects"));
    }
}
