use crate::routes::{QueryRoute, ResultShape};
use crate::state::AppState;
use axum::{
    extract::{MatchedPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Liveness reply, kept verbatim from the dashboard's original backend.
pub async fn root_handler() -> &'static str {
    "¡Servidor funcionando correctamente!"
}

/// Generic handler for every query route: look up the template for the
/// matched path, run it against the engine, serialize per the route's shape.
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    path: MatchedPath,
) -> Response {
    let route = match state.routes.get(path.as_str()) {
        Some(r) => r,
        None => {
            // Only reachable if the router and the route table drift apart.
            error!("No query template registered for {}", path.as_str());
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    debug!("Running query for {}", route.path);
    let rows = match state.engine.run_query(&route.sql).await {
        Ok(rows) => rows,
        Err(e) => return query_failure(route, e),
    };

    match route.shape {
        ResultShape::RowList => (StatusCode::OK, Json(Value::Array(rows))).into_response(),
        ResultShape::SingleRow => match rows.into_iter().next() {
            Some(row) => (StatusCode::OK, Json(row)).into_response(),
            // Aggregate queries always produce one row; an empty result set
            // means the engine broke its contract.
            None => query_failure(route, anyhow::anyhow!("aggregate query returned no rows")),
        },
    }
}

fn query_failure(route: &QueryRoute, err: anyhow::Error) -> Response {
    // Full detail stays server-side; the client gets a short static message.
    error!("Query execution failed for {}: {:?}", route.path, err);
    (StatusCode::INTERNAL_SERVER_ERROR, route.error_msg).into_response()
}

/// Assembles the router from the route table held in `AppState`.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new().route("/", axum::routing::get(root_handler));
    let mut paths: Vec<&'static str> = state.routes.values().map(|r| r.path).collect();
    paths.sort_unstable();
    for path in paths {
        app = app.route(path, axum::routing::get(query_handler));
    }
    app.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use serde_json::json;
    use tower::ServiceExt;

    // Mock engine that settles every job immediately. With `fail` set, job
    // submission is rejected outright.
    async fn spawn_mock_engine(rows: Value, fail: bool) -> String {
        let app = Router::new()
            .route(
                "/v1/jobs",
                post(move || async move {
                    if fail {
                        (
                            StatusCode::SERVICE_UNAVAILABLE,
                            Json(json!({ "error": "engine down" })),
                        )
                    } else {
                        (StatusCode::OK, Json(json!({ "job_id": "job-1" })))
                    }
                }),
            )
            .route(
                "/v1/jobs/:id",
                get(|| async { Json(json!({ "state": "DONE" })) }),
            )
            .route(
                "/v1/jobs/:id/rows",
                get(move || {
                    let rows = rows.clone();
                    async move { Json(rows) }
                }),
            );

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = axum::Server::from_tcp(listener)
            .expect("server")
            .serve(app.into_make_service());
        tokio::spawn(server);
        format!("http://127.0.0.1:{}", addr.port())
    }

    async fn gateway_for(rows: Value, fail: bool) -> Router {
        let engine_url = spawn_mock_engine(rows, fail).await;
        let cfg = Config {
            engine_url,
            fact_table: "proj.ds.fact".to_string(),
            license_table: "proj.ds.licencias".to_string(),
            listen: None,
            frontend_origin: None,
            license_routes: None,
            timeout_secs: Some(2),
            poll_interval_ms: Some(10),
        };
        let state = Arc::new(AppState::from_config(&cfg).expect("state"));
        router(state)
    }

    async fn get_response(app: Router, path: &str) -> (StatusCode, Vec<u8>) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method(axum::http::Method::GET)
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("response");
        let status = resp.status();
        let body = hyper::body::to_bytes(resp.into_body()).await.expect("body");
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn root_replies_with_liveness_text() {
        let app = gateway_for(json!([]), false).await;
        let (status, body) = get_response(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "¡Servidor funcionando correctamente!"
        );
    }

    #[tokio::test]
    async fn row_list_route_returns_rows_in_engine_order() {
        let rows = json!([
            { "nivel_de_riesgo": "ALTO", "total": 7 },
            { "nivel_de_riesgo": "BAJO", "total": 2 },
            { "nivel_de_riesgo": "MEDIO", "total": 4 }
        ]);
        let app = gateway_for(rows.clone(), false).await;
        let (status, body) = get_response(app, "/niveles_riesgo").await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(v, rows, "array shape, engine order preserved");
    }

    #[tokio::test]
    async fn single_row_route_returns_bare_object() {
        let rows = json!([{ "TOTAL_SOD": 42 }]);
        let app = gateway_for(rows, false).await;
        let (status, body) = get_response(app, "/conteoSOD").await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).expect("json");
        assert!(v.is_object(), "single-row routes must not wrap in an array");
        assert_eq!(v["TOTAL_SOD"], 42);
    }

    #[tokio::test]
    async fn engine_failure_maps_to_500_with_route_message() {
        let app = gateway_for(json!([]), true).await;
        for (path, msg) in [
            ("/usuarios", "failed to retrieve users"),
            ("/totalUsers", "failed to retrieve the total user count"),
            ("/usuarios_licencias", "failed to retrieve license counts"),
        ] {
            let (status, body) = get_response(app.clone(), path).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", path);
            let body = String::from_utf8(body).unwrap();
            assert_eq!(body, msg, "{} should answer with its own message", path);
        }
    }

    #[tokio::test]
    async fn empty_result_on_aggregate_route_is_a_failure() {
        let app = gateway_for(json!([]), false).await;
        let (status, body) = get_response(app, "/totalUsers").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.is_empty(), "failure reply carries a message");
    }

    #[tokio::test]
    async fn unknown_path_is_not_served() {
        let app = gateway_for(json!([]), false).await;
        let (status, _) = get_response(app, "/no_such_route").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn license_detail_route_is_served() {
        let rows = json!([
            { "usuario": "A", "Licencia": "GB Advanced Use" },
            { "usuario": "B", "Licencia": "GC Core Use" }
        ]);
        let app = gateway_for(rows.clone(), false).await;
        let (status, body) = get_response(app, "/usuarios_licencia_detalle").await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(v, rows);
    }
}
