//! API handlers run through the OpenAPI validation harness.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, MethodRouter};
use axum::Json;
use http::{Request, StatusCode};
use serde_json::json;

use routecheck::config::{AppConfig, ApiVariant};
use routecheck::handlers::{ApiHandlers, DefaultErrorHandler, PingHandler};
use routecheck::openapi::{validate_exchange, OpenApiDocument, ValidationError, ValidationRequest};
use routecheck::routes::api;
use routecheck::state::AppState;

const BASE_URL: &str = "https://to-be-defined.whoknows";

fn document(variant: ApiVariant) -> Arc<OpenApiDocument> {
    static RECORDS: OnceLock<Arc<OpenApiDocument>> = OnceLock::new();
    static ERRORS: OnceLock<Arc<OpenApiDocument>> = OnceLock::new();

    let cell = match variant {
        ApiVariant::Records => &RECORDS,
        ApiVariant::Errors => &ERRORS,
    };
    cell.get_or_init(|| {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(variant.default_spec_path());
        Arc::new(OpenApiDocument::load(path).expect("shipped OpenAPI document loads"))
    })
    .clone()
}

fn state(handlers: ApiHandlers) -> AppState {
    AppState::new(AppConfig::default(), handlers)
}

fn request(method: &str, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(format!("{BASE_URL}{path}"))
        .body(Body::empty())
        .unwrap()
}

async fn run(
    variant: ApiVariant,
    request: Request<Body>,
    handler: MethodRouter,
    expected_status: StatusCode,
    expected_body: &str,
) -> Result<String, ValidationError> {
    let recorded = validate_exchange(
        ValidationRequest::new(request, document(variant), handler)
            .with_expected_status(expected_status)
            .with_expected_body_substring(expected_body),
    )
    .await?;
    Ok(recorded.body_text().into_owned())
}

#[tokio::test]
async fn ping_conforms() {
    let handler = get(api::ping).with_state(state(ApiHandlers::default()));
    let body = run(
        ApiVariant::Records,
        request("GET", "/api/ping"),
        handler,
        StatusCode::OK,
        "pong",
    )
    .await
    .unwrap();
    assert_eq!(body, r#"{"ping":"pong"}"#);
}

#[tokio::test]
async fn get_record_cases_conform() {
    let cases = [
        ("-1", StatusCode::UNPROCESSABLE_ENTITY, "err_invalid_id"),
        ("1", StatusCode::NOT_FOUND, "err_not_found"),
        ("5", StatusCode::OK, "5"),
    ];

    for (id, status, body) in cases {
        let handler = get(api::get_record).with_state(state(ApiHandlers::default()));
        let result = run(
            ApiVariant::Records,
            request("GET", &format!("/api/get-record/{id}")),
            handler,
            status,
            body,
        )
        .await;
        assert!(result.is_ok(), "id {id}: {}", result.unwrap_err());
    }
}

#[tokio::test]
async fn non_integer_id_is_rejected_by_request_validation() {
    let handler = get(api::get_record).with_state(state(ApiHandlers::default()));
    let err = run(
        ApiVariant::Records,
        request("GET", "/api/get-record/abc"),
        handler,
        StatusCode::UNPROCESSABLE_ENTITY,
        "",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ValidationError::Request { .. }), "{err}");
}

#[tokio::test]
async fn errors_variant_conforms() {
    let handler = get(api::not_found).with_state(state(ApiHandlers::default()));
    run(
        ApiVariant::Errors,
        request("GET", "/api/not-found"),
        handler,
        StatusCode::NOT_FOUND,
        "err_not_found",
    )
    .await
    .unwrap();

    let handler = post(api::internal_server_error).with_state(state(ApiHandlers::default()));
    let body = run(
        ApiVariant::Errors,
        request("POST", "/api/internal-server-error"),
        handler,
        StatusCode::INTERNAL_SERVER_ERROR,
        "",
    )
    .await
    .unwrap();
    assert!(body.is_empty());
}

/// Answers with the right status but a string id.
struct StringIdHandler;

#[async_trait]
impl PingHandler for StringIdHandler {
    async fn ping(&self) -> Response {
        Json(json!({"ping": "pong"})).into_response()
    }

    async fn get_record(&self, raw_id: &str) -> Response {
        Json(json!({"id": raw_id})).into_response()
    }
}

#[tokio::test]
async fn wrong_field_type_is_rejected_despite_documented_status() {
    let handlers = ApiHandlers::new(Arc::new(StringIdHandler), Arc::new(DefaultErrorHandler));
    let handler = get(api::get_record).with_state(state(handlers));

    let err = run(
        ApiVariant::Records,
        request("GET", "/api/get-record/5"),
        handler,
        StatusCode::OK,
        "5",
    )
    .await
    .unwrap_err();
    match err {
        ValidationError::Response { operation, .. } => assert_eq!(operation, "getRecord"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn undocumented_route_is_rejected() {
    let handler = get(api::ping).with_state(state(ApiHandlers::default()));
    let err = run(
        ApiVariant::Errors,
        request("GET", "/api/get-record/5"),
        handler,
        StatusCode::OK,
        "",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ValidationError::RouteNotFound { .. }), "{err}");
}
