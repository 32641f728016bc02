//! Request/response validation against an OpenAPI document.
//!
//! [`validate_exchange`] is the test harness: it matches a request to a
//! documented operation, validates the request, runs the handler under test
//! in memory, validates what the handler produced and optionally checks the
//! status and a body substring. [`validate_request`] and
//! [`validate_response`] are the individual steps.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::Query;
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::Router;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use super::document::{OpenApiDocument, ParamLocation};
use super::matcher::{SchemaRoute, SchemaRouter};
use super::schema::{coerce_parameter, validate_value};
use crate::config::{MAX_VALIDATED_BODY_BYTES, VALIDATION_TIMEOUT};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid OpenAPI path table: {0}")]
    Router(String),

    #[error("No route in OpenAPI document for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("Method {method} is not documented for {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Request does not match {operation}: {reason}")]
    Request { operation: String, reason: String },

    #[error("Security requirements of {operation} not satisfied: {reason}")]
    Security { operation: String, reason: String },

    #[error("Response does not match {operation}: {reason}")]
    Response { operation: String, reason: String },

    #[error("Failed to record handler response: {0}")]
    Recording(String),

    #[error("Expected status {expected} but handler returned {actual}")]
    UnexpectedStatus { expected: u16, actual: u16 },

    #[error("Response body does not contain {expected:?}: {body}")]
    MissingSubstring { expected: String, body: String },

    #[error("Validation did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// What an authentication callback gets to see for one security scheme.
pub struct AuthenticationInput<'a> {
    pub scheme_name: &'a str,
    /// The `components.securitySchemes` entry, if declared
    pub scheme: Option<&'a Value>,
    pub scopes: Vec<&'a str>,
    pub request: &'a Parts,
}

/// Decides whether a request satisfies one security scheme.
pub type AuthenticationFn =
    Arc<dyn for<'a> Fn(&AuthenticationInput<'a>) -> Result<(), String> + Send + Sync>;

/// Accepts every security scheme, for exercising protected routes in tests.
pub fn noop_authentication() -> AuthenticationFn {
    Arc::new(|_: &AuthenticationInput<'_>| -> Result<(), String> { Ok(()) })
}

#[derive(Clone, Default)]
pub struct RequestValidationOptions {
    pub exclude_request_body: bool,
    pub exclude_query_params: bool,
    /// Without a callback, operations with security requirements fail.
    pub authentication: Option<AuthenticationFn>,
}

impl RequestValidationOptions {
    pub fn with_authentication(mut self, authentication: AuthenticationFn) -> Self {
        self.authentication = Some(authentication);
        self
    }
}

impl fmt::Debug for RequestValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestValidationOptions")
            .field("exclude_request_body", &self.exclude_request_body)
            .field("exclude_query_params", &self.exclude_query_params)
            .field("authentication", &self.authentication.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseValidationOptions {
    /// Fail when the returned status is not documented at all
    pub include_response_status: bool,
    pub exclude_response_body: bool,
}

/// In-memory capture of a handler's response.
#[derive(Debug, Clone)]
pub struct RecordedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedResponse {
    pub async fn capture(response: Response) -> Result<Self, ValidationError> {
        let (parts, body) = response.into_parts();
        let body = to_bytes(body, MAX_VALIDATED_BODY_BYTES)
            .await
            .map_err(|e| ValidationError::Recording(e.to_string()))?;
        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Everything one harness run needs.
pub struct ValidationRequest {
    request: Request<Body>,
    document: Arc<OpenApiDocument>,
    handler: MethodRouter,
    request_options: RequestValidationOptions,
    response_options: ResponseValidationOptions,
    expected_status: Option<StatusCode>,
    expected_body_substring: Option<String>,
    timeout: Duration,
}

impl ValidationRequest {
    /// `handler` is mounted at the matched path template, so axum path
    /// extractors see the documented parameter names.
    pub fn new(request: Request<Body>, document: Arc<OpenApiDocument>, handler: MethodRouter) -> Self {
        Self {
            request,
            document,
            handler,
            request_options: RequestValidationOptions::default(),
            response_options: ResponseValidationOptions::default(),
            expected_status: None,
            expected_body_substring: None,
            timeout: VALIDATION_TIMEOUT,
        }
    }

    pub fn with_request_options(mut self, options: RequestValidationOptions) -> Self {
        self.request_options = options;
        self
    }

    pub fn with_response_options(mut self, options: ResponseValidationOptions) -> Self {
        self.response_options = options;
        self
    }

    pub fn with_expected_status(mut self, status: StatusCode) -> Self {
        self.expected_status = Some(status);
        self
    }

    /// An empty substring disables the body check.
    pub fn with_expected_body_substring(mut self, substring: impl Into<String>) -> Self {
        let substring = substring.into();
        self.expected_body_substring = (!substring.is_empty()).then_some(substring);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Validate a request, run the handler on it and validate the response.
///
/// Response status validation is always switched on here: a handler
/// returning an undocumented status fails the run.
pub async fn validate_exchange(
    request: ValidationRequest,
) -> Result<RecordedResponse, ValidationError> {
    let ValidationRequest {
        request,
        document,
        handler,
        request_options,
        mut response_options,
        expected_status,
        expected_body_substring,
        timeout,
    } = request;
    response_options.include_response_status = true;

    let router = SchemaRouter::new(&document)?;
    let route = router.find_route(request.method(), request.uri().path())?;

    let exchange = async {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, MAX_VALIDATED_BODY_BYTES)
            .await
            .map_err(|e| ValidationError::Request {
                operation: route.label(),
                reason: format!("unreadable body: {e}"),
            })?;

        validate_request(&document, &route, &parts, &body, &request_options)?;

        let app = Router::new().route(&route.mount_path(), handler);
        let response = match app.oneshot(Request::from_parts(parts, Body::from(body))).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let recorded = RecordedResponse::capture(response).await?;

        validate_response(&document, &route, &recorded, &response_options)?;

        if let Some(expected) = expected_status {
            if expected != recorded.status {
                return Err(ValidationError::UnexpectedStatus {
                    expected: expected.as_u16(),
                    actual: recorded.status.as_u16(),
                });
            }
        }

        if let Some(expected) = expected_body_substring {
            let body = recorded.body_text();
            if !body.contains(expected.as_str()) {
                return Err(ValidationError::MissingSubstring {
                    expected,
                    body: body.into_owned(),
                });
            }
        }

        Ok::<_, ValidationError>(recorded)
    };

    let recorded = tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| ValidationError::DeadlineExceeded(timeout))??;

    tracing::debug!(
        operation = %route.label(),
        status = recorded.status.as_u16(),
        "Exchange conforms to OpenAPI document"
    );
    Ok(recorded)
}

/// Validate parameters, security and body of a request against its route.
pub fn validate_request(
    document: &OpenApiDocument,
    route: &SchemaRoute<'_>,
    parts: &Parts,
    body: &[u8],
    options: &RequestValidationOptions,
) -> Result<(), ValidationError> {
    let fail = |reason: String| ValidationError::Request {
        operation: route.label(),
        reason,
    };

    let query: Vec<(String, String)> = if options.exclude_query_params {
        Vec::new()
    } else {
        Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(pairs)| pairs)
            .map_err(|e| fail(format!("malformed query string: {e}")))?
    };

    for parameter in document.parameters(route.template, route.method.as_str()) {
        let raw: Vec<&str> = match parameter.location {
            ParamLocation::Path => route.path_param(&parameter.name).into_iter().collect(),
            ParamLocation::Query if options.exclude_query_params => continue,
            ParamLocation::Query => query
                .iter()
                .filter(|(name, _)| *name == parameter.name)
                .map(|(_, value)| value.as_str())
                .collect(),
            ParamLocation::Header => parts
                .headers
                .get_all(parameter.name.as_str())
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect(),
            ParamLocation::Cookie => continue,
        };

        let location = parameter.location.as_str();
        if raw.is_empty() {
            if parameter.required {
                return Err(fail(format!(
                    "missing required {location} parameter \"{}\"",
                    parameter.name
                )));
            }
            continue;
        }

        let value = coerce_parameter(document, &raw, &parameter.schema)
            .map_err(|e| fail(format!("{location} parameter \"{}\": {e}", parameter.name)))?;
        validate_value(document, &parameter.schema, &value)
            .map_err(|e| fail(format!("{location} parameter \"{}\": {e}", parameter.name)))?;
    }

    validate_security(document, route, parts, options)?;

    let Some(request_body) = route
        .operation
        .get("requestBody")
        .map(|request_body| document.resolve(request_body))
    else {
        return Ok(());
    };

    if body.is_empty() {
        let required = request_body
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        return if required {
            Err(fail("request body is required".to_string()))
        } else {
            Ok(())
        };
    }
    if options.exclude_request_body {
        return Ok(());
    }

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    validate_content(document, request_body.get("content"), content_type, body).map_err(fail)
}

fn validate_security(
    document: &OpenApiDocument,
    route: &SchemaRoute<'_>,
    parts: &Parts,
    options: &RequestValidationOptions,
) -> Result<(), ValidationError> {
    let requirements = document.security_requirements(route.operation);
    if requirements.is_empty() {
        return Ok(());
    }
    let fail = |reason: String| ValidationError::Security {
        operation: route.label(),
        reason,
    };
    let Some(authenticate) = options.authentication.as_ref() else {
        return Err(fail("no authentication function configured".to_string()));
    };

    let mut last_error = String::new();
    for requirement in requirements {
        let Some(schemes) = requirement.as_object() else {
            continue;
        };
        let outcome = schemes.iter().try_for_each(|(scheme_name, scopes)| {
            let input = AuthenticationInput {
                scheme_name,
                scheme: document.security_scheme(scheme_name),
                scopes: scopes
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(Value::as_str)
                    .collect(),
                request: parts,
            };
            authenticate(&input).map_err(|e| format!("{scheme_name}: {e}"))
        });
        match outcome {
            // Any satisfied requirement (including the empty one) is enough
            Ok(()) => return Ok(()),
            Err(e) => last_error = e,
        }
    }
    Err(fail(last_error))
}

/// Validate a recorded response against the documented responses of its route.
pub fn validate_response(
    document: &OpenApiDocument,
    route: &SchemaRoute<'_>,
    response: &RecordedResponse,
    options: &ResponseValidationOptions,
) -> Result<(), ValidationError> {
    let fail = |reason: String| ValidationError::Response {
        operation: route.label(),
        reason,
    };
    let status = response.status.as_u16();

    let Some(definition) = route
        .operation
        .get("responses")
        .and_then(Value::as_object)
        .and_then(|responses| {
            let range = format!("{}XX", status / 100);
            responses
                .get(&status.to_string())
                .or_else(|| responses.get(&range))
                .or_else(|| responses.get(&range.to_lowercase()))
                .or_else(|| responses.get("default"))
        })
        .map(|definition| document.resolve(definition))
    else {
        return if options.include_response_status {
            Err(fail(format!("status {status} is not documented")))
        } else {
            Ok(())
        };
    };

    if let Some(headers) = definition.get("headers").and_then(Value::as_object) {
        for (name, header) in headers {
            // Content-Type is described by `content`, not `headers`
            if name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            let header = document.resolve(header);
            let values: Vec<&str> = response
                .headers
                .get_all(name.as_str())
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect();
            if values.is_empty() {
                if header.get("required").and_then(Value::as_bool) == Some(true) {
                    return Err(fail(format!("missing required header \"{name}\"")));
                }
                continue;
            }
            if let Some(schema) = header.get("schema") {
                let value = coerce_parameter(document, &values, schema)
                    .map_err(|e| fail(format!("header \"{name}\": {e}")))?;
                validate_value(document, schema, &value)
                    .map_err(|e| fail(format!("header \"{name}\": {e}")))?;
            }
        }
    }

    if options.exclude_response_body {
        return Ok(());
    }
    validate_content(
        document,
        definition.get("content"),
        response.content_type(),
        &response.body,
    )
    .map_err(fail)
}

/// Check a body against a `content` map: media type first, then the JSON
/// schema for JSON media types.
fn validate_content(
    document: &OpenApiDocument,
    content: Option<&Value>,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(), String> {
    let Some(content) = content
        .and_then(Value::as_object)
        .filter(|content| !content.is_empty())
    else {
        return Ok(());
    };
    let declared: Vec<&str> = content.keys().map(String::as_str).collect();

    let Some(content_type) = content_type else {
        return Err(format!(
            "missing Content-Type header, expected one of {declared:?}"
        ));
    };
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let Some(media) = find_media_type(content, &media_type) else {
        return Err(format!(
            "Content-Type \"{media_type}\" is not one of {declared:?}"
        ));
    };

    if !is_json(&media_type) {
        return Ok(());
    }
    if body.is_empty() {
        return Err(format!("empty body, expected {media_type}"));
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("body is not valid JSON: {e}"))?;
    match media.get("schema") {
        Some(schema) => validate_value(document, schema, &value),
        None => Ok(()),
    }
}

/// Declared media type matching `media_type`: exact, then `type/*`, then `*/*`.
fn find_media_type<'a>(
    content: &'a serde_json::Map<String, Value>,
    media_type: &str,
) -> Option<&'a Value> {
    let wildcard = media_type
        .split_once('/')
        .map(|(kind, _)| format!("{kind}/*"))
        .unwrap_or_default();
    content
        .iter()
        .find(|(declared, _)| declared.eq_ignore_ascii_case(media_type))
        .or_else(|| {
            content
                .iter()
                .find(|(declared, _)| declared.eq_ignore_ascii_case(&wildcard))
        })
        .or_else(|| content.iter().find(|(declared, _)| declared.as_str() == "*/*"))
        .map(|(_, media)| media)
}

fn is_json(media_type: &str) -> bool {
    media_type == "application/json" || media_type.ends_with("+json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderValue;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Json;
    use serde_json::json;

    const DOC: &str = r##"
openapi: "3.0.3"
info: {title: Validator tests, version: "1"}
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - {name: id, in: path, required: true, schema: {type: integer, minimum: 1}}
        - {name: verbose, in: query, schema: {type: boolean}}
        - {name: X-Trace, in: header, required: true, schema: {type: string}}
      responses:
        "200":
          description: ok
          headers:
            X-Count:
              required: true
              schema: {type: integer}
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Item"
        4XX:
          description: client error
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Error"
  /items:
    post:
      security:
        - apiKey: []
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Item"
      responses:
        "201":
          description: created
        default:
          description: failure
components:
  securitySchemes:
    apiKey: {type: apiKey, in: header, name: X-Api-Key}
  schemas:
    Item:
      type: object
      required: [id]
      properties:
        id: {type: integer}
    Error:
      type: object
      required: [error_code]
      properties:
        error_code: {type: string}
"##;

    fn document() -> Arc<OpenApiDocument> {
        Arc::new(OpenApiDocument::parse(DOC).unwrap())
    }

    fn item_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("X-Trace", "t-1")
            .body(Body::empty())
            .unwrap()
    }

    fn item_handler() -> MethodRouter {
        get(|axum::extract::Path(id): axum::extract::Path<i64>| async move {
            let mut response = Json(json!({"id": id})).into_response();
            response
                .headers_mut()
                .insert("X-Count", HeaderValue::from_static("1"));
            response
        })
    }

    #[tokio::test]
    async fn test_conforming_exchange_passes() {
        let recorded = validate_exchange(
            ValidationRequest::new(item_request("/items/7?verbose=true"), document(), item_handler())
                .with_expected_status(StatusCode::OK)
                .with_expected_body_substring("7"),
        )
        .await
        .unwrap();
        assert_eq!(recorded.status, StatusCode::OK);
        assert_eq!(recorded.content_type(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_unknown_route_fails_before_handler() {
        let err = validate_exchange(ValidationRequest::new(
            item_request("/unknown"),
            document(),
            item_handler(),
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, ValidationError::RouteNotFound { .. }));
    }

    #[tokio::test]
    async fn test_path_parameter_constraint_is_enforced() {
        let err = validate_exchange(ValidationRequest::new(
            item_request("/items/0"),
            document(),
            item_handler(),
        ))
        .await
        .unwrap_err();
        match err {
            ValidationError::Request { operation, reason } => {
                assert_eq!(operation, "getItem");
                assert!(reason.contains("path parameter \"id\""), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_query_parameter_type_is_enforced() {
        let err = validate_exchange(ValidationRequest::new(
            item_request("/items/7?verbose=maybe"),
            document(),
            item_handler(),
        ))
        .await
        .unwrap_err();
        assert!(err.to_string().contains("query parameter \"verbose\""), "{err}");
    }

    #[tokio::test]
    async fn test_excluded_query_parameters_are_skipped() {
        let result = validate_exchange(
            ValidationRequest::new(item_request("/items/7?verbose=maybe"), document(), item_handler())
                .with_request_options(RequestValidationOptions {
                    exclude_query_params: true,
                    ..Default::default()
                }),
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_missing_required_header_is_rejected() {
        let request = Request::builder()
            .uri("/items/7")
            .body(Body::empty())
            .unwrap();
        let err = validate_exchange(ValidationRequest::new(request, document(), item_handler()))
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("missing required header parameter \"X-Trace\""),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_wrong_body_field_type_is_rejected() {
        let handler = get(|| async {
            let mut response = Json(json!({"id": "seven"})).into_response();
            response
                .headers_mut()
                .insert("X-Count", HeaderValue::from_static("1"));
            response
        });
        let err = validate_exchange(ValidationRequest::new(
            item_request("/items/7"),
            document(),
            handler,
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, ValidationError::Response { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_missing_required_response_header_is_rejected() {
        let handler = get(|| async { Json(json!({"id": 7})) });
        let err = validate_exchange(ValidationRequest::new(
            item_request("/items/7"),
            document(),
            handler,
        ))
        .await
        .unwrap_err();
        assert!(err.to_string().contains("X-Count"), "{err}");
    }

    #[tokio::test]
    async fn test_status_range_definition_is_used() {
        let handler = get(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"error_code": "err_invalid_id"})),
            )
        });
        let recorded = validate_exchange(
            ValidationRequest::new(item_request("/items/7"), document(), handler)
                .with_expected_body_substring("err_invalid_id"),
        )
        .await
        .unwrap();
        assert_eq!(recorded.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_undocumented_status_is_rejected() {
        let handler = get(|| async { StatusCode::INTERNAL_SERVER_ERROR });
        let err = validate_exchange(ValidationRequest::new(
            item_request("/items/7"),
            document(),
            handler,
        ))
        .await
        .unwrap_err();
        assert!(err.to_string().contains("status 500 is not documented"), "{err}");
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected() {
        let handler = get(|| async {
            ([("X-Count", "1"), ("content-type", "text/plain")], "{\"id\":1}")
        });
        let err = validate_exchange(ValidationRequest::new(
            item_request("/items/7"),
            document(),
            handler,
        ))
        .await
        .unwrap_err();
        assert!(err.to_string().contains("text/plain"), "{err}");
    }

    #[tokio::test]
    async fn test_unexpected_status_is_reported() {
        let err = validate_exchange(
            ValidationRequest::new(item_request("/items/7"), document(), item_handler())
                .with_expected_status(StatusCode::NOT_FOUND),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnexpectedStatus {
                expected: 404,
                actual: 200
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_substring_is_reported() {
        let err = validate_exchange(
            ValidationRequest::new(item_request("/items/7"), document(), item_handler())
                .with_expected_body_substring("pong"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingSubstring { .. }));
    }

    #[tokio::test]
    async fn test_empty_substring_skips_body_check() {
        let result = validate_exchange(
            ValidationRequest::new(item_request("/items/7"), document(), item_handler())
                .with_expected_body_substring(""),
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
    }

    fn create_request(body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/items")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn create_handler() -> MethodRouter {
        post(|| async { StatusCode::CREATED })
    }

    #[tokio::test]
    async fn test_security_without_authentication_fails() {
        let err = validate_exchange(ValidationRequest::new(
            create_request(r#"{"id":1}"#),
            document(),
            create_handler(),
        ))
        .await
        .unwrap_err();
        assert!(matches!(err, ValidationError::Security { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_noop_authentication_allows_request() {
        let result = validate_exchange(
            ValidationRequest::new(create_request(r#"{"id":1}"#), document(), create_handler())
                .with_request_options(
                    RequestValidationOptions::default().with_authentication(noop_authentication()),
                ),
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_rejecting_authentication_reports_scheme() {
        let deny: AuthenticationFn = Arc::new(|input: &AuthenticationInput<'_>| {
            assert_eq!(input.scheme.unwrap()["in"], "header");
            Err("no key".to_string())
        });
        let err = validate_exchange(
            ValidationRequest::new(create_request(r#"{"id":1}"#), document(), create_handler())
                .with_request_options(RequestValidationOptions::default().with_authentication(deny)),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("apiKey: no key"), "{err}");
    }

    #[tokio::test]
    async fn test_invalid_request_body_is_rejected() {
        let err = validate_exchange(
            ValidationRequest::new(create_request(r#"{"id":"x"}"#), document(), create_handler())
                .with_request_options(
                    RequestValidationOptions::default().with_authentication(noop_authentication()),
                ),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ValidationError::Request { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_missing_required_body_is_rejected() {
        let err = validate_exchange(
            ValidationRequest::new(create_request(""), document(), create_handler())
                .with_request_options(
                    RequestValidationOptions::default().with_authentication(noop_authentication()),
                ),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("request body is required"), "{err}");
    }

    #[tokio::test]
    async fn test_slow_handler_hits_deadline() {
        let handler = get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        });
        let err = validate_exchange(
            ValidationRequest::new(item_request("/items/7"), document(), handler)
                .with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ValidationError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn test_percent_encoded_path_parameter_is_decoded() {
        let recorded = validate_exchange(
            ValidationRequest::new(item_request("/items/%37"), document(), item_handler())
                .with_expected_status(StatusCode::OK)
                .with_expected_body_substring(r#"{"id":7}"#),
        )
        .await
        .unwrap();
        assert_eq!(recorded.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_root_template_under_server_base_path_reaches_handler() {
        let document = Arc::new(
            OpenApiDocument::parse(
                r#"
openapi: "3.0.3"
info: {title: Root, version: "1"}
servers:
  - url: https://to-be-defined.whoknows/v1
paths:
  /:
    get:
      responses:
        "200":
          description: index
          content:
            application/json:
              schema: {type: object, required: [ok]}
"#,
            )
            .unwrap(),
        );
        let request = Request::builder().uri("/v1").body(Body::empty()).unwrap();
        let handler = get(|| async { Json(json!({"ok": true})) });

        let recorded = validate_exchange(
            ValidationRequest::new(request, document, handler).with_expected_status(StatusCode::OK),
        )
        .await
        .unwrap();
        assert_eq!(recorded.body_text(), r#"{"ok":true}"#);
    }

    #[test]
    fn test_media_type_wildcards() {
        let content = json!({"application/*": {}, "*/*": {"schema": {}}});
        let content = content.as_object().unwrap();
        assert!(find_media_type(content, "application/json").is_some());
        assert!(find_media_type(content, "text/plain").unwrap().get("schema").is_some());
    }
}
