//! OpenAPI document support.
//!
//! This module loads an OpenAPI 3.x document and checks the HTTP API against it
//! in two ways:
//! - **Route consistency**: the documented path/method table and the table of
//!   registered routes must match in both directions
//! - **Exchange validation**: a single request is validated, handed to a handler
//!   in memory and the handler's response is validated, all under a deadline
//!
//! Key re-exports:
//! - [`OpenApiDocument`] - Loaded, structurally checked document
//! - [`RouteTable`] / [`check_consistency`] - Route consistency check
//! - [`validate_exchange`] - Request/response validation harness

mod consistency;
mod document;
mod matcher;
mod route_table;
mod schema;
mod validator;

pub use consistency::{check_consistency, ConsistencyReport, Discrepancy};
pub use document::{
    template_placeholders, OpenApiDocument, ParamLocation, Parameter, SpecError, ROUTED_METHODS,
};
pub use matcher::{SchemaRoute, SchemaRouter};
pub use route_table::RouteTable;
pub use schema::{coerce_parameter, validate_value};
pub use validator::{
    noop_authentication, validate_exchange, validate_request, validate_response,
    AuthenticationFn, AuthenticationInput, RecordedResponse, RequestValidationOptions,
    ResponseValidationOptions, ValidationError, ValidationRequest,
};

use std::path::Path;

use crate::routes::RouteRegistry;

/// Load the document at `spec_path` and compare its routes with `registry`.
pub fn check_registry_against_spec<S>(
    spec_path: &Path,
    registry: &RouteRegistry<S>,
) -> Result<ConsistencyReport, SpecError> {
    let document = OpenApiDocument::load(spec_path)?;
    let report = check_consistency(
        &RouteTable::from_document(&document),
        &RouteTable::from_registry(registry),
    );

    for discrepancy in report.discrepancies() {
        tracing::warn!(path = discrepancy.path(), "{discrepancy}");
    }
    Ok(report)
}
