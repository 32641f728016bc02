//! Matching concrete requests to OpenAPI path templates.

use http::Method;
use percent_encoding::percent_decode_str;
use serde_json::Value;

use super::document::OpenApiDocument;
use super::validator::ValidationError;

/// An operation of the document selected for a request.
#[derive(Debug, Clone)]
pub struct SchemaRoute<'doc> {
    /// Server base path stripped from the request path
    pub base_path: String,
    pub template: &'doc str,
    pub method: Method,
    pub operation: &'doc Value,
    /// Percent-decoded path parameter values
    pub path_params: Vec<(String, String)>,
}

impl SchemaRoute<'_> {
    /// `operationId` when present, otherwise `METHOD /template`.
    pub fn label(&self) -> String {
        match self.operation.get("operationId").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => format!("{} {}", self.method, self.template),
        }
    }

    /// Path the handler under test is mounted at.
    pub fn mount_path(&self) -> String {
        if self.template == "/" && !self.base_path.is_empty() {
            return self.base_path.clone();
        }
        format!("{}{}", self.base_path, self.template)
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Router over the path templates of one document.
pub struct SchemaRouter<'doc> {
    document: &'doc OpenApiDocument,
    templates: matchit::Router<&'doc str>,
    base_paths: Vec<String>,
}

impl<'doc> SchemaRouter<'doc> {
    pub fn new(document: &'doc OpenApiDocument) -> Result<Self, ValidationError> {
        let mut templates = matchit::Router::new();
        for (template, _) in document.paths() {
            templates
                .insert(template, template)
                .map_err(|e| ValidationError::Router(format!("{template}: {e}")))?;
        }

        Ok(Self {
            document,
            templates,
            base_paths: document.server_base_paths(),
        })
    }

    /// Find the operation serving `method` on the concrete `path`.
    pub fn find_route(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<SchemaRoute<'doc>, ValidationError> {
        for base_path in &self.base_paths {
            let Some(rest) = path.strip_prefix(base_path.as_str()) else {
                continue;
            };
            let rest = if rest.is_empty() { "/" } else { rest };
            let Ok(matched) = self.templates.at(rest) else {
                continue;
            };

            let template: &'doc str = *matched.value;
            let operation = self
                .document
                .operation(template, method.as_str())
                .ok_or_else(|| ValidationError::MethodNotAllowed {
                    method: method.to_string(),
                    path: template.to_string(),
                })?;
            let path_params = matched
                .params
                .iter()
                .map(|(key, value)| {
                    let value = percent_decode_str(value).decode_utf8_lossy();
                    (key.to_string(), value.into_owned())
                })
                .collect();

            return Ok(SchemaRoute {
                base_path: base_path.clone(),
                template,
                method: method.clone(),
                operation,
                path_params,
            });
        }

        Err(ValidationError::RouteNotFound {
            method: method.to_string(),
            path: path.to_string(),
        })
    }
}
