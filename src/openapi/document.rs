//! OpenAPI document loading and structural checks.
//!
//! The document is kept as a `serde_json::Value` tree (YAML is converted on
//! load) and exposed through a few typed accessors. It is never mutated after
//! loading, so one instance is shared read-only behind an `Arc`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Operation keys of an OpenAPI path item.
pub const OPERATION_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Methods a route table is built from.
pub const ROUTED_METHODS: [&str; 5] = ["get", "put", "delete", "post", "patch"];

/// Depth limit when following chains of `$ref` objects
const MAX_REF_DEPTH: u32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("Failed to read OpenAPI document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse OpenAPI document: {0}")]
    Parse(#[from] serde_yml::Error),

    #[error("Invalid OpenAPI document:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
        }
    }
}

/// A parameter declared on a path item or an operation.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub schema: Value,
}

/// A parsed, structurally checked OpenAPI 3.x document.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    root: Value,
    source: Option<PathBuf>,
}

impl OpenApiDocument {
    /// Load a YAML or JSON document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SpecError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = Self::parse(&contents)?;
        document.source = Some(path.to_path_buf());

        tracing::debug!(
            path = %path.display(),
            paths = document.paths().count(),
            "Loaded OpenAPI document"
        );
        Ok(document)
    }

    /// Parse a YAML or JSON document from memory.
    pub fn parse(contents: &str) -> Result<Self, SpecError> {
        let yaml: serde_yml::Value = serde_yml::from_str(contents)?;
        Self::from_value(yaml_to_json(yaml))
    }

    pub fn from_value(root: Value) -> Result<Self, SpecError> {
        let violations = check_structure(&root);
        if !violations.is_empty() {
            return Err(SpecError::Invalid(violations));
        }
        Ok(Self { root, source: None })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// File the document was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Path templates with their path items, in document order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.root
            .get("paths")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|paths| paths.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Operation object for `method` (any case) on `template`.
    ///
    /// An explicit `null` operation counts as absent.
    pub fn operation(&self, template: &str, method: &str) -> Option<&Value> {
        let item = self.resolve(self.root.get("paths")?.get(template)?);
        item.get(method.to_ascii_lowercase())
            .filter(|operation| !operation.is_null())
    }

    /// Parameters of an operation, path-level ones overridden by
    /// operation-level ones with the same name and location.
    pub fn parameters(&self, template: &str, method: &str) -> Vec<Parameter> {
        let Some(item) = self
            .root
            .get("paths")
            .and_then(|paths| paths.get(template))
            .map(|item| self.resolve(item))
        else {
            return Vec::new();
        };

        let mut parameters: Vec<Parameter> = Vec::new();
        let sources = [
            item.get("parameters"),
            self.operation(template, method)
                .and_then(|operation| operation.get("parameters")),
        ];
        for raw in sources.into_iter().flatten().filter_map(Value::as_array).flatten() {
            let Some(parameter) = self.parse_parameter(raw) else {
                continue;
            };
            match parameters
                .iter_mut()
                .find(|p| p.name == parameter.name && p.location == parameter.location)
            {
                Some(existing) => *existing = parameter,
                None => parameters.push(parameter),
            }
        }
        parameters
    }

    fn parse_parameter(&self, raw: &Value) -> Option<Parameter> {
        let param = self.resolve(raw);
        let name = param.get("name")?.as_str()?.to_string();
        let location = ParamLocation::parse(param.get("in")?.as_str()?)?;
        let schema = param
            .get("schema")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({"type": "string"}));
        let required = param
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Some(Parameter {
            name,
            location,
            required,
            schema,
        })
    }

    /// Look up a local reference such as `#/components/schemas/Record`.
    pub fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        self.root.pointer(pointer)
    }

    /// Follow `$ref` objects until a concrete value is reached.
    ///
    /// Unresolvable references are returned as-is.
    pub fn resolve<'a>(&'a self, mut value: &'a Value) -> &'a Value {
        for _ in 0..MAX_REF_DEPTH {
            let Some(target) = value
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|reference| self.resolve_ref(reference))
            else {
                break;
            };
            value = target;
        }
        value
    }

    /// Security requirements for an operation, falling back to the
    /// document-level requirements.
    pub fn security_requirements<'a>(&'a self, operation: &'a Value) -> &'a [Value] {
        operation
            .get("security")
            .or_else(|| self.root.get("security"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn security_scheme(&self, name: &str) -> Option<&Value> {
        self.root
            .get("components")?
            .get("securitySchemes")?
            .get(name)
            .map(|scheme| self.resolve(scheme))
    }

    /// Path prefixes contributed by `servers[*].url`, longest first.
    ///
    /// Always ends with the empty prefix, so requests without the server
    /// base path still match.
    pub fn server_base_paths(&self) -> Vec<String> {
        let mut prefixes: BTreeSet<String> = self
            .root
            .get("servers")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|server| server.get("url")?.as_str())
            .filter_map(server_url_path)
            .collect();
        prefixes.remove("");

        let mut prefixes: Vec<String> = prefixes.into_iter().collect();
        prefixes.sort_by_key(|prefix| std::cmp::Reverse(prefix.len()));
        prefixes.push(String::new());
        prefixes
    }
}

/// Path component of a server URL, without the trailing slash.
///
/// URLs with server variables are skipped.
fn server_url_path(url: &str) -> Option<String> {
    if url.contains('{') {
        return None;
    }
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or(""),
        None if url.starts_with('/') => url,
        None => "",
    };
    Some(path.trim_end_matches('/').to_string())
}

/// Placeholder names of a path template, e.g. `id` for `/records/{id}`.
pub fn template_placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        names.push(&rest[start + 1..start + len]);
        rest = &rest[start + len + 1..];
    }
    names
}

fn yaml_to_json(value: serde_yml::Value) -> Value {
    match value {
        serde_yml::Value::Null => Value::Null,
        serde_yml::Value::Bool(b) => Value::Bool(b),
        serde_yml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yml::Value::String(s) => Value::String(s),
        serde_yml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                // Unquoted status codes (`200:`) arrive as numbers
                let key = match key {
                    serde_yml::Value::String(s) => s,
                    serde_yml::Value::Number(n) => n.to_string(),
                    serde_yml::Value::Bool(b) => b.to_string(),
                    other => format!("{other:?}"),
                };
                object.insert(key, yaml_to_json(value));
            }
            Value::Object(object)
        }
        serde_yml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Every structural violation of an OpenAPI 3.x document.
fn check_structure(root: &Value) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(object) = root.as_object() else {
        return vec!["document root must be a mapping".to_string()];
    };

    match object.get("openapi").and_then(Value::as_str) {
        Some(version) if version.starts_with("3.") => {}
        Some(version) => violations.push(format!("unsupported openapi version \"{version}\"")),
        None => violations.push("missing \"openapi\" version string".to_string()),
    }

    let info = object.get("info");
    for field in ["title", "version"] {
        if info.and_then(|info| info.get(field)).and_then(Value::as_str).is_none() {
            violations.push(format!("missing \"info.{field}\""));
        }
    }

    match object.get("paths") {
        Some(Value::Object(paths)) => {
            for (template, item) in paths {
                check_path_item(root, template, item, &mut violations);
            }
        }
        Some(_) => violations.push("\"paths\" must be a mapping".to_string()),
        None => violations.push("missing \"paths\"".to_string()),
    }

    check_refs(root, root, "", &mut violations);
    violations
}

fn check_path_item(root: &Value, template: &str, item: &Value, violations: &mut Vec<String>) {
    if !template.starts_with('/') {
        violations.push(format!("path \"{template}\" must start with '/'"));
    }
    let Some(item) = item.as_object() else {
        violations.push(format!("path \"{template}\" must be a mapping"));
        return;
    };

    let placeholders: BTreeSet<&str> = template_placeholders(template).into_iter().collect();
    let shared = declared_path_params(root, item.get("parameters"), template, violations);

    for method in OPERATION_METHODS {
        let Some(operation) = item.get(method).filter(|op| !op.is_null()) else {
            continue;
        };
        let label = format!("{} {template}", method.to_uppercase());
        let Some(operation) = operation.as_object() else {
            violations.push(format!("{label}: operation must be a mapping"));
            continue;
        };

        match operation.get("responses").and_then(Value::as_object) {
            Some(responses) if !responses.is_empty() => {
                for status in responses.keys() {
                    if !is_response_key(status) {
                        violations.push(format!("{label}: invalid response key \"{status}\""));
                    }
                }
            }
            _ => violations.push(format!("{label}: missing \"responses\"")),
        }

        let mut declared = shared.clone();
        declared.extend(declared_path_params(
            root,
            operation.get("parameters"),
            &label,
            violations,
        ));

        for name in &placeholders {
            if !declared.contains(*name) {
                violations.push(format!("{label}: path parameter \"{name}\" is not declared"));
            }
        }
        for name in &declared {
            if !placeholders.contains(name.as_str()) {
                violations.push(format!(
                    "{label}: path parameter \"{name}\" does not appear in the path"
                ));
            }
        }
    }
}

/// Names of the path parameters in a parameter list, reporting malformed entries.
fn declared_path_params(
    root: &Value,
    parameters: Option<&Value>,
    label: &str,
    violations: &mut Vec<String>,
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let Some(parameters) = parameters else {
        return names;
    };
    let Some(parameters) = parameters.as_array() else {
        violations.push(format!("{label}: \"parameters\" must be a list"));
        return names;
    };

    for raw in parameters {
        let param = match raw.get("$ref").and_then(Value::as_str) {
            Some(reference) => match reference.strip_prefix('#').and_then(|p| root.pointer(p)) {
                Some(target) => target,
                // Reported by the reference check
                None => continue,
            },
            None => raw,
        };
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            violations.push(format!("{label}: parameter without a name"));
            continue;
        };
        let location = param.get("in").and_then(Value::as_str);
        match location.and_then(ParamLocation::parse) {
            Some(ParamLocation::Path) => {
                if param.get("required").and_then(Value::as_bool) != Some(true) {
                    violations.push(format!(
                        "{label}: path parameter \"{name}\" must be required"
                    ));
                }
                names.insert(name.to_string());
            }
            Some(_) => {}
            None => violations.push(format!(
                "{label}: parameter \"{name}\" has invalid location {location:?}"
            )),
        }
    }
    names
}

fn is_response_key(key: &str) -> bool {
    if key == "default" {
        return true;
    }
    let bytes = key.as_bytes();
    if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
        return false;
    }
    let rest = &key[1..];
    rest.eq_ignore_ascii_case("xx") || rest.bytes().all(|b| b.is_ascii_digit())
}

fn check_refs(root: &Value, value: &Value, location: &str, violations: &mut Vec<String>) {
    match value {
        Value::Object(object) => {
            if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
                match reference.strip_prefix('#') {
                    Some(pointer) if root.pointer(pointer).is_some() => {}
                    Some(_) => violations.push(format!(
                        "{location}: unresolved reference \"{reference}\""
                    )),
                    None => violations.push(format!(
                        "{location}: external reference \"{reference}\" is not supported"
                    )),
                }
            }
            for (key, child) in object {
                check_refs(root, child, &format!("{location}/{key}"), violations);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                check_refs(root, child, &format!("{location}/{idx}"), violations);
            }
        }
        _ => {}
    }
}
