//! The contract document requests and responses are validated against.
//!
//! A [`Contract`] maps `(path template, method)` pairs to an [`Operation`],
//! which declares the operation's parameters, request body schema and one
//! response schema per status code. The contract is built once at startup,
//! either through the builder API or from a JSON document, and never mutated
//! afterwards.
//!
//! # Example
//!
//! ```
//! use kiosk_core::contract::{Contract, Operation, Parameter, RouteResolution};
//! use kiosk_core::Schema;
//! use http::Method;
//!
//! let contract = Contract::builder("catalog")
//!     .version("1.0.0")
//!     .operation(
//!         Operation::builder("getProduct")
//!             .method(Method::GET)
//!             .path("/products/{id}")
//!             .parameter(Parameter::path("id", Schema::integer()))
//!             .response(200, Schema::object(vec![("id", Schema::integer().required())]))
//!             .build(),
//!     )
//!     .build();
//!
//! match contract.resolve(&Method::GET, "/products/7") {
//!     RouteResolution::Matched { path_params, .. } => assert_eq!(path_params["id"], "7"),
//!     other => panic!("unexpected resolution: {other:?}"),
//! }
//! assert_eq!(contract.resolve(&Method::DELETE, "/products/7"), RouteResolution::MethodNotAllowed);
//! assert_eq!(contract.resolve(&Method::GET, "/orders"), RouteResolution::NotFound);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Schema;

/// An immutable API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// The service name this contract describes.
    name: String,
    /// The contract version.
    #[serde(default = "default_version")]
    version: String,
    /// Human-readable summary of the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Operations in declaration order.
    #[serde(default)]
    operations: Vec<Operation>,
    /// Operation lookup by id.
    #[serde(skip)]
    operation_index: HashMap<String, usize>,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

/// Outcome of matching a request against the contract's routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResolution {
    /// An operation matched both path and method.
    Matched {
        /// Index of the operation, see [`Contract::operation`].
        index: usize,
        /// Path parameter values keyed by template name.
        path_params: HashMap<String, String>,
    },
    /// The path matched a template, but not for this method.
    MethodNotAllowed,
    /// No template matched the path.
    NotFound,
}

/// Errors produced while loading a contract document.
#[derive(Debug, Error)]
pub enum ContractLoadError {
    /// The contract file could not be read.
    #[error("failed to read contract file {path}: {source}")]
    Read {
        /// The file that was being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid contract.
    #[error("failed to parse contract: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two operations share an id.
    #[error("duplicate operation id '{0}'")]
    DuplicateOperation(String),
}

impl Contract {
    /// Creates a new contract builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder::new(name)
    }

    /// Parses a contract from a JSON document.
    ///
    /// ```
    /// use kiosk_core::Contract;
    ///
    /// let contract = Contract::from_json(r#"{
    ///     "name": "greetings",
    ///     "operations": [
    ///         {"operation_id": "hello", "method": "GET", "path": "/hello",
    ///          "responses": {"200": {"type": "object"}}}
    ///     ]
    /// }"#).unwrap();
    ///
    /// assert!(contract.get_operation("hello").is_some());
    /// ```
    pub fn from_json(document: &str) -> Result<Self, ContractLoadError> {
        let mut contract: Self = serde_json::from_str(document)?;
        for operation in &mut contract.operations {
            operation.segments = Operation::parse_path(&operation.path);
        }
        contract.rebuild_index()?;
        Ok(contract)
    }

    /// Reads and parses a JSON contract file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ContractLoadError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| ContractLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&document)
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the contract version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the contract description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns all operations in declaration order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the operation at `index`.
    #[must_use]
    pub fn operation(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    /// Looks up an operation by its id.
    #[must_use]
    pub fn get_operation(&self, operation_id: &str) -> Option<&Operation> {
        self.operation_index
            .get(operation_id)
            .and_then(|&idx| self.operations.get(idx))
    }

    /// Resolves a request path and method to an operation.
    ///
    /// `path` must not include the query string. Literal segments are
    /// compared exactly; `{name}` segments capture one non-empty segment.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> RouteResolution {
        let request_segments = split_path(path);
        let mut path_known = false;

        for (index, operation) in self.operations.iter().enumerate() {
            let Some(path_params) = operation.match_segments(&request_segments) else {
                continue;
            };
            if operation.method() == method {
                return RouteResolution::Matched { index, path_params };
            }
            path_known = true;
        }

        if path_known {
            RouteResolution::MethodNotAllowed
        } else {
            RouteResolution::NotFound
        }
    }

    fn rebuild_index(&mut self) -> Result<(), ContractLoadError> {
        self.operation_index.clear();
        for (idx, op) in self.operations.iter().enumerate() {
            if self
                .operation_index
                .insert(op.operation_id.clone(), idx)
                .is_some()
            {
                return Err(ContractLoadError::DuplicateOperation(
                    op.operation_id.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for [`Contract`].
#[derive(Debug)]
pub struct ContractBuilder {
    name: String,
    version: String,
    description: Option<String>,
    operations: Vec<Operation>,
}

impl ContractBuilder {
    /// Creates a new contract builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: None,
            operations: Vec::new(),
        }
    }

    /// Sets the contract version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the contract description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an operation.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Adds several operations.
    #[must_use]
    pub fn operations(mut self, operations: impl IntoIterator<Item = Operation>) -> Self {
        self.operations.extend(operations);
        self
    }

    /// Builds the contract, rejecting duplicate operation ids.
    pub fn try_build(self) -> Result<Contract, ContractLoadError> {
        let mut contract = Contract {
            name: self.name,
            version: self.version,
            description: self.description,
            operations: self.operations,
            operation_index: HashMap::new(),
        };
        contract.rebuild_index()?;
        Ok(contract)
    }

    /// Builds the contract.
    ///
    /// When two operations share an id, lookups by id return the later one.
    /// Use [`try_build`](Self::try_build) to reject that instead.
    #[must_use]
    pub fn build(self) -> Contract {
        let mut contract = Contract {
            name: self.name,
            version: self.version,
            description: self.description,
            operations: self.operations,
            operation_index: HashMap::new(),
        };
        for (idx, op) in contract.operations.iter().enumerate() {
            contract.operation_index.insert(op.operation_id.clone(), idx);
        }
        contract
    }
}

/// One `(path template, method)` entry of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique identifier, also used to look up the handler.
    operation_id: String,
    /// HTTP method.
    #[serde(with = "http_method_serde")]
    method: Method,
    /// Path template such as `/users/{id}`.
    path: String,
    #[serde(skip)]
    segments: Vec<PathSegment>,
    /// Path and query parameters.
    #[serde(default)]
    parameters: Vec<Parameter>,
    /// Request body schema. `None` means the operation takes no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_schema: Option<Schema>,
    /// Response body schema per status code.
    #[serde(default)]
    responses: BTreeMap<u16, Schema>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Tags for grouping in the documentation page.
    #[serde(default)]
    tags: Vec<String>,
    /// Whether a verified bearer token is required.
    #[serde(default)]
    requires_auth: bool,
}

impl Operation {
    /// Creates a new operation builder.
    #[must_use]
    pub fn builder(operation_id: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(operation_id)
    }

    /// Returns the operation id.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the declared parameters at `location`.
    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }

    /// Returns the request body schema.
    #[must_use]
    pub fn request_schema(&self) -> Option<&Schema> {
        self.request_schema.as_ref()
    }

    /// Returns the response schema declared for `status`.
    #[must_use]
    pub fn response_schema(&self, status: u16) -> Option<&Schema> {
        self.responses.get(&status)
    }

    /// Returns every declared response.
    #[must_use]
    pub fn responses(&self) -> &BTreeMap<u16, Schema> {
        &self.responses
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns whether a verified bearer token is required.
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn match_segments(&self, request_segments: &[&str]) -> Option<HashMap<String, String>> {
        if request_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(request_segments) {
            match pattern {
                PathSegment::Literal(lit) if lit == actual => {}
                PathSegment::Literal(_) => return None,
                PathSegment::Parameter(name) => {
                    params.insert(name.clone(), (*actual).to_string());
                }
            }
        }
        Some(params)
    }

    fn parse_path(path: &str) -> Vec<PathSegment> {
        split_path(path)
            .into_iter()
            .map(|segment| {
                match segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Some(name) => PathSegment::Parameter(name.to_string()),
                    None => PathSegment::Literal(segment.to_string()),
                }
            })
            .collect()
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Builder for [`Operation`].
#[derive(Debug)]
pub struct OperationBuilder {
    operation_id: String,
    method: Method,
    path: String,
    parameters: Vec<Parameter>,
    request_schema: Option<Schema>,
    responses: BTreeMap<u16, Schema>,
    description: Option<String>,
    tags: Vec<String>,
    requires_auth: bool,
}

impl OperationBuilder {
    /// Creates a new operation builder for `GET /`.
    #[must_use]
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            method: Method::GET,
            path: "/".to_string(),
            parameters: Vec::new(),
            request_schema: None,
            responses: BTreeMap::new(),
            description: None,
            tags: Vec::new(),
            requires_auth: false,
        }
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the path template.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Declares a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the request body schema.
    #[must_use]
    pub fn request_schema(mut self, schema: Schema) -> Self {
        self.request_schema = Some(schema);
        self
    }

    /// Declares the response schema for `status`.
    #[must_use]
    pub fn response(mut self, status: u16, schema: Schema) -> Self {
        self.responses.insert(status, schema);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Requires a verified bearer token for this operation.
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Builds the operation.
    #[must_use]
    pub fn build(self) -> Operation {
        let segments = Operation::parse_path(&self.path);
        Operation {
            operation_id: self.operation_id,
            method: self.method,
            path: self.path,
            segments,
            parameters: self.parameters,
            request_schema: self.request_schema,
            responses: self.responses,
            description: self.description,
            tags: self.tags,
            requires_auth: self.requires_auth,
        }
    }
}

#[derive(Debug, Clone)]
enum PathSegment {
    Literal(String),
    Parameter(String),
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// A `{name}` segment of the path template.
    Path,
    /// A query string key.
    Query,
}

impl ParameterLocation {
    /// Returns the prefix used in violation paths (`path`, `query`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
        }
    }
}

/// A declared path or query parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where the parameter is read from.
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Schema the coerced value must satisfy.
    pub schema: Schema,
}

impl Parameter {
    /// Declares a path parameter. Path parameters are always required.
    #[must_use]
    pub fn path(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Path,
            required: true,
            schema,
        }
    }

    /// Declares an optional query parameter.
    #[must_use]
    pub fn query(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            location: ParameterLocation::Query,
            required: false,
            schema,
        }
    }

    /// Marks the parameter as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

mod http_method_serde {
    use http::Method;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(method: &Method, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Method, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.to_ascii_uppercase()
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_contract() -> Contract {
        Contract::builder("users")
            .version("1.0.0")
            .operation(
                Operation::builder("getUser")
                    .method(Method::GET)
                    .path("/api/v1/users/{id}")
                    .parameter(Parameter::path("id", Schema::integer()))
                    .build(),
            )
            .operation(
                Operation::builder("updateUser")
                    .method(Method::PUT)
                    .path("/api/v1/users/{id}")
                    .build(),
            )
            .operation(
                Operation::builder("createUser")
                    .method(Method::POST)
                    .path("/api/v1/users")
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_contract_builder() {
        let contract = users_contract();

        assert_eq!(contract.name(), "users");
        assert_eq!(contract.version(), "1.0.0");
        assert_eq!(contract.operations().len(), 3);
    }

    #[test]
    fn test_get_operation() {
        let contract = users_contract();

        assert!(contract.get_operation("getUser").is_some());
        assert!(contract.get_operation("deleteUser").is_none());
    }

    #[test]
    fn test_resolve_matched() {
        let contract = users_contract();

        let RouteResolution::Matched { index, path_params } =
            contract.resolve(&Method::GET, "/api/v1/users/42")
        else {
            panic!("expected a match");
        };
        assert_eq!(
            contract.operation(index).unwrap().operation_id(),
            "getUser"
        );
        assert_eq!(path_params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_resolve_picks_method() {
        let contract = users_contract();

        let RouteResolution::Matched { index, .. } =
            contract.resolve(&Method::PUT, "/api/v1/users/42")
        else {
            panic!("expected a match");
        };
        assert_eq!(contract.operations()[index].operation_id(), "updateUser");
    }

    #[test]
    fn test_resolve_method_not_allowed() {
        let contract = users_contract();
        assert_eq!(
            contract.resolve(&Method::DELETE, "/api/v1/users/42"),
            RouteResolution::MethodNotAllowed
        );
    }

    #[test]
    fn test_resolve_not_found() {
        let contract = users_contract();

        assert_eq!(
            contract.resolve(&Method::GET, "/api/v1/orders"),
            RouteResolution::NotFound
        );
        assert_eq!(
            contract.resolve(&Method::GET, "/api/v1/users/42/extra"),
            RouteResolution::NotFound
        );
    }

    #[test]
    fn test_trailing_slash_is_ignored() {
        let contract = users_contract();
        assert!(matches!(
            contract.resolve(&Method::POST, "/api/v1/users/"),
            RouteResolution::Matched { .. }
        ));
    }

    #[test]
    fn test_requires_auth_defaults_to_false() {
        let open = Operation::builder("a").build();
        let gated = Operation::builder("b").authenticated().build();

        assert!(!open.requires_auth());
        assert!(gated.requires_auth());
    }

    #[test]
    fn test_response_schema_lookup() {
        let op = Operation::builder("hello")
            .response(200, Schema::object(vec![]))
            .build();

        assert!(op.response_schema(200).is_some());
        assert!(op.response_schema(404).is_none());
    }

    #[test]
    fn test_parameters_in() {
        let op = Operation::builder("greet")
            .parameter(Parameter::query("name", Schema::string()))
            .parameter(Parameter::path("id", Schema::integer()))
            .build();

        let query: Vec<_> = op
            .parameters_in(ParameterLocation::Query)
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(query, vec!["name"]);
        assert!(op.parameters_in(ParameterLocation::Path).all(|p| p.required));
    }

    #[test]
    fn test_from_json() {
        let document = json!({
            "name": "catalog",
            "version": "2.0.0",
            "operations": [{
                "operation_id": "getProduct",
                "method": "get",
                "path": "/products/{id}",
                "parameters": [
                    {"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}
                ],
                "responses": {
                    "200": {"type": "object"},
                    "404": {"type": "object"}
                },
                "requires_auth": true
            }]
        });

        let contract = Contract::from_json(&document.to_string()).unwrap();
        let op = contract.get_operation("getProduct").unwrap();

        assert_eq!(*op.method(), Method::GET);
        assert!(op.requires_auth());
        assert_eq!(op.responses().len(), 2);
        assert!(matches!(
            contract.resolve(&Method::GET, "/products/3"),
            RouteResolution::Matched { .. }
        ));
    }

    #[test]
    fn test_from_json_rejects_duplicate_ids() {
        let document = json!({
            "name": "dup",
            "operations": [
                {"operation_id": "a", "method": "GET", "path": "/a"},
                {"operation_id": "a", "method": "GET", "path": "/b"}
            ]
        });

        let err = Contract::from_json(&document.to_string()).unwrap_err();
        assert!(matches!(err, ContractLoadError::DuplicateOperation(id) if id == "a"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Contract::from_json("not json"),
            Err(ContractLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_serialized_contract_round_trips() {
        let contract = users_contract();
        let json = serde_json::to_string(&contract).unwrap();
        let back = Contract::from_json(&json).unwrap();

        assert_eq!(back.operations().len(), 3);
        assert!(matches!(
            back.resolve(&Method::GET, "/api/v1/users/1"),
            RouteResolution::Matched { .. }
        ));
    }
}
