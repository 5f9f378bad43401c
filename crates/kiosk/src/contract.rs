//! The built-in API contract.
//!
//! Every route the service answers is declared here with its parameters,
//! request body and response bodies. Handlers are bound to these operations by
//! id, see [`crate::handlers`].

use http::Method;
use kiosk_core::{Contract, Operation, Parameter, Schema};

use crate::models::Category;

/// Longest accepted rating comment, in characters.
pub const MAX_COMMENT_LEN: usize = 200;

/// Path prefix of the versioned API.
pub const API_PREFIX: &str = "/api/v1";

/// Operation ids.
pub mod ops {
    /// `GET /hello`
    pub const HELLO: &str = "hello";
    /// `GET /goodbye`
    pub const GOODBYE: &str = "goodbye";
    /// `GET /greet`
    pub const GREET: &str = "greet";
    /// `GET /api/v1/hello`
    pub const HELLO_V1: &str = "helloV1";
    /// `GET /api/v1/goodbye`
    pub const GOODBYE_V1: &str = "goodbyeV1";
    /// `GET /api/v1/greet`
    pub const GREET_V1: &str = "greetV1";
    /// `POST /auth/login`
    pub const LOGIN: &str = "login";
    /// `POST /api/v1/users`
    pub const CREATE_USER: &str = "createUser";
    /// `GET /api/v1/users/{id}`
    pub const GET_USER: &str = "getUser";
    /// `PUT /api/v1/users/{id}`
    pub const UPDATE_USER: &str = "updateUser";
    /// `POST /api/v1/products`
    pub const CREATE_PRODUCT: &str = "createProduct";
    /// `GET /api/v1/products`
    pub const LIST_PRODUCTS: &str = "listProducts";
    /// `GET /api/v1/products/{id}`
    pub const GET_PRODUCT: &str = "getProduct";
    /// `PUT /api/v1/products/{id}`
    pub const UPDATE_PRODUCT: &str = "updateProduct";
}

/// Builds the service contract.
#[must_use]
pub fn api() -> Contract {
    Contract::builder("Kiosk API")
        .version(env!("CARGO_PKG_VERSION"))
        .description("Greetings, users and products over in-memory data.")
        .operations(greetings())
        .operation(login())
        .operations(users())
        .operations(products())
        .build()
}

// =============================================================================
// Schemas
// =============================================================================

fn message() -> Schema {
    Schema::object(vec![("message", Schema::string().required())]).closed()
}

fn message_with_description() -> Schema {
    Schema::object(vec![
        ("message", Schema::string().required()),
        ("description", Schema::string().required()),
    ])
    .closed()
}

fn not_found() -> Schema {
    Schema::object(vec![("error", Schema::string().required())]).closed()
}

fn id_param() -> Parameter {
    Parameter::path("id", Schema::integer().minimum_int(1))
}

fn user() -> Schema {
    Schema::object(vec![
        ("id", Schema::integer().required()),
        ("name", Schema::string().required()),
        ("email", Schema::string().email().required()),
    ])
    .closed()
}

fn category() -> Schema {
    Schema::string_enum(Category::ALL.map(Category::as_str))
}

fn price() -> Schema {
    Schema::number().minimum(0.0).multiple_of(0.01)
}

fn tags() -> Schema {
    Schema::array(Schema::string().required()).min_items(1)
}

fn ratings() -> Schema {
    let rating = Schema::object(vec![
        (
            "score",
            Schema::number().minimum(1.0).maximum(5.0).required(),
        ),
        ("comment", Schema::string().max_length(MAX_COMMENT_LEN)),
    ])
    .closed();
    Schema::array(rating.required())
}

/// Product fields, with the id when describing a stored product.
fn product_fields(with_id: bool, all_optional: bool) -> Vec<(&'static str, Schema)> {
    let mandatory = |schema: Schema| if all_optional { schema } else { schema.required() };

    let mut fields = Vec::new();
    if with_id {
        fields.push(("id", Schema::integer().required()));
    }
    fields.extend([
        ("name", mandatory(Schema::string().min_length(1))),
        ("price", mandatory(price())),
        ("category", mandatory(category())),
        ("description", Schema::string()),
        ("tags", tags()),
        ("ratings", ratings()),
    ]);
    fields
}

fn product() -> Schema {
    Schema::object(product_fields(true, false)).closed()
}

// =============================================================================
// Operations
// =============================================================================

fn greetings() -> Vec<Operation> {
    let mut operations = Vec::new();

    for (prefix, suffix, tag) in [("", "", "greetings"), (API_PREFIX, "V1", "greetings-v1")] {
        let hello = Operation::builder(format!("hello{suffix}"))
            .method(Method::GET)
            .path(format!("{prefix}/hello"))
            .tag(tag)
            .response(200, message());
        // Only the versioned hello greets the caller by name.
        let hello = if prefix.is_empty() {
            hello.description("Returns a fixed greeting.")
        } else {
            hello
                .description("Greets the authenticated user.")
                .authenticated()
        };
        operations.push(hello.build());

        operations.push(
            Operation::builder(format!("goodbye{suffix}"))
                .method(Method::GET)
                .path(format!("{prefix}/goodbye"))
                .tag(tag)
                .description("Returns a farewell message.")
                .response(200, message_with_description())
                .build(),
        );

        operations.push(
            Operation::builder(format!("greet{suffix}"))
                .method(Method::GET)
                .path(format!("{prefix}/greet"))
                .tag(tag)
                .description("Returns a personalized greeting.")
                .parameter(Parameter::query("name", Schema::string().max_length(100)))
                .response(200, message_with_description())
                .build(),
        );
    }

    operations
}

fn login() -> Operation {
    Operation::builder(ops::LOGIN)
        .method(Method::POST)
        .path("/auth/login")
        .tag("auth")
        .description("Exchanges credentials for a bearer token valid for one hour.")
        .request_schema(
            Schema::object(vec![
                ("email", Schema::string().email().required()),
                ("password", Schema::string().min_length(1).required()),
            ])
            .closed()
            .required(),
        )
        .response(
            200,
            Schema::object(vec![("token", Schema::string().min_length(1).required())]).closed(),
        )
        .build()
}

fn users() -> Vec<Operation> {
    vec![
        Operation::builder(ops::CREATE_USER)
            .method(Method::POST)
            .path(format!("{API_PREFIX}/users"))
            .tag("users")
            .description("Registers a user.")
            .request_schema(
                Schema::object(vec![
                    ("name", Schema::string().min_length(1).required()),
                    ("email", Schema::string().email().required()),
                    ("password", Schema::string().min_length(6).required()),
                ])
                .closed()
                .required(),
            )
            .response(201, user())
            .build(),
        Operation::builder(ops::GET_USER)
            .method(Method::GET)
            .path(format!("{API_PREFIX}/users/{{id}}"))
            .tag("users")
            .description("Fetches a user by id.")
            .parameter(id_param())
            .response(200, user())
            .response(404, not_found())
            .build(),
        Operation::builder(ops::UPDATE_USER)
            .method(Method::PUT)
            .path(format!("{API_PREFIX}/users/{{id}}"))
            .tag("users")
            .description("Updates the given fields of a user.")
            .parameter(id_param())
            .request_schema(
                Schema::object(vec![
                    ("name", Schema::string().min_length(1)),
                    ("email", Schema::string().email()),
                    ("password", Schema::string().min_length(6)),
                ])
                .closed()
                .required(),
            )
            .response(200, user())
            .response(404, not_found())
            .build(),
    ]
}

fn products() -> Vec<Operation> {
    vec![
        Operation::builder(ops::CREATE_PRODUCT)
            .method(Method::POST)
            .path(format!("{API_PREFIX}/products"))
            .tag("products")
            .description("Adds a product to the catalogue.")
            .request_schema(
                Schema::object(product_fields(false, false))
                    .closed()
                    .required(),
            )
            .response(201, product())
            .build(),
        Operation::builder(ops::LIST_PRODUCTS)
            .method(Method::GET)
            .path(format!("{API_PREFIX}/products"))
            .tag("products")
            .description("Lists every product.")
            .response(200, Schema::array(product().required()))
            .build(),
        Operation::builder(ops::GET_PRODUCT)
            .method(Method::GET)
            .path(format!("{API_PREFIX}/products/{{id}}"))
            .tag("products")
            .description("Fetches a product by id.")
            .parameter(id_param())
            .response(200, product())
            .response(404, not_found())
            .build(),
        Operation::builder(ops::UPDATE_PRODUCT)
            .method(Method::PUT)
            .path(format!("{API_PREFIX}/products/{{id}}"))
            .tag("products")
            .description("Updates the given fields of a product.")
            .parameter(id_param())
            .request_schema(
                Schema::object(product_fields(false, true))
                    .closed()
                    .required(),
            )
            .response(200, product())
            .response(404, not_found())
            .build(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_core::RouteResolution;
    use serde_json::json;

    #[test]
    fn test_operation_ids_are_unique() {
        let contract = api();
        let rebuilt = Contract::builder("check")
            .operations(contract.operations().to_vec())
            .try_build();
        assert!(rebuilt.is_ok());
        assert_eq!(contract.operations().len(), 14);
    }

    #[test]
    fn test_operation_ids_match_constants() {
        let contract = api();
        for id in [
            ops::HELLO,
            ops::GOODBYE,
            ops::GREET,
            ops::HELLO_V1,
            ops::GOODBYE_V1,
            ops::GREET_V1,
            ops::LOGIN,
            ops::CREATE_USER,
            ops::GET_USER,
            ops::UPDATE_USER,
            ops::CREATE_PRODUCT,
            ops::LIST_PRODUCTS,
            ops::GET_PRODUCT,
            ops::UPDATE_PRODUCT,
        ] {
            assert!(contract.get_operation(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn test_only_versioned_hello_is_protected() {
        let api = api();
        let protected: Vec<&str> = api
            .operations()
            .iter()
            .filter(|op| op.requires_auth())
            .map(Operation::operation_id)
            .collect();
        assert_eq!(protected, vec![ops::HELLO_V1]);
    }

    #[test]
    fn test_routes_resolve() {
        let contract = api();
        assert!(matches!(
            contract.resolve(&Method::GET, "/api/v1/users/7"),
            RouteResolution::Matched { .. }
        ));
        assert_eq!(
            contract.resolve(&Method::DELETE, "/api/v1/products/7"),
            RouteResolution::MethodNotAllowed
        );
        assert_eq!(
            contract.resolve(&Method::GET, "/api/v2/products"),
            RouteResolution::NotFound
        );
    }

    #[test]
    fn test_product_body_constraints() {
        let schema = api()
            .get_operation(ops::CREATE_PRODUCT)
            .and_then(Operation::request_schema)
            .cloned()
            .unwrap();

        let valid = json!({
            "name": "Lamp",
            "price": 19.99,
            "category": "home",
            "tags": ["light"],
            "ratings": [{"score": 4.5, "comment": "Nice"}]
        });
        assert!(schema.validate(&valid).is_ok());

        for invalid in [
            json!({"name": "Lamp", "price": 19.999, "category": "home"}),
            json!({"name": "Lamp", "price": 19.99, "category": "toys"}),
            json!({"name": "Lamp", "price": -1, "category": "home"}),
            json!({"name": "Lamp", "price": 1, "category": "home", "tags": []}),
            json!({"name": "Lamp", "price": 1, "category": "home", "tags": [3]}),
            json!({"name": "Lamp", "price": 1, "category": "home", "ratings": [{"score": 6}]}),
            json!({"name": "Lamp", "price": 1, "category": "home",
                   "ratings": [{"score": 3, "comment": "x".repeat(MAX_COMMENT_LEN + 1)}]}),
            json!({"name": "Lamp", "price": 1, "category": "home", "colour": "red"}),
        ] {
            assert!(schema.validate(&invalid).is_err(), "accepted {invalid}");
        }
    }

    #[test]
    fn test_contract_survives_json_round_trip() {
        let contract = api();
        let document = serde_json::to_string(&contract).unwrap();
        let reloaded = Contract::from_json(&document).unwrap();

        assert_eq!(reloaded.operations().len(), contract.operations().len());
        assert!(reloaded.get_operation(ops::HELLO_V1).unwrap().requires_auth());
        assert!(matches!(
            reloaded.resolve(&Method::PUT, "/api/v1/products/3"),
            RouteResolution::Matched { .. }
        ));
    }
}
