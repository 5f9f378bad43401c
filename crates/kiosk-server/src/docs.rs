//! Human-readable contract documentation.
//!
//! Served under a fixed prefix that the validation stages exempt:
//!
//! | Path | Content |
//! |---|---|
//! | `<prefix>` or `<prefix>/` | HTML listing of every operation |
//! | `<prefix>/contract.json` | the contract document as JSON |

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use kiosk_core::{Contract, KioskError, KioskResult};
use kiosk_middleware::{Request, Response, ResponseExt};

const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";

/// Pre-rendered documentation for one contract.
#[derive(Debug, Clone)]
pub struct DocsPage {
    prefix: String,
    html: Bytes,
    json: Bytes,
}

impl DocsPage {
    /// Renders documentation for `contract` to be served at `prefix`.
    pub fn new(prefix: impl Into<String>, contract: &Arc<Contract>) -> KioskResult<Self> {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        let json = serde_json::to_vec_pretty(contract.as_ref())?;
        Ok(Self {
            html: Bytes::from(render_html(contract, &prefix)),
            json: Bytes::from(json),
            prefix,
        })
    }

    /// Returns the prefix, without a trailing slash.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Path of the raw contract document.
    #[must_use]
    pub fn contract_path(&self) -> String {
        format!("{}/contract.json", self.prefix)
    }

    /// Serves a request under the prefix.
    pub fn serve(&self, request: &Request) -> KioskResult<Response> {
        let path = request.uri().path();
        let rest = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);

        let (content_type, body) = match rest {
            "" | "/" => (HTML, self.html.clone()),
            "/contract.json" => (JSON, self.json.clone()),
            _ => return Err(KioskError::not_found("documentation page not found")),
        };

        if request.method() != Method::GET && request.method() != Method::HEAD {
            return Err(KioskError::method_not_allowed());
        }

        Ok(Response::with_content_type(StatusCode::OK, content_type, body))
    }
}

fn render_html(contract: &Contract, prefix: &str) -> String {
    let mut rows = String::new();
    for op in contract.operations() {
        let auth = if op.requires_auth() { "bearer" } else { "" };
        let statuses: Vec<String> = op.responses().keys().map(u16::to_string).collect();
        rows.push_str(&format!(
            "      <tr><td><code>{method}</code></td><td><code>{path}</code></td><td>{id}</td><td>{auth}</td><td>{statuses}</td><td>{description}</td></tr>\n",
            method = op.method(),
            path = html_escape(op.path()),
            id = html_escape(op.operation_id()),
            statuses = statuses.join(", "),
            description = html_escape(op.description().unwrap_or_default()),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title} {version}</title>
    <style>
        body {{ font-family: sans-serif; margin: 2rem; }}
        table {{ border-collapse: collapse; }}
        td, th {{ border: 1px solid #ddd; padding: 0.4rem 0.8rem; text-align: left; }}
    </style>
</head>
<body>
    <h1>{title} <small>{version}</small></h1>
    <p>{description}</p>
    <p>Machine-readable contract: <a href="{prefix}/contract.json">{prefix}/contract.json</a></p>
    <table>
      <tr><th>Method</th><th>Path</th><th>Operation</th><th>Auth</th><th>Responses</th><th>Description</th></tr>
{rows}    </table>
</body>
</html>
"#,
        title = html_escape(contract.name()),
        version = html_escape(contract.version()),
        description = html_escape(contract.description().unwrap_or_default()),
        prefix = html_escape(prefix),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use kiosk_core::contract::Operation;

    fn docs() -> DocsPage {
        let contract = Arc::new(
            Contract::builder("Demo <API>")
                .version("1.2.3")
                .operation(
                    Operation::builder("hello")
                        .method(Method::GET)
                        .path("/hello")
                        .description("Says hello")
                        .authenticated()
                        .build(),
                )
                .build(),
        );
        DocsPage::new("/docs/", &contract).unwrap()
    }

    fn get(path: &str) -> Request {
        http::Request::builder()
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn test_prefix_is_normalised() {
        let docs = docs();
        assert_eq!(docs.prefix(), "/docs");
        assert_eq!(docs.contract_path(), "/docs/contract.json");
    }

    #[test]
    fn test_serves_html_index() {
        let docs = docs();
        for path in ["/docs", "/docs/"] {
            let response = docs.serve(&get(path)).unwrap();
            assert_eq!(response.headers()[CONTENT_TYPE], HTML);

            let html = String::from_utf8(response.body().to_vec()).unwrap();
            assert!(html.contains("Demo &lt;API&gt;"));
            assert!(html.contains("<code>/hello</code>"));
            assert!(html.contains("bearer"));
        }
    }

    #[test]
    fn test_serves_contract_json() {
        let response = docs().serve(&get("/docs/contract.json")).unwrap();
        let document = std::str::from_utf8(response.body()).unwrap();
        let contract = Contract::from_json(document).unwrap();

        assert_eq!(contract.version(), "1.2.3");
        assert!(contract.get_operation("hello").is_some());
    }

    #[test]
    fn test_unknown_docs_path_is_404() {
        let err = docs().serve(&get("/docs/nope")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(matches!(err, KioskError::NotFound { .. }));
    }

    #[test]
    fn test_post_is_405() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/docs")
            .body(Bytes::new())
            .unwrap();
        let err = docs().serve(&request).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&"), "&lt;a href=&quot;x&quot;&gt;&amp;");
    }
}
