//! Import-document construction
//!
//! The gateway definition is imported from a Swagger 2.0 document built as a
//! pure function of (timestamp, backend URL). Two routes are declared, `/`
//! and the wildcard `/{proxy+}`, both proxying to the backend with the path
//! suffix preserved. The original client IP and trace id are forwarded under
//! renamed header keys so the gateway's own injected headers don't clobber
//! them.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use url::Url;

use crate::error::{Error, Result};

/// Title prefix for every endpoint this tool creates
pub const TITLE_PREFIX: &str = "fireprox_";

/// Hardcoded deployment identity; the stage segment of every public URL
pub const STAGE_NAME: &str = "fireprox";
pub const STAGE_DESCRIPTION: &str = "FireProx Prod";
pub const DEPLOYMENT_DESCRIPTION: &str = "FireProx Production Deployment";

/// Parse and validate a backend URL from operator input.
pub fn parse_target(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|source| Error::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

/// Display name for an endpoint fronting `target`.
pub fn title_for(target: &Url) -> String {
    format!("{}{}", TITLE_PREFIX, target.host_str().unwrap_or_default())
}

/// Build the import document for `target` at `now`.
pub fn import_document(now: DateTime<Utc>, target: &Url) -> Value {
    let version = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let base = target.as_str().trim_end_matches('/');

    json!({
        "swagger": "2.0",
        "info": {
            "version": version,
            "title": title_for(target),
        },
        "basePath": "/",
        "schemes": ["https"],
        "paths": {
            "/": {
                "get": {
                    "parameters": method_parameters(),
                    "responses": {},
                    "x-amazon-apigateway-integration": integration(&format!("{}/", base)),
                }
            },
            "/{proxy+}": {
                "x-amazon-apigateway-any-method": {
                    "produces": ["application/json"],
                    "parameters": method_parameters(),
                    "responses": {},
                    "x-amazon-apigateway-integration": integration(&format!("{}/{{proxy}}", base)),
                }
            }
        }
    })
}

fn method_parameters() -> Value {
    json!([
        {
            "name": "proxy",
            "in": "path",
            "required": true,
            "type": "string"
        },
        {
            "name": "X-My-X-Forwarded-For",
            "in": "header",
            "required": false,
            "type": "string"
        },
        {
            "name": "X-My-X-Amzn-Trace-Id",
            "in": "header",
            "required": false,
            "type": "string"
        }
    ])
}

fn integration(uri: &str) -> Value {
    json!({
        "uri": uri,
        "responses": {
            "default": { "statusCode": "200" }
        },
        "requestParameters": {
            "integration.request.path.proxy": "method.request.path.proxy",
            "integration.request.header.X-Forwarded-For": "method.request.header.X-My-X-Forwarded-For",
            "integration.request.header.X-Amzn-Trace-Id": "method.request.header.X-My-X-Amzn-Trace-Id"
        },
        "passthroughBehavior": "when_no_match",
        "httpMethod": "ANY",
        "cacheNamespace": "irx7tm",
        "cacheKeyParameters": ["method.request.path.proxy"],
        "type": "http_proxy"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc_for(url: &str) -> Value {
        let target = parse_target(url).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap();
        import_document(now, &target)
    }

    fn integration_uri(doc: &Value, path: &str, method: &str) -> String {
        doc["paths"][path][method]["x-amazon-apigateway-integration"]["uri"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_exactly_two_paths() {
        let doc = doc_for("https://api.example.com");
        let paths = doc["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains_key("/"));
        assert!(paths.contains_key("/{proxy+}"));
    }

    #[test]
    fn test_integration_uris_preserve_suffix_substitution() {
        let doc = doc_for("https://api.example.com");
        assert_eq!(
            integration_uri(&doc, "/", "get"),
            "https://api.example.com/"
        );
        assert_eq!(
            integration_uri(&doc, "/{proxy+}", "x-amazon-apigateway-any-method"),
            "https://api.example.com/{proxy}"
        );
    }

    #[test]
    fn test_trailing_slash_not_doubled() {
        let doc = doc_for("https://api.example.com/");
        assert_eq!(
            integration_uri(&doc, "/", "get"),
            "https://api.example.com/"
        );
        assert_eq!(
            integration_uri(&doc, "/{proxy+}", "x-amazon-apigateway-any-method"),
            "https://api.example.com/{proxy}"
        );
    }

    #[test]
    fn test_renamed_header_mappings_on_both_routes() {
        let doc = doc_for("https://api.example.com");
        for (path, method) in [
            ("/", "get"),
            ("/{proxy+}", "x-amazon-apigateway-any-method"),
        ] {
            let params =
                &doc["paths"][path][method]["x-amazon-apigateway-integration"]["requestParameters"];
            assert_eq!(
                params["integration.request.header.X-Forwarded-For"],
                "method.request.header.X-My-X-Forwarded-For"
            );
            assert_eq!(
                params["integration.request.header.X-Amzn-Trace-Id"],
                "method.request.header.X-My-X-Amzn-Trace-Id"
            );
            assert_eq!(
                params["integration.request.path.proxy"],
                "method.request.path.proxy"
            );
        }
    }

    #[test]
    fn test_title_and_version() {
        let doc = doc_for("https://api.example.com:8443/ignored/path");
        assert_eq!(doc["info"]["title"], "fireprox_api.example.com");
        assert_eq!(doc["info"]["version"], "2024-06-01 10:30:00");
    }

    #[test]
    fn test_regional_scheme_and_passthrough() {
        let doc = doc_for("http://10.0.0.5:8080");
        assert_eq!(doc["schemes"], json!(["https"]));
        let integ = &doc["paths"]["/{proxy+}"]["x-amazon-apigateway-any-method"]
            ["x-amazon-apigateway-integration"];
        assert_eq!(integ["passthroughBehavior"], "when_no_match");
        assert_eq!(integ["type"], "http_proxy");
        assert_eq!(integ["httpMethod"], "ANY");
    }

    #[test]
    fn test_unparseable_url_rejected() {
        assert!(parse_target("not a url").is_err());
    }
}
