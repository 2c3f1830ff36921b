//! API Gateway control-plane client
//!
//! A thin typed client over the service's REST surface, one signed request
//! per operation and no retries. Collection endpoints paginate with a
//! `position` cursor which is followed to exhaustion.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::sign;

const SERVICE: &str = "apigateway";
const PAGE_LIMIT: u32 = 500;

/// A gateway definition as the service reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApi {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Epoch seconds, possibly fractional
    #[serde(default)]
    pub created_date: Option<f64>,
}

impl RestApi {
    /// Creation time in RFC 3339, or a dash when the service omitted it.
    pub fn created_at(&self) -> String {
        self.created_date
            .and_then(|secs| {
                DateTime::<Utc>::from_timestamp(
                    secs.trunc() as i64,
                    (secs.fract() * 1e9) as u32,
                )
            })
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// A child resource of a gateway definition
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub path: String,
}

/// A method integration; only the backend URI matters here
#[derive(Debug, Clone, Deserialize)]
pub struct Integration {
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    pub id: String,
}

/// One entry of an `UpdateIntegration` patch
#[derive(Debug, Clone, Serialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: String,
}

impl PatchOperation {
    pub fn replace(path: &str, value: &str) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.to_string(),
            value: value.to_string(),
        }
    }
}

/// Paginated collection envelope: items under `item`, cursor under `position`.
/// The explicit default path keeps the derive from bounding `T: Default`.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    item: Vec<T>,
    #[serde(default)]
    position: Option<String>,
}

/// Service error body
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GatewayClient {
    http: reqwest::Client,
    credentials: Credentials,
    region: String,
    endpoint: Url,
}

impl GatewayClient {
    /// Client against the real regional control plane.
    pub fn new(credentials: Credentials, region: &str) -> Result<Self> {
        let endpoint = format!("https://apigateway.{}.amazonaws.com", region);
        let endpoint = Url::parse(&endpoint).map_err(|source| Error::InvalidUrl {
            url: endpoint.clone(),
            source,
        })?;
        Ok(Self::with_endpoint(credentials, region, endpoint))
    }

    /// Client against an arbitrary base endpoint; used by the tests to point
    /// at an in-process mock control plane.
    pub fn with_endpoint(credentials: Credentials, region: &str, endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            region: region.to_string(),
            endpoint,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// All gateway definitions owned by the account, across pages.
    pub async fn get_rest_apis(&self) -> Result<Vec<RestApi>> {
        let mut apis = Vec::new();
        let mut position: Option<String> = None;
        loop {
            let url = self.paged_url("/restapis", position.as_deref())?;
            let page: Page<RestApi> = self.send_url(Method::GET, url, None).await?;
            apis.extend(page.item);
            match page.position {
                Some(pos) if !pos.is_empty() => position = Some(pos),
                _ => break,
            }
        }
        debug!(count = apis.len(), "fetched gateway definitions");
        Ok(apis)
    }

    /// Import a definition document as a new REGIONAL gateway.
    pub async fn import_rest_api(&self, document: &Value) -> Result<RestApi> {
        self.send(
            Method::POST,
            "/restapis?mode=import&endpointConfigurationTypes=REGIONAL",
            Some(document.clone()),
        )
        .await
    }

    /// Publish a gateway definition to a stage.
    pub async fn create_deployment(
        &self,
        api_id: &str,
        stage_name: &str,
        stage_description: &str,
        description: &str,
    ) -> Result<Deployment> {
        let body = json!({
            "stageName": stage_name,
            "stageDescription": stage_description,
            "description": description,
        });
        self.send(
            Method::POST,
            &format!("/restapis/{}/deployments", api_id),
            Some(body),
        )
        .await
    }

    /// Child resources of a gateway definition, across pages.
    pub async fn get_resources(&self, api_id: &str) -> Result<Vec<Resource>> {
        let mut resources = Vec::new();
        let mut position: Option<String> = None;
        loop {
            let url = self.paged_url(&format!("/restapis/{}/resources", api_id), position.as_deref())?;
            let page: Page<Resource> = self.send_url(Method::GET, url, None).await?;
            resources.extend(page.item);
            match page.position {
                Some(pos) if !pos.is_empty() => position = Some(pos),
                _ => break,
            }
        }
        Ok(resources)
    }

    /// The ANY-method integration of a resource.
    pub async fn get_integration(&self, api_id: &str, resource_id: &str) -> Result<Integration> {
        self.send(
            Method::GET,
            &format!(
                "/restapis/{}/resources/{}/methods/ANY/integration",
                api_id, resource_id
            ),
            None,
        )
        .await
    }

    /// Patch the ANY-method integration of a resource.
    pub async fn update_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        operations: &[PatchOperation],
    ) -> Result<Integration> {
        let body = json!({ "patchOperations": operations });
        self.send(
            Method::PATCH,
            &format!(
                "/restapis/{}/resources/{}/methods/ANY/integration",
                api_id, resource_id
            ),
            Some(body),
        )
        .await
    }

    /// Delete a gateway definition.
    pub async fn delete_rest_api(&self, api_id: &str) -> Result<()> {
        let url = self.url_for(&format!("/restapis/{}", api_id))?;
        let response = self.signed(Method::DELETE, url, None).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(decode_service_error(response).await)
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = self.url_for(path_and_query)?;
        self.send_url(method, url, body).await
    }

    async fn send_url<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<T> {
        let response = self.signed(method, url, body).await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(decode_service_error(response).await)
        }
    }

    /// Collection URL with the page limit and an optional opaque cursor.
    /// The cursor is percent-encoded; the service hands back tokens that can
    /// contain query metacharacters.
    fn paged_url(&self, path: &str, position: Option<&str>) -> Result<Url> {
        let mut url = self.url_for(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &PAGE_LIMIT.to_string());
            if let Some(pos) = position {
                pairs.append_pair("position", pos);
            }
        }
        Ok(url)
    }

    async fn signed(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        let payload = match &body {
            Some(value) => serde_json::to_vec(value).unwrap_or_default(),
            None => Vec::new(),
        };
        let content_type = body.as_ref().map(|_| "application/json");

        let signature_headers = sign::sign(
            method.as_str(),
            &url,
            content_type,
            &payload,
            &self.credentials,
            &self.region,
            SERVICE,
            Utc::now(),
        );

        let mut request = self
            .http
            .request(method, url)
            .header("accept", "application/json");
        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        for (name, value) in &signature_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !payload.is_empty() {
            request = request.body(payload);
        }

        Ok(request.send().await?)
    }

    fn url_for(&self, path_and_query: &str) -> Result<Url> {
        self.endpoint
            .join(path_and_query)
            .map_err(|source| Error::InvalidUrl {
                url: format!("{}{}", self.endpoint, path_and_query),
                source,
            })
    }
}

async fn decode_service_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let code = response
        .headers()
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(':').next().unwrap_or(v).to_string())
        .unwrap_or_else(|| "UnknownError".to_string());
    let message = match response.json::<ServiceErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => String::new(),
    };
    Error::Service {
        status,
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserialization() {
        let page: Page<RestApi> = serde_json::from_str(
            r#"{"item":[{"id":"abc123","name":"fireprox_api.example.com","createdDate":1717236600.5}],"position":"next"}"#,
        )
        .unwrap();
        assert_eq!(page.item.len(), 1);
        assert_eq!(page.item[0].id, "abc123");
        assert_eq!(page.position.as_deref(), Some("next"));
    }

    #[test]
    fn test_empty_page_defaults() {
        let page: Page<Resource> = serde_json::from_str("{}").unwrap();
        assert!(page.item.is_empty());
        assert!(page.position.is_none());

        // Item types carry no Default impl; the envelope must still decode
        let page: Page<RestApi> = serde_json::from_str(r#"{"position":null}"#).unwrap();
        assert!(page.item.is_empty());
    }

    #[test]
    fn test_created_at_formatting() {
        let api = RestApi {
            id: "abc123".to_string(),
            name: String::new(),
            created_date: Some(1717236600.0),
        };
        assert_eq!(api.created_at(), "2024-06-01T10:10:00+00:00");

        let missing = RestApi {
            id: "abc123".to_string(),
            name: String::new(),
            created_date: None,
        };
        assert_eq!(missing.created_at(), "-");
    }

    #[test]
    fn test_patch_operation_wire_shape() {
        let op = PatchOperation::replace("/uri", "https://backend.example.com/{proxy}");
        let wire = serde_json::to_value(&op).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "op": "replace",
                "path": "/uri",
                "value": "https://backend.example.com/{proxy}"
            })
        );
    }

    #[test]
    fn test_paged_url_encodes_opaque_cursor() {
        let creds = Credentials::new("k", "s", None);
        let client = GatewayClient::new(creds, "us-east-1").unwrap();

        let url = client.paged_url("/restapis", None).unwrap();
        assert_eq!(url.query(), Some("limit=500"));

        let url = client
            .paged_url("/restapis", Some("tok&en=+value"))
            .unwrap();
        assert_eq!(url.query(), Some("limit=500&position=tok%26en%3D%2Bvalue"));
    }

    #[test]
    fn test_regional_endpoint_shape() {
        let creds = Credentials::new("k", "s", None);
        let client = GatewayClient::new(creds, "eu-west-1").unwrap();
        let url = client.url_for("/restapis").unwrap();
        assert_eq!(
            url.as_str(),
            "https://apigateway.eu-west-1.amazonaws.com/restapis"
        );
    }
}
