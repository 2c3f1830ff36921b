//! Endpoint lifecycle management
//!
//! `GatewayProxyManager` owns the resolved client session and drives the
//! whole lifecycle: create, list, update, delete, and the interrupt-time
//! cleanup sweep. Operator-facing output goes to stdout one line per
//! endpoint; diagnostics go through tracing.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::client::{GatewayClient, PatchOperation, RestApi};
use crate::config::{self, ProxyOptions, RegionChoice, DEFAULT_REGION};
use crate::credentials;
use crate::template::{self, STAGE_NAME};

/// Path pattern of the catch-all route every endpoint carries
pub const WILDCARD_ROUTE: &str = "/{proxy+}";

/// Placeholder the gateway substitutes with the matched path suffix
const PROXY_PLACEHOLDER: &str = "{proxy}";

pub struct GatewayProxyManager {
    client: GatewayClient,
    region: String,
}

impl GatewayProxyManager {
    /// Resolve region and credentials and bind a client session.
    ///
    /// An invalid explicit region or unresolvable credentials is a fatal
    /// configuration error; the caller terminates the process on it.
    pub fn new(options: &ProxyOptions) -> crate::error::Result<Self> {
        let choice = config::resolve_region(&options.region, &options.profile)?;
        let (creds, profile_region) = credentials::resolve(
            &options.access_key,
            &options.secret_access_key,
            &options.session_token,
            &options.profile,
        )?;

        let region = match choice {
            RegionChoice::Fixed(region) => region,
            RegionChoice::FromProfile(_) => {
                profile_region.unwrap_or_else(|| DEFAULT_REGION.to_string())
            }
        };

        info!(region = %region, "gateway session initialized");
        let client = GatewayClient::new(creds, &region)?;
        Ok(Self { client, region })
    }

    /// Manager over an existing client; the tests use this to target an
    /// in-process control plane.
    pub fn from_client(client: GatewayClient) -> Self {
        let region = client.region().to_string();
        Self { client, region }
    }

    /// Public invocation URL for an endpoint in this session's region.
    pub fn public_url(&self, api_id: &str) -> String {
        format!(
            "https://{}.execute-api.{}.amazonaws.com/{}/",
            api_id, self.region, STAGE_NAME
        )
    }

    /// List every endpoint, printing one line per endpoint and returning the
    /// raw records. Per-endpoint target resolution is best-effort: a missing
    /// wildcard route reports an empty target, and a failed integration
    /// fetch is logged without aborting the listing.
    pub async fn list(&self) -> Result<Vec<RestApi>> {
        let apis = self
            .client
            .get_rest_apis()
            .await
            .context("failed to list gateway endpoints")?;

        for api in &apis {
            let target = match self.resolved_target(&api.id).await {
                Ok(target) => target,
                Err(e) => {
                    warn!(api_id = %api.id, error = %e, "could not resolve integration target");
                    String::new()
                }
            };
            println!(
                "[{}] ({}) {}: {} => {}",
                api.created_at(),
                api.id,
                api.name,
                self.public_url(&api.id),
                target
            );
        }

        Ok(apis)
    }

    /// Create a new endpoint fronting `target_url` and deploy it to the
    /// fixed stage. Returns the new endpoint id and its public URL. Any
    /// failing step aborts the operation; partially-created remote state is
    /// not rolled back.
    pub async fn create(&self, target_url: &str) -> Result<(String, String)> {
        let target = template::parse_target(target_url)?;
        println!("Creating => {}...", target_url);

        let document = template::import_document(Utc::now(), &target);
        let api = self
            .client
            .import_rest_api(&document)
            .await
            .context("failed to import gateway definition")?;

        let deployment = self
            .client
            .create_deployment(
                &api.id,
                STAGE_NAME,
                template::STAGE_DESCRIPTION,
                template::DEPLOYMENT_DESCRIPTION,
            )
            .await
            .context("failed to deploy gateway stage")?;

        let public_url = self.public_url(&api.id);
        info!(
            api_id = %api.id,
            deployment_id = %deployment.id,
            url = %public_url,
            "endpoint created"
        );
        println!(
            "[{}] ({}) {}: {} => {}",
            api.created_at(),
            api.id,
            api.name,
            public_url,
            target_url
        );

        Ok((api.id, public_url))
    }

    /// Repoint an endpoint's wildcard integration at `target_url`.
    ///
    /// Success means the patched integration URI, with the `{proxy}`
    /// placeholder removed, equals `target_url` exactly. A mismatch is a
    /// non-successful update, not an error.
    pub async fn update(&self, api_id: &str, target_url: &str) -> Result<bool> {
        let resource_id = self
            .wildcard_resource_id(api_id)
            .await
            .context("failed to resolve wildcard route")?;

        match &resource_id {
            Some(id) => println!("Found resource {} for {}", id, api_id),
            None => println!("No {} route found for {}", WILDCARD_ROUTE, api_id),
        }
        let resource_id = resource_id.unwrap_or_default();

        let ops = [PatchOperation::replace(
            "/uri",
            &format!("{}/{}", target_url, PROXY_PLACEHOLDER),
        )];
        let integration = self
            .client
            .update_integration(api_id, &resource_id, &ops)
            .await
            .context("failed to patch integration")?;

        info!(api_id = %api_id, "integration updated");
        Ok(update_succeeded(integration.uri.as_deref(), target_url))
    }

    /// Delete an endpoint by exact id match against a fresh listing.
    ///
    /// Returns false, without error, when the id is not present. Returns
    /// true once a matching endpoint was found and a deletion attempted; a
    /// failing delete call is logged but does not flip the outcome.
    pub async fn delete(&self, api_id: &str) -> bool {
        let apis = match self.client.get_rest_apis().await {
            Ok(apis) => apis,
            Err(e) => {
                error!(
                    error = %e,
                    "Error listing APIs, make sure your aws config/account is properly configured with the appropriate permissions."
                );
                return false;
            }
        };

        for api in apis {
            if api.id == api_id {
                if let Err(e) = self.client.delete_rest_api(&api.id).await {
                    error!(api_id = %api.id, error = %e, "failed to delete endpoint");
                }
                return true;
            }
        }
        false
    }

    /// Best-effort teardown of every endpoint. Each deletion failure is
    /// logged and the sweep continues; a listing failure ends the sweep
    /// before it starts.
    pub async fn cleanup_all(&self) {
        println!("\n[+] Cleaning up");
        let apis = match self.client.get_rest_apis().await {
            Ok(apis) => apis,
            Err(e) => {
                error!(
                    error = %e,
                    "Error listing APIs, make sure your aws config/account is properly configured with the appropriate permissions."
                );
                return;
            }
        };

        for api in apis {
            match self.client.delete_rest_api(&api.id).await {
                Ok(()) => info!(api_id = %api.id, "endpoint deleted"),
                Err(e) => error!(api_id = %api.id, error = %e, "failed to delete endpoint"),
            }
        }
    }

    /// Resolve the backend an endpoint currently forwards to, with the
    /// wildcard placeholder stripped back off. No wildcard route means no
    /// integration configured: empty target.
    pub async fn resolved_target(&self, api_id: &str) -> crate::error::Result<String> {
        let resource_id = match self.wildcard_resource_id(api_id).await? {
            Some(id) => id,
            None => return Ok(String::new()),
        };
        let integration = self.client.get_integration(api_id, &resource_id).await?;
        Ok(strip_placeholder(&integration.uri.unwrap_or_default()))
    }

    /// Id of the child resource carrying the wildcard route, if present.
    async fn wildcard_resource_id(&self, api_id: &str) -> crate::error::Result<Option<String>> {
        let resources = self.client.get_resources(api_id).await?;
        Ok(resources
            .into_iter()
            .find(|r| r.path == WILDCARD_ROUTE)
            .map(|r| r.id))
    }
}

/// Remove the wildcard placeholder from an integration URI, recovering the
/// plain backend URL: `https://b/{proxy}` becomes `https://b`.
fn strip_placeholder(uri: &str) -> String {
    let stripped = uri.replace(PROXY_PLACEHOLDER, "");
    match stripped.strip_suffix('/') {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => stripped,
    }
}

/// The update postcondition: patched URI minus the placeholder equals the
/// requested target exactly.
fn update_succeeded(patched_uri: Option<&str>, target_url: &str) -> bool {
    patched_uri
        .map(|uri| strip_placeholder(uri) == target_url)
        .unwrap_or(false)
}
