//! Runtime options and region resolution
//!
//! Options are built once from the CLI and are immutable afterwards, apart
//! from region resolution: an empty region either falls back to the default
//! or is supplied by the named profile's own configuration.

use clap::ValueEnum;

use crate::error::{Error, Result};

/// Default region when neither `--region` nor a profile supplies one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Regions where API Gateway endpoints can be provisioned.
/// An explicit `--region` outside this table is a fatal configuration error.
pub const VALID_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "sa-east-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
];

/// Operation selected with `--command`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Command {
    List,
    Create,
    Delete,
    Update,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::List => write!(f, "list"),
            Command::Create => write!(f, "create"),
            Command::Delete => write!(f, "delete"),
            Command::Update => write!(f, "update"),
        }
    }
}

/// Everything the manager needs, resolved from the CLI at startup
#[derive(Debug, Clone, Default)]
pub struct ProxyOptions {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub profile: String,
    pub region: String,
    pub api_id: String,
    pub url: String,
}

/// Outcome of applying the region policy to the raw options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionChoice {
    /// Use this region (explicit and valid, or the hardcoded default)
    Fixed(String),
    /// No explicit region; the named profile's configuration decides
    FromProfile(String),
}

/// Apply the region resolution policy.
///
/// Explicit region wins if it passes the validity table; an invalid explicit
/// region is fatal. With no region and no profile the default applies. With
/// no region but a profile, the profile's own region is left to decide.
pub fn resolve_region(region: &str, profile: &str) -> Result<RegionChoice> {
    if !region.is_empty() {
        if VALID_REGIONS.contains(&region) {
            return Ok(RegionChoice::Fixed(region.to_string()));
        }
        return Err(Error::InvalidRegion(region.to_string()));
    }
    if profile.is_empty() {
        Ok(RegionChoice::Fixed(DEFAULT_REGION.to_string()))
    } else {
        Ok(RegionChoice::FromProfile(profile.to_string()))
    }
}
