//! Credential resolution
//!
//! Precedence: explicit key+secret(+session token) from the CLI, then a
//! named profile from the shared credentials file, then the ambient
//! environment (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
//! `AWS_SESSION_TOKEN`). Failure to resolve anything is fatal.
//!
//! The shared files are the usual `~/.aws/credentials` and `~/.aws/config`;
//! only the small INI subset those files actually use is parsed here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Resolved signing material
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key: &str, secret_key: &str, session_token: Option<&str>) -> Self {
        Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            session_token: session_token
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string()),
        }
    }
}

/// Resolve credentials following the precedence chain.
///
/// The returned region is the one the named profile declares, if a profile
/// was given and it declares one. Region deferral is independent of which
/// credential source wins: explicit keys alongside `--profile` still defer
/// to the profile's region.
pub fn resolve(
    access_key: &str,
    secret_key: &str,
    session_token: &str,
    profile: &str,
) -> Result<(Credentials, Option<String>)> {
    resolve_from(
        access_key,
        secret_key,
        session_token,
        profile,
        &credentials_file_path(),
        &config_file_path(),
    )
}

fn resolve_from(
    access_key: &str,
    secret_key: &str,
    session_token: &str,
    profile: &str,
    credentials_path: &Path,
    config_path: &Path,
) -> Result<(Credentials, Option<String>)> {
    let region = if profile.is_empty() {
        None
    } else {
        profile_region(profile, config_path)
    };

    if !access_key.is_empty() && !secret_key.is_empty() {
        debug!("using static credentials from flags");
        return Ok((
            Credentials::new(access_key, secret_key, Some(session_token)),
            region,
        ));
    }

    if !profile.is_empty() {
        let creds = from_profile(profile, credentials_path)?;
        debug!(profile, region = ?region, "using credentials from shared profile");
        return Ok((creds, region));
    }

    if let (Ok(key), Ok(secret)) = (
        std::env::var("AWS_ACCESS_KEY_ID"),
        std::env::var("AWS_SECRET_ACCESS_KEY"),
    ) {
        if !key.is_empty() && !secret.is_empty() {
            debug!("using credentials from environment");
            let token = std::env::var("AWS_SESSION_TOKEN").unwrap_or_default();
            return Ok((Credentials::new(&key, &secret, Some(&token)), None));
        }
    }

    Err(Error::MissingCredentials)
}

/// Load a named profile from a shared credentials file.
pub fn from_profile(profile: &str, path: &Path) -> Result<Credentials> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::CredentialsFile {
        path: path.display().to_string(),
        source,
    })?;

    let sections = parse_ini(&text);
    let section = sections
        .get(profile)
        .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;

    let access_key = section.get("aws_access_key_id");
    let secret_key = section.get("aws_secret_access_key");
    match (access_key, secret_key) {
        (Some(key), Some(secret)) => Ok(Credentials::new(
            key,
            secret,
            section.get("aws_session_token").map(String::as_str),
        )),
        _ => Err(Error::MissingCredentials),
    }
}

/// Region declared by a profile's section in the shared config file, if any.
///
/// Non-default profiles live under `[profile <name>]` in the config file;
/// a missing file or section simply yields `None`.
pub fn profile_region(profile: &str, path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let sections = parse_ini(&text);
    let section = if profile == "default" {
        sections.get("default")
    } else {
        sections
            .get(&format!("profile {profile}"))
            .or_else(|| sections.get(profile))
    };
    section.and_then(|s| s.get("region")).cloned()
}

fn credentials_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return PathBuf::from(path);
    }
    home_aws_path("credentials")
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("AWS_CONFIG_FILE") {
        return PathBuf::from(path);
    }
    home_aws_path("config")
}

fn home_aws_path(file: &str) -> PathBuf {
    let mut path = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".aws");
    path.push(file);
    path
}

/// Parse the INI subset used by the AWS shared files: `[section]` headers,
/// `key = value` lines, `#`/`;` comments. Nested values are not supported.
fn parse_ini(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_explicit_flags_win() {
        let (creds, region) = resolve("AKIAEXPLICIT", "secret", "token", "").unwrap();
        assert_eq!(creds.access_key, "AKIAEXPLICIT");
        assert_eq!(creds.secret_key, "secret");
        assert_eq!(creds.session_token.as_deref(), Some("token"));
        assert!(region.is_none());
    }

    #[test]
    fn test_explicit_creds_still_defer_region_to_profile() {
        let dir = tempfile::tempdir().unwrap();
        let credentials_path = write_file(
            &dir,
            "credentials",
            "[redteam]\naws_access_key_id = AKIAREDTEAM\naws_secret_access_key = redsecret\n",
        );
        let config_path = write_file(&dir, "config", "[profile redteam]\nregion = eu-west-1\n");

        // Keys from flags win for signing, but the profile's region still
        // decides where the session is bound
        let (creds, region) = resolve_from(
            "AKIAEXPLICIT",
            "secret",
            "",
            "redteam",
            &credentials_path,
            &config_path,
        )
        .unwrap();
        assert_eq!(creds.access_key, "AKIAEXPLICIT");
        assert_eq!(region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_empty_session_token_becomes_none() {
        let creds = Credentials::new("key", "secret", Some(""));
        assert!(creds.session_token.is_none());
    }

    #[test]
    fn test_profile_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "credentials",
            "[default]\n\
             aws_access_key_id = AKIADEFAULT\n\
             aws_secret_access_key = defaultsecret\n\
             \n\
             # operator profile\n\
             [redteam]\n\
             aws_access_key_id = AKIAREDTEAM\n\
             aws_secret_access_key = redsecret\n\
             aws_session_token = redtoken\n",
        );

        let creds = from_profile("redteam", &path).unwrap();
        assert_eq!(creds.access_key, "AKIAREDTEAM");
        assert_eq!(creds.secret_key, "redsecret");
        assert_eq!(creds.session_token.as_deref(), Some("redtoken"));

        let creds = from_profile("default", &path).unwrap();
        assert_eq!(creds.access_key, "AKIADEFAULT");
        assert!(creds.session_token.is_none());
    }

    #[test]
    fn test_missing_profile_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "credentials", "[default]\naws_access_key_id = x\n");
        let err = from_profile("nope", &path).unwrap_err();
        assert!(matches!(err, crate::error::Error::ProfileNotFound(p) if p == "nope"));
    }

    #[test]
    fn test_profile_region_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "config",
            "[default]\nregion = us-west-2\n\n[profile redteam]\nregion = eu-west-1\n",
        );

        assert_eq!(
            profile_region("redteam", &path).as_deref(),
            Some("eu-west-1")
        );
        assert_eq!(
            profile_region("default", &path).as_deref(),
            Some("us-west-2")
        );
        assert!(profile_region("missing", &path).is_none());
    }

    #[test]
    fn test_profile_region_missing_file() {
        assert!(profile_region("any", Path::new("/nonexistent/config")).is_none());
    }
}
