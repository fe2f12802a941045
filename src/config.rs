use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_AUTH_TENANT: &str = "common";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// On-disk / environment shape. Every key is optional until validated.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct RawSettings {
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub auth_tenant: Option<String>,
    /// Comma-separated, same format as `GRAPH_USER_SCOPES`.
    pub graph_user_scopes: Option<String>,
    pub client_secret: Option<String>,
    pub authority_host: Option<String>,
    pub graph_endpoint: Option<String>,
}

/// Validated settings the session is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client_id: String,
    pub auth_tenant: String,
    pub scopes: Vec<String>,
    pub authority_host: String,
    pub graph_endpoint: String,
    /// App-only credential mode; not required for device-code sign-in.
    pub tenant_id: Option<String>,
    pub client_secret: Option<String>,
}

/// `None` when the platform has no config dir (e.g. no `HOME`).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("graph_inbox").join("config.toml"))
}

/// Load `.env.local` and `.env` into the process environment. Variables that
/// are already set win, so `.env.local` takes precedence over `.env`.
pub fn load_dotenv() {
    if dotenv::from_filename(".env.local").is_ok() {
        log::debug!("loaded .env.local");
    }
    if dotenv::dotenv().is_ok() {
        log::debug!("loaded .env");
    }
}

/// Read the TOML layer. A missing file is an empty layer.
pub fn load_file(path: &Path) -> Result<RawSettings> {
    if !path.exists() {
        return Ok(RawSettings::default());
    }
    let s = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("reading {}: {e}", path.display())))?;
    let raw: RawSettings = toml::from_str(&s)
        .map_err(|e| Error::config(format!("parsing {}: {e}", path.display())))?;
    log::debug!("loaded settings from {}", path.display());
    Ok(raw)
}

/// File layer at an optional location. No location is an empty layer.
pub fn load_file_layer(path: Option<&Path>) -> Result<RawSettings> {
    match path {
        Some(p) => load_file(p),
        None => {
            log::debug!("no config dir available, skipping settings file");
            Ok(RawSettings::default())
        }
    }
}

/// Full startup load: config file, then environment on top.
pub fn load_settings() -> Result<Settings> {
    let file = load_file_layer(config_path().as_deref())?;
    file.with_env(|key| std::env::var(key).ok()).validate()
}

impl RawSettings {
    /// Overlay values from an environment lookup. Empty variables are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = get("TENANT_ID") {
            self.tenant_id = Some(v);
        }
        if let Some(v) = get("AUTH_TENANT") {
            self.auth_tenant = Some(v);
        }
        if let Some(v) = get("GRAPH_USER_SCOPES") {
            self.graph_user_scopes = Some(v);
        }
        if let Some(v) = get("CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = get("AUTHORITY_HOST") {
            self.authority_host = Some(v);
        }
        if let Some(v) = get("GRAPH_ENDPOINT") {
            self.graph_endpoint = Some(v);
        }
        self
    }

    pub fn validate(self) -> Result<Settings> {
        let client_id = non_empty(self.client_id)
            .ok_or_else(|| Error::config("CLIENT_ID is not set"))?;

        let scopes = self
            .graph_user_scopes
            .as_deref()
            .map(split_scopes)
            .unwrap_or_default();
        if scopes.is_empty() {
            return Err(Error::config("GRAPH_USER_SCOPES is not set"));
        }

        Ok(Settings {
            client_id,
            auth_tenant: non_empty(self.auth_tenant)
                .unwrap_or_else(|| DEFAULT_AUTH_TENANT.to_string()),
            scopes,
            authority_host: non_empty(self.authority_host)
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            graph_endpoint: non_empty(self.graph_endpoint)
                .unwrap_or_else(|| DEFAULT_GRAPH_ENDPOINT.to_string()),
            tenant_id: non_empty(self.tenant_id),
            client_secret: non_empty(self.client_secret),
        })
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn split_scopes(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn scopes_are_trimmed_and_empties_dropped() {
        assert_eq!(
            split_scopes(" user.read, mail.read ,,"),
            vec!["user.read".to_string(), "mail.read".to_string()]
        );
    }

    #[test]
    fn env_only_settings_get_defaults() {
        let s = RawSettings::default()
            .with_env(env(&[
                ("CLIENT_ID", "abc"),
                ("GRAPH_USER_SCOPES", "user.read,mail.read"),
            ]))
            .validate()
            .unwrap();
        assert_eq!(s.client_id, "abc");
        assert_eq!(s.auth_tenant, DEFAULT_AUTH_TENANT);
        assert_eq!(s.authority_host, DEFAULT_AUTHORITY_HOST);
        assert_eq!(s.graph_endpoint, DEFAULT_GRAPH_ENDPOINT);
        assert_eq!(s.scopes.len(), 2);
        assert!(s.client_secret.is_none());
    }

    #[test]
    fn missing_client_id_is_a_configuration_error() {
        let err = RawSettings::default()
            .with_env(env(&[("GRAPH_USER_SCOPES", "user.read")]))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn blank_scopes_are_a_configuration_error() {
        let err = RawSettings::default()
            .with_env(env(&[("CLIENT_ID", "abc"), ("GRAPH_USER_SCOPES", " , ")]))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
client_id = "from-file"
auth_tenant = "organizations"
graph_user_scopes = "user.read"
"#,
        )
        .unwrap();

        let s = load_file(&path)
            .unwrap()
            .with_env(env(&[("CLIENT_ID", "from-env"), ("AUTH_TENANT", "")]))
            .validate()
            .unwrap();
        assert_eq!(s.client_id, "from-env");
        // empty variables do not clobber the file layer
        assert_eq!(s.auth_tenant, "organizations");
        assert_eq!(s.scopes, vec!["user.read".to_string()]);
    }

    #[test]
    fn no_config_dir_still_loads_from_environment() {
        let s = load_file_layer(None)
            .unwrap()
            .with_env(env(&[("CLIENT_ID", "abc"), ("GRAPH_USER_SCOPES", "user.read")]))
            .validate()
            .unwrap();
        assert_eq!(s.client_id, "abc");
    }

    #[test]
    fn missing_file_is_empty_layer() {
        let dir = tempfile::tempdir().unwrap();
        let raw = load_file(&dir.path().join("nope.toml")).unwrap();
        assert!(raw.client_id.is_none());
    }

    #[test]
    fn malformed_file_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "client_id = [").unwrap();
        assert!(matches!(load_file(&path), Err(Error::Configuration(_))));
    }
}
