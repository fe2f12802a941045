use oauth2::basic::BasicClient;
use std::time::Instant;

use crate::auth::oauth;
use crate::auth::token_manager::is_fresh;
use crate::config::Settings;
use crate::error::Result;

/// App-only tokens always ask for the application's static Graph permissions.
pub const APP_ONLY_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Client-secret credential for app-only Graph access. No user is involved;
/// a new token is requested whenever the cached one is about to expire.
pub struct ClientSecretCredential {
    client: BasicClient,
    cached: Option<(String, Option<Instant>)>,
}

impl ClientSecretCredential {
    /// Fails with a configuration error when the tenant or the secret is
    /// missing.
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: oauth::build_app_client(settings)?,
            cached: None,
        })
    }

    pub fn get_token(&mut self) -> Result<String> {
        let now = Instant::now();
        if let Some((token, expires_at)) = &self.cached
            && is_fresh(*expires_at, now)
        {
            return Ok(token.clone());
        }

        let t = oauth::request_app_token(&self.client, APP_ONLY_SCOPE)?;
        let access = t.access_token.clone();
        self.cached = Some((t.access_token, t.expires_in.map(|d| now + d)));
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawSettings;
    use crate::error::Error;
    use std::time::Duration;

    fn raw() -> RawSettings {
        RawSettings {
            client_id: Some("client".into()),
            graph_user_scopes: Some("user.read".into()),
            tenant_id: Some("contoso.onmicrosoft.com".into()),
            client_secret: Some("s3cret".into()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_secret_is_a_configuration_error() {
        let settings = RawSettings {
            client_secret: None,
            ..raw()
        }
        .validate()
        .unwrap();
        assert!(matches!(
            ClientSecretCredential::new(&settings),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn missing_tenant_is_a_configuration_error() {
        let settings = RawSettings {
            tenant_id: None,
            ..raw()
        }
        .validate()
        .unwrap();
        assert!(matches!(
            ClientSecretCredential::new(&settings),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn cached_app_token_is_reused() {
        let mut cred = ClientSecretCredential::new(&raw().validate().unwrap()).unwrap();
        cred.cached = Some((
            "app-at".into(),
            Some(Instant::now() + Duration::from_secs(3600)),
        ));
        assert_eq!(cred.get_token().unwrap(), "app-at");
    }

    #[test]
    fn token_request_failure_is_an_auth_error() {
        // nothing listens on port 1
        let settings = RawSettings {
            authority_host: Some("http://127.0.0.1:1".into()),
            ..raw()
        }
        .validate()
        .unwrap();
        let mut cred = ClientSecretCredential::new(&settings).unwrap();
        assert!(matches!(cred.get_token(), Err(Error::Auth(_))));
    }
}
