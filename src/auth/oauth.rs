use oauth2::basic::BasicClient;
use oauth2::reqwest::http_client;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, DeviceAuthorizationResponse, DeviceAuthorizationUrl,
    ErrorResponse, ExtraDeviceAuthorizationFields, RefreshToken, RequestTokenError, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Settings;
use crate::error::{Error, Result};

/// Tokens returned by the oauth flow (in-memory)
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

/// Extra fields the Microsoft identity platform adds to a device
/// authorization response. `message` is the ready-made user prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevicePrompt {
    #[serde(default)]
    pub message: Option<String>,
}

impl ExtraDeviceAuthorizationFields for DevicePrompt {}

pub type DeviceDetails = DeviceAuthorizationResponse<DevicePrompt>;

/// Authorize, token and device-code endpoints for one tenant.
pub struct Endpoints {
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub device_url: DeviceAuthorizationUrl,
}

pub fn endpoints(authority_host: &str, tenant: &str) -> Result<Endpoints> {
    let base = format!("{}/{}/oauth2/v2.0", authority_host.trim_end_matches('/'), tenant);
    let bad = |e: url::ParseError| Error::auth(format!("invalid authority '{base}': {e}"));

    Ok(Endpoints {
        auth_url: AuthUrl::new(format!("{base}/authorize")).map_err(bad)?,
        token_url: TokenUrl::new(format!("{base}/token")).map_err(bad)?,
        device_url: DeviceAuthorizationUrl::new(format!("{base}/devicecode")).map_err(bad)?,
    })
}

/// Public client for the device-code grant. No client secret; the client id
/// travels in the request body.
pub fn build_client(settings: &Settings) -> Result<BasicClient> {
    let ep = endpoints(&settings.authority_host, &settings.auth_tenant)?;
    Ok(BasicClient::new(
        ClientId::new(settings.client_id.clone()),
        None,
        ep.auth_url,
        Some(ep.token_url),
    )
    .set_auth_type(AuthType::RequestBody)
    .set_device_authorization_url(ep.device_url))
}

/// Confidential client for the app-only (client credentials) grant, bound
/// to the application's own tenant.
pub fn build_app_client(settings: &Settings) -> Result<BasicClient> {
    let tenant = settings
        .tenant_id
        .as_deref()
        .ok_or_else(|| Error::config("TENANT_ID is required for app-only auth"))?;
    let secret = settings
        .client_secret
        .as_deref()
        .ok_or_else(|| Error::config("CLIENT_SECRET is required for app-only auth"))?;

    let ep = endpoints(&settings.authority_host, tenant)?;
    Ok(BasicClient::new(
        ClientId::new(settings.client_id.clone()),
        Some(ClientSecret::new(secret.to_string())),
        ep.auth_url,
        Some(ep.token_url),
    )
    .set_auth_type(AuthType::RequestBody))
}

/// Client credentials grant for a single resource scope
/// (e.g. `https://graph.microsoft.com/.default`).
pub fn request_app_token(client: &BasicClient, scope: &str) -> Result<Tokens> {
    let token = client
        .exchange_client_credentials()
        .add_scope(Scope::new(scope.to_string()))
        .request(http_client)
        .map_err(|e| token_error("app-only token request failed", e))?;

    log::info!("app-only token acquired");

    Ok(Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: None,
        expires_in: token.expires_in(),
    })
}

/// Text shown to the user while the device code is pending.
pub fn prompt_text(details: &DeviceDetails) -> String {
    match &details.extra_fields().message {
        Some(m) if !m.trim().is_empty() => m.clone(),
        _ => format!(
            "To sign in, open {} and enter the code {}",
            details.verification_uri().url().as_str(),
            details.user_code().secret()
        ),
    }
}

/// Run the device authorization grant: print the prompt, then block polling
/// the token endpoint until the user finishes or the code expires.
pub fn perform_device_code_flow(client: &BasicClient, scopes: &[String]) -> Result<Tokens> {
    let details: DeviceDetails = client
        .exchange_device_code()
        .map_err(|e| Error::auth(format!("device code flow unavailable: {e}")))?
        .add_scopes(scopes.iter().cloned().map(Scope::new))
        .request(http_client)
        .map_err(|e| token_error("device authorization request failed", e))?;

    println!("{}", prompt_text(&details));

    let token = client
        .exchange_device_access_token(&details)
        .request(http_client, std::thread::sleep, None)
        .map_err(|e| token_error("device code sign-in failed", e))?;

    log::info!("device code sign-in completed");

    Ok(Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
        expires_in: token.expires_in(),
    })
}

/// Exchange a refresh token for a new access token using the oauth2 crate
pub fn refresh_access_token(
    client: &BasicClient,
    scopes: &[String],
    refresh_token: &str,
) -> Result<Tokens> {
    let rt = RefreshToken::new(refresh_token.to_string());
    let token = client
        .exchange_refresh_token(&rt)
        .add_scopes(scopes.iter().cloned().map(Scope::new))
        .request(http_client)
        .map_err(|e| token_error("token refresh failed", e))?;

    Ok(Tokens {
        access_token: token.access_token().secret().to_string(),
        refresh_token: token.refresh_token().map(|r| r.secret().to_string()),
        expires_in: token.expires_in(),
    })
}

fn token_error<RE, T>(what: &str, err: RequestTokenError<RE, T>) -> Error
where
    RE: std::error::Error + 'static,
    T: ErrorResponse + 'static,
{
    let detail = match err {
        RequestTokenError::ServerResponse(resp) => format!("{resp:?}"),
        RequestTokenError::Request(e) => e.to_string(),
        RequestTokenError::Parse(e, _body) => format!("unparseable response: {e}"),
        RequestTokenError::Other(s) => s,
    };
    Error::auth(format!("{what}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_tenant_scoped() {
        let ep = endpoints("https://login.microsoftonline.com/", "common").unwrap();
        assert_eq!(
            ep.token_url.url().as_str(),
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
        assert_eq!(
            ep.device_url.url().as_str(),
            "https://login.microsoftonline.com/common/oauth2/v2.0/devicecode"
        );
    }

    #[test]
    fn bad_authority_is_an_auth_error() {
        assert!(matches!(endpoints("not a url", "common"), Err(Error::Auth(_))));
    }

    #[test]
    fn prompt_prefers_provider_message() {
        let details: DeviceDetails = serde_json::from_str(
            r#"{
                "device_code": "dev",
                "user_code": "ABCD-1234",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 5,
                "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code ABCD-1234 to authenticate."
            }"#,
        )
        .unwrap();
        assert!(prompt_text(&details).starts_with("To sign in, use a web browser"));
    }

    #[test]
    fn prompt_falls_back_to_uri_and_code() {
        let details: DeviceDetails = serde_json::from_str(
            r#"{
                "device_code": "dev",
                "user_code": "ABCD-1234",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 5
            }"#,
        )
        .unwrap();
        let text = prompt_text(&details);
        assert!(text.contains("https://microsoft.com/devicelogin"));
        assert!(text.contains("ABCD-1234"));
    }
}
