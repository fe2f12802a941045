use oauth2::basic::BasicClient;
use std::time::{Duration, Instant};

use crate::auth::oauth::{self, Tokens};
use crate::config::Settings;
use crate::error::Result;

/// Tokens are renewed this long before they actually expire.
const EXPIRY_SKEW: Duration = Duration::from_secs(5 * 60);

struct CachedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
}

/// Device-code credential. Signs the user in on first use and keeps the
/// token set in memory for the life of the process.
pub struct DeviceCodeCredential {
    client: BasicClient,
    scopes: Vec<String>,
    cached: Option<CachedToken>,
}

impl DeviceCodeCredential {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: oauth::build_client(settings)?,
            scopes: settings.scopes.clone(),
            cached: None,
        })
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns a valid access token; refreshes/runs the device flow if needed.
    pub fn get_token(&mut self) -> Result<String> {
        let now = Instant::now();

        // 1) cached & not about to expire
        if let Some(c) = &self.cached
            && is_fresh(c.expires_at, now)
        {
            log::debug!("using cached access token");
            return Ok(c.access_token.clone());
        }

        // 2) refresh if possible; the cache is only replaced once a new token exists
        let previous_refresh = self.cached.as_ref().and_then(|c| c.refresh_token.clone());
        if let Some(rt) = previous_refresh {
            match oauth::refresh_access_token(&self.client, &self.scopes, &rt) {
                Ok(t) => {
                    log::info!("access token refreshed");
                    return Ok(self.store(t, Some(rt), now));
                }
                Err(e) => log::warn!("{e}; falling back to device code sign-in"),
            }
        }

        // 3) otherwise device code
        let t = oauth::perform_device_code_flow(&self.client, &self.scopes)?;
        Ok(self.store(t, None, now))
    }

    fn store(&mut self, t: Tokens, previous_refresh: Option<String>, now: Instant) -> String {
        let access = t.access_token.clone();
        self.cached = Some(CachedToken {
            access_token: t.access_token,
            // the provider may omit a rotated refresh token
            refresh_token: t.refresh_token.or(previous_refresh),
            expires_at: t.expires_in.map(|d| now + d),
        });
        access
    }
}

pub(crate) fn is_fresh(expires_at: Option<Instant>, now: Instant) -> bool {
    match expires_at {
        Some(exp) => now + EXPIRY_SKEW < exp,
        None => true,
    }
}
