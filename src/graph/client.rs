use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use url::{Url, form_urlencoded};

use crate::error::{Error, Result};
use crate::graph::models::ErrorEnvelope;

/// Thin blocking Graph client. Holds no credential; callers hand it a bearer
/// token per request.
pub struct GraphClient {
    http: Client,
    base_url: String,
}

impl GraphClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("graph_inbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::auth(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for Graph path segments plus OData query options.
    /// Segments are percent-encoded, so opaque ids can be passed as-is.
    pub fn request_url(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            Error::api(None, format!("invalid Graph endpoint {}: {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| Error::api(None, format!("Graph endpoint {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            let q: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
                .collect();
            url.set_query(Some(&q.join("&")));
        }
        Ok(url)
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.request_url(segments, query)?;
        log::debug!("GET {url}");

        let res = self.http.get(url).bearer_auth(token).send()?;
        let res = check_status(res)?;
        res.json::<T>()
            .map_err(|e| Error::api(None, format!("parsing Graph response: {e}")))
    }
}

/// Form encoding, but with spaces as `%20` the way Graph's SDKs send them.
fn encode_component(s: &str) -> String {
    // a literal '+' is already `%2B` at this point
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().unwrap_or_default();
    Err(Error::api(Some(status.as_u16()), error_detail(&body)))
}

/// Prefer Graph's `code: message`; fall back to the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) if !env.error.code.is_empty() => {
            format!("{}: {}", env.error.code, env.error.message)
        }
        Ok(env) => env.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
