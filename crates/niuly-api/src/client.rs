// Niu cloud API HTTP client
//
// Owns the access token and the re-authentication policy. The only data
// endpoint is the vehicle status; its body is handed back undecoded beyond
// plain JSON so callers decide which fields they care about.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{Credentials, PasswordGrant, TokenResponse};
use crate::error::Error;

/// Production endpoint of the vendor cloud.
pub const DEFAULT_BASE_URL: &str = "https://api-factory.niu.com";

/// How many times a rejected token may be replaced within one status fetch.
const REAUTH_BUDGET: u32 = 1;

const BODY_PREVIEW_LEN: usize = 200;

/// Raw vehicle status payload, exactly as decoded from the vendor.
pub type Telemetry = serde_json::Value;

/// HTTP client for one vehicle on the Niu cloud API.
///
/// Authentication is lazy: the first [`fetch_vehicle_status`](Self::fetch_vehicle_status)
/// call obtains a token. A `401` from the status endpoint discards the token,
/// authenticates once more and retries the request once; anything beyond
/// that is reported to the caller.
pub struct NiuClient {
    http: reqwest::Client,
    credentials: Credentials,
    token_url: Url,
    status_url: Url,
    access_token: Option<SecretString>,
}

impl NiuClient {
    /// Create a client against `base_url` using a shared HTTP session.
    ///
    /// Endpoint paths are appended to `base_url`'s own path, so a base with a
    /// prefix (e.g. a proxy mount point) keeps it.
    pub fn new(
        base_url: &Url,
        credentials: Credentials,
        http: reqwest::Client,
    ) -> Result<Self, Error> {
        let token_url = endpoint(base_url, &["v1", "oauth2", "token"])?;
        let status_url = endpoint(
            base_url,
            &["v3", "vehicle", credentials.vehicle_id(), "status"],
        )?;
        Ok(Self {
            http,
            credentials,
            token_url,
            status_url,
            access_token: None,
        })
    }

    /// Whether a token is currently held.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn vehicle_id(&self) -> &str {
        self.credentials.vehicle_id()
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange the account credentials for an access token.
    ///
    /// `POST {base}/v1/oauth2/token` with a form-encoded password grant.
    /// On success the token replaces whatever was held before.
    pub async fn authenticate(&mut self) -> Result<(), Error> {
        debug!(url = %self.token_url, "requesting access token");

        let grant = PasswordGrant {
            grant_type: "password",
            username: self.credentials.username(),
            password: self.credentials.password().expose_secret(),
        };

        let resp = self
            .http
            .post(self.token_url.clone())
            .form(&grant)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "authentication rejected");
            return Err(Error::Authentication {
                message: format!("token endpoint returned HTTP {status}"),
            });
        }

        let body = resp.bytes().await?;
        let token = serde_json::from_slice::<TokenResponse>(&body)
            .ok()
            .and_then(|t| t.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("token response carried no access token");
                Error::Authentication {
                    message: "no access token received".into(),
                }
            })?;

        self.access_token = Some(SecretString::from(token));
        debug!("access token stored");
        Ok(())
    }

    // ── Vehicle status ───────────────────────────────────────────────

    /// Fetch the current telemetry for the configured vehicle.
    ///
    /// `GET {base}/v3/vehicle/{vehicle_id}/status` with a bearer token.
    pub async fn fetch_vehicle_status(&mut self) -> Result<Telemetry, Error> {
        if self.access_token.is_none() {
            self.authenticate().await?;
        }

        let mut reauth_budget = REAUTH_BUDGET;
        loop {
            let resp = self.send_status_request().await?;
            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED && reauth_budget > 0 {
                reauth_budget -= 1;
                info!(vehicle_id = self.vehicle_id(), "token expired, re-authenticating");
                self.access_token = None;
                self.authenticate().await?;
                continue;
            }

            if !status.is_success() {
                let retried = reauth_budget < REAUTH_BUDGET;
                warn!(%status, retried, "failed to get vehicle data");
                let message = if retried {
                    "failed to get vehicle data after re-authentication"
                } else {
                    "failed to get vehicle data"
                };
                return Err(Error::Api {
                    message: message.into(),
                    status: Some(status.as_u16()),
                });
            }

            let body = resp.bytes().await?;
            return serde_json::from_slice(&body).map_err(|e| {
                let text = String::from_utf8_lossy(&body);
                let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
                Error::Api {
                    message: format!("undecodable vehicle status: {e} (body preview: {preview:?})"),
                    status: Some(status.as_u16()),
                }
            });
        }
    }

    async fn send_status_request(&self) -> Result<reqwest::Response, Error> {
        let Some(token) = self.access_token.as_ref() else {
            return Err(Error::Authentication {
                message: "no access token held".into(),
            });
        };

        debug!("GET {}", self.status_url);

        let resp = self
            .http
            .get(self.status_url.clone())
            .bearer_auth(token.expose_secret())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .send()
            .await?;
        Ok(resp)
    }
}

/// Append path segments to `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
