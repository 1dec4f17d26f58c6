//! Authenticated access to the Business Central OData API.
//!
//! The pipeline only sees [`RestClient`]. [`HttpClient`] is the production
//! implementation: bearer authentication, request timeouts, retries on
//! throttling/server errors, and `@odata.nextLink` pagination.

use std::thread;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{GlobalSettings, Secrets};
use crate::error::{FetchError, Result, ToolError};
use crate::flatten::RECORDS_KEY;

const NEXT_LINK_KEY: &str = "@odata.nextLink";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const MAX_BACKOFF_SECS: u64 = 30;
const BODY_EXCERPT_LEN: usize = 200;

/// Blocking GET returning a decoded JSON body.
pub trait RestClient {
    fn get(&mut self, url: &str) -> std::result::Result<Value, FetchError>;
}

impl<F> RestClient for F
where
    F: FnMut(&str) -> std::result::Result<Value, FetchError>,
{
    fn get(&mut self, url: &str) -> std::result::Result<Value, FetchError> {
        self(url)
    }
}

/// How the client obtains its bearer token.
#[derive(Clone)]
pub enum Credentials {
    /// A pre-issued access token.
    Token(String),
    /// OAuth2 client-credentials grant.
    ClientSecret {
        token_url: String,
        client_id: String,
        client_secret: String,
        scope: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Credentials::Token(..)"),
            Credentials::ClientSecret {
                token_url,
                client_id,
                ..
            } => f
                .debug_struct("Credentials::ClientSecret")
                .field("token_url", token_url)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Picks an explicit token if given, otherwise the configured client
    /// credentials.
    pub fn resolve(
        token: Option<String>,
        global: &GlobalSettings,
        secrets: &Secrets,
    ) -> Result<Self> {
        if let Some(token) = token.filter(|token| !token.trim().is_empty()) {
            return Ok(Credentials::Token(token));
        }
        match (&global.client_id, &secrets.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Credentials::ClientSecret {
                token_url: global.token_endpoint(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                scope: global.scope.clone(),
            }),
            _ => Err(ToolError::invalid_config(
                "No access token or client credentials available.",
                "Pass --token (or set BC_ACCESS_TOKEN), or set 'global.client-id' and 'client-secret' in the secrets file",
            )),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + TOKEN_REFRESH_MARGIN < expires_at,
            None => true,
        }
    }
}

/// Production [`RestClient`] backed by a blocking reqwest client. The
/// connection pool is released when the client is dropped.
pub struct HttpClient {
    http: Client,
    credentials: Credentials,
    token: Option<AccessToken>,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(global: &GlobalSettings, credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(global.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            credentials,
            token: None,
            max_retries: global.max_retries,
        })
    }

    fn bearer(&mut self) -> std::result::Result<String, FetchError> {
        if let Some(token) = self.token.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.value.clone());
        }
        let token = match &self.credentials {
            Credentials::Token(value) => AccessToken {
                value: value.clone(),
                expires_at: None,
            },
            Credentials::ClientSecret {
                token_url,
                client_id,
                client_secret,
                scope,
            } => request_token(&self.http, token_url, client_id, client_secret, scope)?,
        };
        let value = token.value.clone();
        self.token = Some(token);
        Ok(value)
    }

    fn get_page(&mut self, url: &str) -> std::result::Result<Value, FetchError> {
        let mut attempt = 0;
        loop {
            let bearer = self.bearer()?;
            let response = self
                .http
                .get(url)
                .bearer_auth(bearer)
                .header(ACCEPT, "application/json")
                .send()
                .map_err(classify_transport)?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Value>()
                    .map_err(|error| FetchError::Unclassified(format!("cannot decode body: {error}")));
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                // A rejected token may just be stale; drop it so the next
                // request fetches a new one.
                self.token = None;
                return Err(FetchError::Auth(format!("{status}: {}", excerpt(response))));
            }

            if is_retryable(status) && attempt < self.max_retries {
                let delay = retry_delay(&response, attempt);
                attempt += 1;
                warn!(%status, attempt, delay_secs = delay.as_secs(), "retrying request");
                thread::sleep(delay);
                continue;
            }

            return Err(FetchError::Api(format!("{status}: {}", excerpt(response))));
        }
    }
}

impl RestClient for HttpClient {
    /// Fetches `url` and follows `@odata.nextLink` until the collection is
    /// complete. The returned body has all pages merged under `value`.
    fn get(&mut self, url: &str) -> std::result::Result<Value, FetchError> {
        let mut body = self.get_page(url)?;
        let mut pages = 1;
        while let Some(next) = take_next_link(&mut body) {
            debug!(next = %next, "following next link");
            let mut page = self.get_page(&next)?;
            let items = match page.get_mut(RECORDS_KEY) {
                Some(Value::Array(items)) => std::mem::take(items),
                _ => break,
            };
            if let Some(Value::Array(existing)) = body.get_mut(RECORDS_KEY) {
                existing.extend(items);
            }
            if let Some(link) = take_next_link(&mut page) {
                if let Value::Object(map) = &mut body {
                    map.insert(NEXT_LINK_KEY.to_string(), Value::String(link));
                }
            }
            pages += 1;
        }
        if pages > 1 {
            debug!(pages, "merged paged response");
        }
        Ok(body)
    }
}

fn request_token(
    http: &Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    scope: &str,
) -> std::result::Result<AccessToken, FetchError> {
    debug!(token_url, client_id, "requesting access token");
    let response = http
        .post(token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", scope),
        ])
        .send()
        .map_err(|error| match classify_transport(error) {
            FetchError::Timeout(detail) => FetchError::Timeout(detail),
            other => FetchError::Auth(format!("token request failed: {other}")),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Auth(format!(
            "token endpoint returned {status}: {}",
            excerpt(response)
        )));
    }
    let token: TokenResponse = response
        .json()
        .map_err(|error| FetchError::Auth(format!("invalid token response: {error}")))?;
    Ok(AccessToken {
        value: token.access_token,
        expires_at: Some(Instant::now() + Duration::from_secs(token.expires_in)),
    })
}

/// Removes and returns a pagination link from a collection body. Only
/// bodies that also carry a record list are paged.
fn take_next_link(body: &mut Value) -> Option<String> {
    let map = body.as_object_mut()?;
    if !matches!(map.get(RECORDS_KEY), Some(Value::Array(_))) {
        return None;
    }
    match map.remove(NEXT_LINK_KEY)? {
        Value::String(link) => Some(link),
        _ => None,
    }
}

fn classify_transport(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(error.to_string())
    } else if error.is_connect() || error.is_request() {
        FetchError::Api(error.to_string())
    } else {
        FetchError::Unclassified(error.to_string())
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_delay(response: &Response, attempt: u32) -> Duration {
    let advertised = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());
    let secs = advertised.unwrap_or_else(|| 1u64 << attempt.min(5));
    Duration::from_secs(secs.min(MAX_BACKOFF_SECS))
}

fn excerpt(response: Response) -> String {
    let body = response.text().unwrap_or_default();
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
