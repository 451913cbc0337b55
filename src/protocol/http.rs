// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the BlueAir AWS cloud API.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ParseError, ProtocolError};
use crate::event::DeviceId;
use crate::protocol::retry::RetryPolicy;
use crate::protocol::session::SessionCache;
use crate::protocol::wire::{
    AccessTokenResponse, RegisteredDevice, RegisteredDevicesResponse, StateQuery, StateResponse,
    WriteBody,
};
use crate::protocol::{DeviceStatus, RemoteClient, Session, gigya};
use crate::types::{AttributeValue, Region};

// ============================================================================
// ClientConfig
// ============================================================================

/// Configuration for a [`BlueAirClient`].
///
/// # Examples
///
/// ```
/// use blueair_lib::protocol::ClientConfig;
/// use blueair_lib::types::Region;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("me@example.com", "secret", "account-uuid")
///     .with_region(Region::Us)
///     .with_timeout(Duration::from_secs(10))
///     .with_attempts(5);
///
/// assert_eq!(
///     config.api_base_url(),
///     "https://on1keymlmh.execute-api.us-east-2.amazonaws.com/prod/c"
/// );
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    username: String,
    password: String,
    account_uuid: String,
    region: Region,
    timeout: Duration,
    attempts: u32,
    session_ttl: Duration,
    gigya_url: Option<String>,
    api_url: Option<String>,
}

impl ClientConfig {
    /// Default per-attempt timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default number of attempts per remote call.
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    /// Default lifetime of a session before it is refreshed.
    pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Creates a configuration for the given account, in the default region.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        account_uuid: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            account_uuid: account_uuid.into(),
            region: Region::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            attempts: Self::DEFAULT_ATTEMPTS,
            session_ttl: Self::DEFAULT_SESSION_TTL,
            gigya_url: None,
            api_url: None,
        }
    }

    /// Sets the region the account is registered in.
    #[must_use]
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of attempts per remote call.
    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Sets how long a session is reused before logging in again.
    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Overrides the Gigya accounts base URL.
    #[must_use]
    pub fn with_gigya_url(mut self, url: impl Into<String>) -> Self {
        self.gigya_url = Some(url.into());
        self
    }

    /// Overrides the device API base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Returns the account username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the account UUID.
    #[must_use]
    pub fn account_uuid(&self) -> &str {
        &self.account_uuid
    }

    /// Returns the region.
    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of attempts per remote call.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the session lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Returns the Gigya accounts base URL.
    #[must_use]
    pub fn gigya_base_url(&self) -> String {
        self.gigya_url
            .clone()
            .unwrap_or_else(|| self.region.gigya_base_url())
    }

    /// Returns the device API base URL.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| self.region.api_base_url())
    }

    /// Creates a [`BlueAirClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<BlueAirClient, ProtocolError> {
        BlueAirClient::new(self)
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("username", &self.username)
            .field("account_uuid", &self.account_uuid)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .field("attempts", &self.attempts)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A request that can be sent once per attempt.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Vec<(&'static str, String)>,
    pub(crate) body: Option<(&'static str, String)>,
}

impl ApiRequest {
    pub(crate) fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds the bearer and `idtoken` headers used by the device API.
    pub(crate) fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push(("Authorization", format!("Bearer {token}")));
        self.headers.push(("idtoken", token.to_string()));
        self
    }

    pub(crate) fn form(mut self, body: String) -> Self {
        self.body = Some(("application/x-www-form-urlencoded", body));
        self
    }

    pub(crate) fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ProtocolError> {
        let body = serde_json::to_string(body).map_err(ParseError::Json)?;
        self.body = Some(("application/json", body));
        Ok(self)
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, ProtocolError> {
    serde_json::from_str(body)
        .map_err(|e| ProtocolError::InvalidResponse(ParseError::Json(e)))
}

// ============================================================================
// BlueAirClient
// ============================================================================

/// Client for the BlueAir AWS cloud API.
///
/// Logs in through Gigya, exchanges the Gigya JWT for an API access token
/// and caches the resulting session until its TTL elapses. Every request is
/// retried according to the configured attempt budget.
///
/// # Examples
///
/// ```no_run
/// use blueair_lib::event::DeviceId;
/// use blueair_lib::protocol::{ClientConfig, RemoteClient};
///
/// # async fn example() -> blueair_lib::Result<()> {
/// let client = ClientConfig::new("me@example.com", "secret", "account-uuid").into_client()?;
///
/// for device in client.discover_devices().await? {
///     println!("{} ({})", device.name, device.uuid);
/// }
///
/// let statuses = client.fetch_state(&[DeviceId::new("device-uuid")]).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BlueAirClient {
    http: Client,
    config: ClientConfig,
    gigya_url: String,
    api_url: String,
    policy: RetryPolicy,
    session: SessionCache,
}

impl BlueAirClient {
    /// Creates a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, ProtocolError> {
        let http = Client::builder().build().map_err(ProtocolError::Http)?;

        tracing::debug!(
            username = %config.username,
            region = %config.region,
            "Creating BlueAir API client"
        );

        Ok(Self {
            http,
            gigya_url: trim_base(config.gigya_base_url()),
            api_url: trim_base(config.api_base_url()),
            policy: RetryPolicy {
                attempts: config.attempts,
                timeout: config.timeout,
            },
            session: SessionCache::default(),
            config,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Lists every device registered to the account.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response has no device list.
    pub async fn discover_devices(&self) -> Result<Vec<RegisteredDevice>, ProtocolError> {
        tracing::debug!("Getting registered devices");
        let body = self
            .execute_authorized("registered-devices", |session| {
                Ok(ApiRequest::new(Method::GET, self.api_url("/registered-devices"))
                    .bearer(session.access_token()))
            })
            .await?;

        parse_json::<RegisteredDevicesResponse>(&body)?
            .devices
            .ok_or_else(|| ParseError::MissingField("devices".to_string()).into())
    }

    async fn session(&self) -> Result<Session, ProtocolError> {
        self.session
            .get_or_refresh(self.config.session_ttl, || self.authenticate())
            .await
    }

    /// Runs the full login chain: Gigya session, Gigya JWT, API token.
    async fn authenticate(&self) -> Result<Session, ProtocolError> {
        tracing::debug!("Logging in");

        let request = gigya::login_request(
            &self.gigya_url,
            self.config.region.gigya_api_key(),
            &self.config.username,
            &self.config.password,
        );
        let body = self.execute("gigya-login", &request).await?;
        let (token, secret) = gigya::parse_session(&body)?;

        let request = gigya::jwt_request(&self.gigya_url, &token, &secret);
        let body = self.execute("gigya-jwt", &request).await?;
        let jwt = gigya::parse_jwt(&body)?;

        let request = ApiRequest::new(Method::POST, self.api_url("/login")).bearer(&jwt);
        let body = self.execute("login", &request).await?;
        let access_token = parse_json::<AccessTokenResponse>(&body)?
            .access_token
            .ok_or_else(|| {
                ProtocolError::AuthenticationFailed("no access token in response".to_string())
            })?;

        tracing::debug!("Logged in");
        Ok(Session::new(access_token))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Sends `request` under the retry policy and returns the response body.
    async fn execute(&self, operation: &str, request: &ApiRequest) -> Result<String, ProtocolError> {
        self.policy
            .run(operation, || self.send_once(request))
            .await
    }

    /// Like [`execute`](Self::execute), but builds the request from the
    /// current session before every attempt.
    ///
    /// A 401 drops the session, so the next attempt logs in again and
    /// carries the new token.
    async fn execute_authorized<F>(
        &self,
        operation: &str,
        build: F,
    ) -> Result<String, ProtocolError>
    where
        F: Fn(&Session) -> Result<ApiRequest, ProtocolError>,
    {
        self.policy
            .run_prepared(
                operation,
                || async { build(&self.session().await?) },
                |request| async move { self.send_once(&request).await },
            )
            .await
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<String, ProtocolError> {
        tracing::trace!(method = %request.method, url = %request.url, "Sending request");

        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some((content_type, body)) = &request.body {
            builder = builder.header(CONTENT_TYPE, *content_type).body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate();
            return Err(ProtocolError::AuthenticationFailed(format!(
                "HTTP 401 from {}",
                request.url
            )));
        }

        if !status.is_success() {
            return Err(ProtocolError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::trace!(body = %body, "Received response");
        Ok(body)
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

impl RemoteClient for BlueAirClient {
    async fn login(&self) -> Result<Session, ProtocolError> {
        self.session().await
    }

    async fn fetch_state(&self, ids: &[DeviceId]) -> Result<Vec<DeviceStatus>, ProtocolError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.api_url(&format!("/{}/r/initial", self.config.account_uuid));
        let query = StateQuery::new(ids);

        tracing::debug!(devices = ids.len(), "Fetching device state");
        let body = self
            .execute_authorized("fetch-state", |session| {
                ApiRequest::new(Method::POST, url.clone())
                    .bearer(session.access_token())
                    .json(&query)
            })
            .await?;

        Ok(parse_json::<StateResponse>(&body)?.into_statuses()?)
    }

    async fn write_attribute(
        &self,
        id: &DeviceId,
        attribute: &str,
        value: AttributeValue,
    ) -> Result<(), ProtocolError> {
        let url = self.api_url(&format!("/{id}/a/{attribute}"));
        let body = WriteBody::new(attribute, value);

        tracing::debug!(device_id = %id, attribute, value = %value, "Writing attribute");
        self.execute_authorized("write-attribute", |session| {
            ApiRequest::new(Method::POST, url.clone())
                .bearer(session.access_token())
                .json(&body)
        })
        .await?;
        Ok(())
    }
}
