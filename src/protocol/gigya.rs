// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gigya accounts API, the first two steps of the BlueAir login.

use reqwest::Method;

use crate::error::ProtocolError;
use crate::protocol::http::{ApiRequest, parse_json};
use crate::protocol::wire::{GigyaJwtResponse, GigyaSessionResponse};

const TARGET_ENV: &str = "mobile";

/// Encodes `pairs` as an `application/x-www-form-urlencoded` body.
fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn login_request(
    base_url: &str,
    api_key: &str,
    username: &str,
    password: &str,
) -> ApiRequest {
    ApiRequest::new(Method::POST, format!("{base_url}/accounts.login")).form(form_body(&[
        ("apiKey", api_key),
        ("loginID", username),
        ("password", password),
        ("targetEnv", TARGET_ENV),
    ]))
}

pub(crate) fn jwt_request(base_url: &str, token: &str, secret: &str) -> ApiRequest {
    ApiRequest::new(Method::POST, format!("{base_url}/accounts.getJWT")).form(form_body(&[
        ("oauth_token", token),
        ("secret", secret),
        ("targetEnv", TARGET_ENV),
    ]))
}

/// Extracts the OAuth token and secret from an `accounts.login` response.
pub(crate) fn parse_session(body: &str) -> Result<(String, String), ProtocolError> {
    let response: GigyaSessionResponse = parse_json(body)?;

    match (response.oauth_token, response.oauth_token_secret) {
        (Some(token), Some(secret)) => {
            tracing::debug!("Gigya session received");
            Ok((token, secret))
        }
        _ => Err(ProtocolError::AuthenticationFailed(
            response
                .error_message
                .unwrap_or_else(|| "no oauth_token or oauth_token_secret in response".to_string()),
        )),
    }
}

/// Extracts the JWT from an `accounts.getJWT` response.
pub(crate) fn parse_jwt(body: &str) -> Result<String, ProtocolError> {
    let response: GigyaJwtResponse = parse_json(body)?;

    response.id_token.ok_or_else(|| {
        ProtocolError::AuthenticationFailed(
            response
                .error_message
                .unwrap_or_else(|| "no id_token in response".to_string()),
        )
    })
}
