// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the BlueAir cloud client using wiremock.

use std::time::Duration;

use blueair_lib::event::DeviceId;
use blueair_lib::protocol::{BlueAirClient, ClientConfig, RemoteClient};
use blueair_lib::types::AttributeValue;
use blueair_lib::{ParseError, ProtocolError};
use serde_json::json;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACCOUNT: &str = "acct-1";

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("me@example.com", "p&ss", ACCOUNT)
        .with_gigya_url(format!("{}/gigya", server.uri()))
        .with_api_url(format!("{}/api/", server.uri()))
        .with_timeout(Duration::from_secs(2))
}

fn client(server: &MockServer) -> BlueAirClient {
    config(server).into_client().unwrap()
}

/// Mounts the three login steps, each expected `times` times.
async fn mount_login(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/gigya/accounts.login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "oauth_token": "gigya-token",
            "oauth_token_secret": "gigya-secret"
        })))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/gigya/accounts.getJWT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id_token": "gigya-jwt"
        })))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(header("Authorization", "Bearer gigya-jwt"))
        .and(header("idtoken", "gigya-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "api-token"
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn state_response() -> serde_json::Value {
    json!({
        "deviceInfo": [{
            "id": "dev-1",
            "configuration": {"di": {"name": "Bedroom"}},
            "sensordata": [
                {"n": "pm2_5", "t": 1, "v": 12},
                {"n": "t", "t": 1, "v": 22.5}
            ],
            "states": [
                {"n": "standby", "t": 1, "vb": false},
                {"n": "fanspeed", "t": 1, "v": 2},
                {"n": "mfv", "t": 1, "v": "1.0.0"}
            ]
        }]
    })
}

// ============================================================================
// Login
// ============================================================================

mod login {
    use super::*;

    #[tokio::test]
    async fn runs_the_full_login_chain() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gigya/accounts.login"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string(format!(
                "apiKey={}&loginID=me%40example.com&password=p%26ss&targetEnv=mobile",
                blueair_lib::Region::Eu.gigya_api_key()
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "oauth_token": "gigya-token",
                "oauth_token_secret": "gigya-secret"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/gigya/accounts.getJWT"))
            .and(body_string(
                "oauth_token=gigya-token&secret=gigya-secret&targetEnv=mobile",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "gigya-jwt"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(header("Authorization", "Bearer gigya-jwt"))
            .and(header("idtoken", "gigya-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "api-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client(&server).login().await.unwrap();
        assert_eq!(session.access_token(), "api-token");
    }

    #[tokio::test]
    async fn gigya_error_fails_authentication() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gigya/accounts.login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": 403_042,
                "errorMessage": "Invalid LoginID"
            })))
            .mount(&server)
            .await;

        let err = client(&server).login().await.unwrap_err();
        assert!(
            matches!(&err, ProtocolError::AuthenticationFailed(msg) if msg == "Invalid LoginID"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn missing_access_token_fails_authentication() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gigya/accounts.login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "oauth_token": "t",
                "oauth_token_secret": "s"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/gigya/accounts.getJWT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id_token": "j"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = client(&server).login().await.unwrap_err();
        assert!(matches!(err, ProtocolError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn session_is_reused_across_calls() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_response()))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server);
        client.login().await.unwrap();
        let ids = [DeviceId::new("dev-1")];
        client.fetch_state(&ids).await.unwrap();
        client.fetch_state(&ids).await.unwrap();
    }

    #[tokio::test]
    async fn expired_session_logs_in_again() {
        let server = MockServer::start().await;
        mount_login(&server, 2).await;

        let client = config(&server)
            .with_session_ttl(Duration::ZERO)
            .into_client()
            .unwrap();

        client.login().await.unwrap();
        client.login().await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_response_logs_in_again() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gigya/accounts.login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "oauth_token": "gigya-token",
                "oauth_token_secret": "gigya-secret"
            })))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/gigya/accounts.getJWT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "gigya-jwt"
            })))
            .expect(2)
            .mount(&server)
            .await;

        // First login hands out a token the server no longer accepts
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "expired-token"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh-token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/dev-1/a/fanspeed"))
            .and(header("Authorization", "Bearer expired-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/dev-1/a/fanspeed"))
            .and(header("Authorization", "Bearer fresh-token"))
            .and(header("idtoken", "fresh-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        client
            .write_attribute(&DeviceId::new("dev-1"), "fanspeed", AttributeValue::Int(2))
            .await
            .unwrap();

        // The fresh session is kept
        let session = client.login().await.unwrap();
        assert_eq!(session.access_token(), "fresh-token");
    }

    #[tokio::test]
    async fn persistent_unauthorized_exhausts_retries() {
        let server = MockServer::start().await;
        mount_login(&server, 3).await;

        Mock::given(method("POST"))
            .and(path("/api/dev-1/a/fanspeed"))
            .respond_with(ResponseTemplate::new(401))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server)
            .write_attribute(&DeviceId::new("dev-1"), "fanspeed", AttributeValue::Int(2))
            .await
            .unwrap_err();

        match err {
            ProtocolError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ProtocolError::AuthenticationFailed(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

// ============================================================================
// State
// ============================================================================

mod state {
    use super::*;

    #[tokio::test]
    async fn fetch_state_parses_device_info() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .and(header("Authorization", "Bearer api-token"))
            .and(header("idtoken", "api-token"))
            .and(body_json(json!({
                "deviceconfigquery": [{"id": "dev-1", "r": {"r": ["sensors"]}}],
                "includestates": true,
                "eventsubscription": {"include": [{"filter": {"o": "= dev-1"}}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_response()))
            .expect(1)
            .mount(&server)
            .await;

        let statuses = client(&server)
            .fetch_state(&[DeviceId::new("dev-1")])
            .await
            .unwrap();

        assert_eq!(statuses.len(), 1);
        let status = &statuses[0];
        assert_eq!(status.id.as_str(), "dev-1");
        assert_eq!(status.name, "Bedroom");
        assert_eq!(status.state.get("standby"), Some(&AttributeValue::Bool(false)));
        assert_eq!(status.state.get("fanspeed"), Some(&AttributeValue::Int(2)));
        assert!(!status.state.contains_key("mfv"));
        assert_eq!(status.sensor_data.get("pm2_5"), Some(&12.0));
        assert_eq!(status.sensor_data.get("temperature"), Some(&22.5));
    }

    #[tokio::test]
    async fn fetch_state_without_ids_skips_the_request() {
        let server = MockServer::start().await;

        let statuses = client(&server).fetch_state(&[]).await.unwrap();
        assert!(statuses.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetch_state_without_device_info_is_invalid() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "nope"})))
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_state(&[DeviceId::new("dev-1")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidResponse(ParseError::MissingField(field)) if field == "deviceInfo"
        ));
    }

    #[tokio::test]
    async fn server_errors_exhaust_retries() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server)
            .fetch_state(&[DeviceId::new("dev-1")])
            .await
            .unwrap_err();

        match err {
            ProtocolError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(
                    matches!(*source, ProtocolError::Status { status: 500, ref body } if body == "boom")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn transient_error_is_retried() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .respond_with(ResponseTemplate::new(200).set_body_json(state_response()))
            .expect(1)
            .mount(&server)
            .await;

        let statuses = client(&server)
            .fetch_state(&[DeviceId::new("dev-1")])
            .await
            .unwrap();
        assert_eq!(statuses.len(), 1);
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path(format!("/api/{ACCOUNT}/r/initial")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(state_response())
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = config(&server)
            .with_timeout(Duration::from_millis(100))
            .with_attempts(2)
            .into_client()
            .unwrap();

        let err = client
            .fetch_state(&[DeviceId::new("dev-1")])
            .await
            .unwrap_err();

        match err {
            ProtocolError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, ProtocolError::Timeout(100)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

// ============================================================================
// Writes
// ============================================================================

mod write {
    use super::*;

    #[tokio::test]
    async fn integer_values_are_sent_as_v() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/api/dev-1/a/fanspeed"))
            .and(header("Authorization", "Bearer api-token"))
            .and(body_json(json!({"n": "fanspeed", "v": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .write_attribute(&DeviceId::new("dev-1"), "fanspeed", AttributeValue::Int(3))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn boolean_values_are_sent_as_vb() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/api/dev-1/a/standby"))
            .and(body_json(json!({"n": "standby", "vb": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .write_attribute(&DeviceId::new("dev-1"), "standby", AttributeValue::Bool(true))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejected_write_is_an_error() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/api/dev-1/a/standby"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server)
            .write_attribute(&DeviceId::new("dev-1"), "standby", AttributeValue::Bool(true))
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::RetriesExhausted { .. }));
    }
}

// ============================================================================
// Discovery
// ============================================================================

mod discovery {
    use super::*;

    #[tokio::test]
    async fn lists_registered_devices() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/api/registered-devices"))
            .and(header("idtoken", "api-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "devices": [
                    {
                        "mac": "AA:BB:CC:DD:EE:FF",
                        "mcu-firmware": "1.0.1",
                        "name": "Bedroom",
                        "type": "foobot",
                        "user-type": "owner",
                        "uuid": "dev-1",
                        "wifi-firmware": "2.1.0"
                    },
                    {"uuid": "dev-2", "name": "Office"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let devices = client(&server).discover_devices().await.unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].uuid, "dev-1");
        assert_eq!(devices[0].mac, "AA:BB:CC:DD:EE:FF");
        assert_eq!(devices[0].user_type, "owner");
        assert_eq!(devices[1].name, "Office");
        assert!(devices[1].mcu_firmware.is_empty());
    }

    #[tokio::test]
    async fn missing_device_list_is_invalid() {
        let server = MockServer::start().await;
        mount_login(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/api/registered-devices"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = client(&server).discover_devices().await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidResponse(ParseError::MissingField(_))
        ));
    }
}
