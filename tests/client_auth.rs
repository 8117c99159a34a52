use httpmock::prelude::*;
use serde_json::json;
use suite_client::{Client, ClientConfig, ClientError, ExposeSecret, GrantStrategy, RetryConfig};

fn access_token(client: &Client) -> String {
    client.access_token().expose_secret().to_owned()
}

fn refresh_token(client: &Client) -> Option<String> {
    client
        .refresh_token()
        .map(|token| token.expose_secret().to_owned())
}

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.url("/api"))
        .with_token_endpoint(server.url("/token"))
        .with_retry(RetryConfig::disabled())
}

#[test]
fn supplied_access_token_wins_over_password() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(200)
            .json_body(json!({"access_token": "from-endpoint"}));
    });
    let jobs = server.mock(|when, then| {
        when.method(GET)
            .path("/api/jobs")
            .header("authorization", "Bearer X");
        then.status(200).json_body(json!([]));
    });

    let client = Client::new(
        config(&server)
            .with_access_token("X")
            .with_password("ada", "secret"),
    )
    .expect("client builds");

    assert_eq!(client.strategy(), GrantStrategy::AccessToken);
    assert_eq!(access_token(&client), "X");
    client.get_json("jobs").expect("request succeeds");

    token.assert_calls(0);
    jobs.assert_calls(1);
}

#[test]
fn password_grant_installs_both_tokens() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/token")
            .header("content-type", "application/x-www-form-urlencoded");
        then.status(200)
            .json_body(json!({"access_token": "A1", "refresh_token": "R1", "token_type": "Bearer"}));
    });

    let client = Client::new(config(&server).with_password("ada", "secret")).expect("client builds");

    token.assert_calls(1);
    assert_eq!(client.strategy(), GrantStrategy::Password);
    assert_eq!(access_token(&client), "A1");
    assert_eq!(refresh_token(&client).as_deref(), Some("R1"));
    assert_eq!(client.session().authorization().as_deref(), Some("Bearer A1"));
}

#[test]
fn rejected_credentials_are_an_authentication_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(401)
            .json_body(json!({"error": "invalid_grant"}));
    });

    let error = Client::new(config(&server).with_password("ada", "wrong"))
        .expect_err("credentials are rejected");
    match error {
        ClientError::Authentication { status, message } => {
            assert_eq!(status.map(|status| status.as_u16()), Some(401));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn single_unauthorized_response_refreshes_once_and_replays() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(200)
            .json_body(json!({"access_token": "fresh"}));
    });
    let stale = server.mock(|when, then| {
        when.method(GET)
            .path("/api/jobs/17")
            .header("authorization", "Bearer stale");
        then.status(401);
    });
    let fresh = server.mock(|when, then| {
        when.method(GET)
            .path("/api/jobs/17")
            .header("authorization", "Bearer fresh");
        then.status(200).json_body(json!({"id": "17"}));
    });

    let client = Client::new(
        config(&server)
            .with_access_token("stale")
            .with_refresh_token("R"),
    )
    .expect("client builds");
    let headers = client.session().headers();

    let job = client.get_json("jobs/17").expect("replayed request succeeds");
    assert_eq!(job, json!({"id": "17"}));

    token.assert_calls(1);
    stale.assert_calls(1);
    fresh.assert_calls(1);
    assert_eq!(access_token(&client), "fresh");
    assert_eq!(
        refresh_token(&client).as_deref(),
        Some("R"),
        "refresh token is kept when none is reissued"
    );
    assert_eq!(
        headers
            .read()
            .expect("headers lock")
            .get("authorization")
            .and_then(|value| value.to_str().ok()),
        Some("Bearer fresh"),
        "headers handed out earlier see the rotated token"
    );

    client.get_json("jobs/17").expect("later request succeeds");
    token.assert_calls(1);
    fresh.assert_calls(2);
}

#[test]
fn persistent_unauthorized_stops_after_one_retry() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(200)
            .json_body(json!({"access_token": "fresh", "refresh_token": "R2"}));
    });
    let jobs = server.mock(|when, then| {
        when.method(GET).path("/api/jobs");
        then.status(401).body("token expired");
    });

    let client = Client::new(
        config(&server)
            .with_access_token("stale")
            .with_refresh_token("R"),
    )
    .expect("client builds");

    let error = client.get_json("jobs").expect_err("second 401 surfaces");
    match error {
        ClientError::HttpStatus { status, body, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "token expired");
        }
        other => panic!("unexpected error: {other}"),
    }
    jobs.assert_calls(2);
    token.assert_calls(1);
    assert_eq!(refresh_token(&client).as_deref(), Some("R2"));

    client.get_json("jobs").expect_err("budget resets per request");
    jobs.assert_calls(4);
    token.assert_calls(2);
}

#[test]
fn client_credentials_refresh_repeats_the_exchange() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(200)
            .json_body(json!({"access_token": "service"}));
    });
    let jobs = server.mock(|when, then| {
        when.method(GET).path("/api/jobs");
        then.status(401);
    });

    let client = Client::new(config(&server).with_client_secret("s3cret")).expect("client builds");
    assert_eq!(client.strategy(), GrantStrategy::ClientCredentials);
    assert_eq!(refresh_token(&client), None);
    token.assert_calls(1);

    client.get_json("jobs").expect_err("still unauthorized");
    token.assert_calls(2);
    jobs.assert_calls(2);
}

#[test]
fn failed_refresh_surfaces_without_replay() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(400)
            .json_body(json!({"error": "invalid_grant"}));
    });
    let jobs = server.mock(|when, then| {
        when.method(GET).path("/api/jobs");
        then.status(401);
    });

    let client = Client::new(
        config(&server)
            .with_access_token("stale")
            .with_refresh_token("revoked"),
    )
    .expect("client builds");

    let error = client.get_json("jobs").expect_err("refresh fails");
    assert!(matches!(error, ClientError::Authentication { .. }));
    token.assert_calls(1);
    jobs.assert_calls(1);
    assert_eq!(access_token(&client), "stale");
}

#[test]
fn token_endpoint_is_discovered_from_auth_url() {
    let server = MockServer::start();
    let discovery = server.mock(|when, then| {
        when.method(GET)
            .path("/realms/suite/.well-known/openid-configuration");
        then.status(200).json_body(json!({
            "issuer": server.url("/realms/suite"),
            "token_endpoint": server.url("/realms/suite/protocol/openid-connect/token"),
            "authorization_endpoint": server.url("/realms/suite/protocol/openid-connect/auth")
        }));
    });
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/realms/suite/protocol/openid-connect/token");
        then.status(200)
            .json_body(json!({"access_token": "discovered"}));
    });

    let client = Client::new(
        ClientConfig::new(server.url("/api"))
            .with_auth_url(server.url("/realms/suite"))
            .with_password("ada", "secret"),
    )
    .expect("client builds");

    discovery.assert_calls(1);
    token.assert_calls(1);
    assert_eq!(access_token(&client), "discovered");
}

#[test]
fn passthrough_does_not_fetch_discovery() {
    let server = MockServer::start();
    let discovery = server.mock(|when, then| {
        when.method(GET)
            .path("/realms/suite/.well-known/openid-configuration");
        then.status(200)
            .json_body(json!({"token_endpoint": server.url("/token")}));
    });

    Client::new(
        ClientConfig::new(server.url("/api"))
            .with_auth_url(server.url("/realms/suite"))
            .with_access_token("X"),
    )
    .expect("client builds");

    discovery.assert_calls(0);
}
