//! Managed identity token acquisition against a mock identity endpoint.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sukl_search::{ManagedIdentityCredential, SearchError, TokenProvider};

const TOKEN_PATH: &str = "/msi/token";

fn credential(server: &MockServer, header: Option<&str>) -> ManagedIdentityCredential {
    ManagedIdentityCredential::new(
        reqwest::Client::new(),
        format!("{}{}", server.uri(), TOKEN_PATH),
        header.map(|h| SecretString::from(h.to_string())),
        None,
    )
}

#[tokio::test]
async fn test_app_service_protocol() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(query_param("resource", "https://search.azure.com"))
        .and(query_param("api-version", "2019-08-01"))
        .and(header("X-IDENTITY-HEADER", "secret-header"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "expires_on": "1700000000",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = credential(&server, Some("secret-header"))
        .token()
        .await
        .unwrap();

    assert_eq!(token.bearer(), "Bearer abc");
    assert_eq!(
        token.expires_at().map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
}

#[tokio::test]
async fn test_metadata_protocol_with_client_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(query_param("api-version", "2018-02-01"))
        .and(query_param("client_id", "user-assigned"))
        .and(header("Metadata", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "imds",
            "expires_on": 1_700_000_000,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credential = ManagedIdentityCredential::new(
        reqwest::Client::new(),
        format!("{}{}", server.uri(), TOKEN_PATH),
        None,
        Some("user-assigned".to_string()),
    );
    let token = credential.token().await.unwrap();
    assert_eq!(token.bearer(), "Bearer imds");
}

#[tokio::test]
async fn test_rejected_identity_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = credential(&server, Some("h")).token().await.unwrap_err();
    assert!(matches!(err, SearchError::Auth(_)));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_missing_access_token_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"expires_on": "1"})))
        .mount(&server)
        .await;

    let err = credential(&server, None).token().await.unwrap_err();
    assert!(matches!(err, SearchError::Auth(_)));
}

#[tokio::test]
async fn test_unreachable_identity_endpoint() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let credential = ManagedIdentityCredential::new(
        reqwest::Client::new(),
        format!("http://{}{}", addr, TOKEN_PATH),
        None,
        None,
    );
    assert!(matches!(
        credential.token().await,
        Err(SearchError::Auth(_))
    ));
}
