//! Requests go through a caller-supplied transport instance.

#![cfg(feature = "reqwest")]

use http::{HeaderMap, HeaderValue};
use satvu_http::{Backend, ClientConfig, HttpClient, Instance, Request, ReqwestClient, StaticToken};
use serde_json::json;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn marked_session() -> reqwest::Client {
    let mut headers = HeaderMap::new();
    headers.insert("x-instance", HeaderValue::from_static("injected"));
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap()
}

async fn assert_routed_once(server: &MockServer, client: &dyn HttpClient) {
    let response = client
        .request(&Request::post(server.uri()).json(json!({"foo": "bar"})))
        .await
        .unwrap();
    assert!(response.is_success());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1, "{}", client.backend());
    assert_eq!(received[0].headers["x-instance"], "injected");
    assert_eq!(received[0].headers["authorization"], "Bearer t");
}

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_injected_reqwest_session() {
    let server = mock_server().await;
    let client = ReqwestClient::with_instance(marked_session());
    client.set_auth(server.uri(), StaticToken::bearer("t"));

    assert_routed_once(&server, &client).await;
}

#[tokio::test]
async fn test_config_injects_reqwest_session() {
    let server = mock_server().await;
    let client = ClientConfig::new(Backend::Reqwest)
        .with_auth(server.uri(), "Bearer t")
        .build_with(Some(Instance::Reqwest(marked_session())))
        .unwrap();

    assert_routed_once(&server, client.as_ref()).await;
}

#[cfg(feature = "middleware")]
#[tokio::test]
async fn test_injected_middleware_stack() {
    let server = mock_server().await;
    let stack = reqwest_middleware::ClientBuilder::new(marked_session()).build();
    let client = ClientConfig::new(Backend::Middleware)
        .with_auth(server.uri(), "Bearer t")
        .build_with(Some(Instance::Middleware(stack)))
        .unwrap();

    assert_routed_once(&server, client.as_ref()).await;
}
