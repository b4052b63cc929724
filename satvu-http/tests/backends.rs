//! End-to-end behaviour shared by every compiled backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use satvu_http::{
    Backend, BoxError, CallbackTokenProvider, ClientConfig, HttpClient, HttpError, Request,
    TokenProvider,
};
use serde_json::{Value, json};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn clients() -> Vec<Box<dyn HttpClient>> {
    Backend::ALL
        .into_iter()
        .filter(|backend| backend.is_enabled())
        .map(|backend| ClientConfig::new(backend).build().unwrap())
        .collect()
}

async fn hello_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Hello"})))
        .mount(&server)
        .await;
    server
}

fn token_counter() -> (Arc<AtomicUsize>, Arc<dyn TokenProvider>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let provider = CallbackTokenProvider::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, BoxError>("mock-token".to_owned()) }
    });
    let provider: Arc<dyn TokenProvider> = Arc::new(provider);
    (calls, provider)
}

#[tokio::test]
async fn test_get_and_post_decode_json() {
    let server = hello_server().await;
    let url = format!("{}/", server.uri());

    for client in clients() {
        for request in [Request::get(&url), Request::post(&url)] {
            let response = client.request(&request).await.unwrap();
            assert!(response.is_success(), "{}", client.backend());
            let body: Value = response.json().unwrap();
            assert_eq!(body, json!({"message": "Hello"}), "{}", client.backend());
        }
    }
}

#[tokio::test]
async fn test_auth_injected_only_under_prefix() {
    // The mock server plays every host, so prefixes are built on its URI.
    let server = hello_server().await;
    let base = server.uri();
    let authed_prefix = format!("{base}/authed/");
    let cases = [
        (format!("{base}/"), false),
        (format!("{base}/non-authed"), false),
        (format!("{base}/authed/"), true),
        (format!("{base}/authed/subpath"), true),
    ];

    for client in clients() {
        let (_, provider) = token_counter();
        client.set_auth(authed_prefix.clone(), provider);

        for (url, injected) in &cases {
            server.reset().await;
            Mock::given(any())
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;

            client.request(&Request::get(url)).await.unwrap();

            let received = server.received_requests().await.unwrap();
            assert_eq!(received.len(), 1);
            let got = received[0]
                .headers
                .get(AUTHORIZATION)
                .is_some_and(|v| v == "mock-token");
            assert_eq!(got, *injected, "{} {url}", client.backend());
        }
    }
}

#[tokio::test]
async fn test_explicit_authorization_is_not_overridden() {
    let server = hello_server().await;
    let url = format!("{}/authed/subpath", server.uri());

    for client in clients() {
        let (calls, provider) = token_counter();
        client.set_auth(format!("{}/authed/", server.uri()), provider);
        server.reset().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let request = Request::get(&url)
            .try_header("Authorization", "some-other")
            .unwrap();
        client.request(&request).await.unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received[0].headers[AUTHORIZATION], "some-other");
        assert_eq!(calls.load(Ordering::SeqCst), 0, "{}", client.backend());
    }
}

#[tokio::test]
async fn test_payload_encoding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let url = server.uri();

    let cases = [
        (
            Request::post(&url).form([("foo", "bar")]),
            "application/x-www-form-urlencoded",
        ),
        (
            Request::post(&url).json(json!({"foo": "bar"})),
            "application/json",
        ),
        (
            Request::post(&url)
                .form([("bar", "foo")])
                .json(json!({"foo": "bar"})),
            "application/x-www-form-urlencoded",
        ),
    ];
    let expected_bodies = [
        Value::String("foo=bar".to_owned()),
        json!({"foo": "bar"}),
        Value::String("bar=foo".to_owned()),
    ];

    for client in clients() {
        for ((request, content_type), expected) in cases.iter().zip(&expected_bodies) {
            client.request(request).await.unwrap();

            let received = server.received_requests().await.unwrap();
            let last = received.last().unwrap();
            assert_eq!(last.headers[CONTENT_TYPE], *content_type, "{}", client.backend());
            let body = match expected {
                Value::String(_) => Value::String(String::from_utf8(last.body.clone()).unwrap()),
                _ => serde_json::from_slice(&last.body).unwrap(),
            };
            assert_eq!(&body, expected, "{}", client.backend());
        }
    }
}

#[tokio::test]
async fn test_no_payload_sends_no_content_type() {
    let server = hello_server().await;

    for client in clients() {
        client
            .request(&Request::get(format!("{}/plain", server.uri())))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let last = received.last().unwrap();
        assert!(last.body.is_empty());
        assert!(last.headers.get(CONTENT_TYPE).is_none(), "{}", client.backend());
    }
}

#[tokio::test]
async fn test_repeated_requests_are_equivalent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stateless"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": 1})))
        .mount(&server)
        .await;
    let request = Request::get(format!("{}/stateless", server.uri()));

    for client in clients() {
        let first = client.request(&request).await.unwrap();
        let second = client.request(&request).await.unwrap();

        assert_eq!(first.status(), second.status());
        assert_eq!(first.bytes(), second.bytes());
        assert_eq!(
            first.headers().get(CONTENT_TYPE),
            second.headers().get(CONTENT_TYPE)
        );
    }
}

#[tokio::test]
async fn test_error_status_is_a_response() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    for client in clients() {
        let response = client
            .request(&Request::get(server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
        assert_eq!(response.text(), "missing");
        assert!(matches!(
            response.json::<Value>(),
            Err(HttpError::Decode(_))
        ));
    }
}

#[tokio::test]
async fn test_connection_refused_propagates() {
    // Bind and drop a listener to get a port nobody is serving.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}/");

    for client in clients() {
        let err = client.request(&Request::get(&url)).await.unwrap_err();
        match client.backend() {
            Backend::Builtin => assert!(matches!(err, HttpError::Io(_)), "{err}"),
            #[cfg(feature = "reqwest")]
            Backend::Reqwest => assert!(matches!(err, HttpError::Reqwest(_)), "{err}"),
            #[cfg(feature = "middleware")]
            Backend::Middleware => assert!(matches!(err, HttpError::Middleware(_)), "{err}"),
            #[allow(unreachable_patterns)]
            other => panic!("backend {other} should not be enabled"),
        }
    }
}

#[tokio::test]
async fn test_sub_second_timeout_allows_fast_responses() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;

    for backend in Backend::ALL.into_iter().filter(|b| b.is_enabled()) {
        let client = ClientConfig::new(backend)
            .with_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let response = client.request(&Request::get(server.uri())).await;
        assert!(response.is_ok(), "{backend}: {response:?}");
    }
}
