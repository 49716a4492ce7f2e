use shovel_config::ClientConfig;
use shovel_http::{HeaderMap, HeaderValue, HttpError, HttpTransport, ReqwestTransport};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(&ClientConfig::default()).expect("transport")
}

#[tokio::test]
async fn sends_exactly_the_given_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("x-probe", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("x-probe", HeaderValue::from_static("1"));
    let resp = transport()
        .get(&format!("{}/page", server.uri()), headers)
        .await
        .expect("response");

    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "<p>hi</p>");
}

#[tokio::test]
async fn redirects_are_returned_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resp = transport()
        .get(&format!("{}/old", server.uri()), HeaderMap::new())
        .await
        .expect("response");

    assert_eq!(resp.status, 301);
    assert!(!resp.is_success());
}

#[tokio::test]
async fn error_statuses_still_carry_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let resp = transport()
        .get(&server.uri(), HeaderMap::new())
        .await
        .expect("response");

    assert_eq!(resp.status, 503);
    assert_eq!(resp.text(), "try later");
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    // Port 1 on loopback refuses connections.
    let err = transport()
        .get("http://127.0.0.1:1/", HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, HttpError::Network(_)));
}
