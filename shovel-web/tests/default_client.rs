//! The process-wide fetcher. Kept in its own binary because it closes the
//! shared transport at the end.

mod common;

use shovel_web::{FetchOpts, meta};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn free_functions_share_one_cache_and_client() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<main>Hi</main>"))
        .expect(2)
        .mount(&server)
        .await;
    let url = format!("{}/", server.uri());

    let doc = shovel_web::fetch(&url).await.unwrap();
    assert_eq!(meta::main_text(&doc).unwrap(), "Hi");
    let again = shovel_web::fetch_document(&url, FetchOpts::default()).await.unwrap();
    assert_eq!(doc, again);

    shovel_web::clear_cache();
    shovel_web::fetch(&url).await.unwrap();

    let fetcher = shovel_web::default_fetcher().unwrap();
    assert_eq!(fetcher.cache().len(), 1);

    shovel_web::close_client();
    assert!(shovel_web::fetch(&url).await.is_ok());
    assert!(
        shovel_web::fetch_text_or_none(&url, FetchOpts::default())
            .await
            .unwrap()
            .is_none()
    );
}
