//! HTTP fetching of status documents and the space directory.

use spacestate::directory;
use spacestate::error::FetchError;
use spacestate::status::{HttpStatusSource, StatusSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve_document(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spaceapi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn open_document_resolves_to_open() {
    let server = serve_document(serde_json::json!({
        "api": "0.13",
        "space": "Somespace",
        "state": {"open": true}
    }))
    .await;

    let fetcher = HttpStatusSource::new().unwrap();
    let status = fetcher
        .fetch(&format!("{}/spaceapi", server.uri()))
        .await
        .unwrap();

    assert!(status.open);
    assert_eq!(status.mqtt, None);
}

#[tokio::test]
async fn document_may_declare_a_broker_endpoint() {
    let server = serve_document(serde_json::json!({
        "state": {
            "open": false,
            "mqtt": {
                "host": "mqtt.somespace.example",
                "port": 1884,
                "topic": "somespace/status",
                "open": "yes",
                "closed": "no"
            }
        }
    }))
    .await;

    let fetcher = HttpStatusSource::new().unwrap();
    let status = fetcher
        .fetch(&format!("{}/spaceapi", server.uri()))
        .await
        .unwrap();

    assert!(!status.open);
    let mqtt = status.mqtt.unwrap();
    assert_eq!(mqtt.host.as_deref(), Some("mqtt.somespace.example"));
    assert_eq!(mqtt.port, 1884);
    assert_eq!(mqtt.open_payload(), "yes");
    assert_eq!(mqtt.closed_payload(), "no");
}

#[tokio::test]
async fn document_without_open_state_is_a_fetch_error() {
    let server = serve_document(serde_json::json!({
        "space": "Somespace",
        "state": {"open": null}
    }))
    .await;

    let fetcher = HttpStatusSource::new().unwrap();
    let err = fetcher
        .fetch(&format!("{}/spaceapi", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Document(_)));
}

#[tokio::test]
async fn server_error_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spaceapi"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = HttpStatusSource::new().unwrap();
    let err = fetcher
        .fetch(&format!("{}/spaceapi", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Http(_)));
}

#[tokio::test]
async fn unparseable_body_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spaceapi"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let fetcher = HttpStatusSource::new().unwrap();
    let err = fetcher
        .fetch(&format!("{}/spaceapi", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Http(_)));
}

#[tokio::test]
async fn directory_listing_maps_names_to_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Somespace": "https://somespace.example/spaceapi",
            "Bastli": "https://bastli.ethz.ch/spaceapi"
        })))
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let listing = directory::fetch_directory(&client, &server.uri())
        .await
        .unwrap();

    assert_eq!(listing.len(), 2);
    assert_eq!(
        listing.get("Somespace").map(String::as_str),
        Some("https://somespace.example/spaceapi")
    );
}
