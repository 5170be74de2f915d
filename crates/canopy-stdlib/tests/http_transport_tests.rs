use canopy_core::{
    fold_tree, DataScope, HttpRequest, HttpTransport, NodeStatus, RenderSession, SessionConfig, ViewId,
};
use canopy_dsl::{decode_value, Header, HttpMethod};
use canopy_stdlib::{OutlineRenderer, ReqwestTransport, TransportConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_string, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> ReqwestTransport {
    ReqwestTransport::from_config(&TransportConfig {
        request_timeout_ms: 5_000,
        connect_timeout_ms: 1_000,
        user_agent: Some("canopy-tests".to_string()),
    })
    .unwrap()
}

fn request(method: HttpMethod, url: &str) -> HttpRequest {
    HttpRequest {
        method,
        url: Url::parse(url).unwrap(),
        headers: Vec::new(),
        body: None,
    }
}

#[tokio::test]
async fn test_get_sends_headers_and_returns_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/42"))
        .and(header("Authorization", "Bearer abc"))
        .and(header("user-agent", "canopy-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "Boots"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut req = request(HttpMethod::Get, &format!("{}/products/42", mock_server.uri()));
    req.headers.push(Header::new("Authorization", "Bearer abc"));

    let response = transport().perform_request(&req).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&response.body).unwrap(),
        json!({"name": "Boots"})
    );
}

#[tokio::test]
async fn test_post_and_put_send_the_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_string(r#"{"q":"boots"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut post = request(HttpMethod::Post, &format!("{}/search", mock_server.uri()));
    post.body = Some(r#"{"q":"boots"}"#.to_string());
    assert_eq!(transport().perform_request(&post).await.unwrap().status, 201);

    let mut put = request(HttpMethod::Put, &format!("{}/cart", mock_server.uri()));
    put.body = Some("{}".to_string());
    let response = transport().perform_request(&put).await.unwrap();
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_invalid_headers_are_dropped_not_fatal() {
    let mock_server = MockServer::start().await;
    Mock::given(header_exists("X-Broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(header("X-Client", "canopy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut req = request(HttpMethod::Get, &format!("{}/items", mock_server.uri()));
    req.headers = vec![
        Header::new("Not A Name", "value"),
        Header::new("X-Broken", "line\nbreak"),
        Header::new("X-Client", "canopy"),
    ];

    let response = transport().perform_request(&req).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_error_status_is_returned_not_raised() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let response = transport()
        .perform_request(&request(HttpMethod::Get, &format!("{}/missing", mock_server.uri())))
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_connection_failure() {
    let error = transport()
        .perform_request(&request(HttpMethod::Get, "http://127.0.0.1:1/unreachable"))
        .await
        .unwrap_err();
    assert!(error.to_string().starts_with("Failed to connect"));
}

#[tokio::test]
async fn test_session_renders_fetched_screen_as_outline() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/shoes"))
        .and(header("X-Client", "canopy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"name": "Boots", "price": 120},
                {"name": "Sandals", "price": 40},
                {"name": "Sneakers", "price": 90}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/banner"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let document = decode_value(&json!({
        "__typeName": "Screen",
        "id": "screen",
        "children": [
            {
                "__typeName": "DataSource",
                "id": "catalog",
                "url": format!("{}/catalog/{{{{url.category}}}}", mock_server.uri()),
                "headers": [],
                "children": [{
                    "__typeName": "Collection",
                    "id": "products",
                    "keyPath": "data.items",
                    "filters": [{"keyPath": "data.price", "predicate": "isGreaterThan", "value": 50}],
                    "sortDescriptors": [{"keyPath": "data.price"}],
                    "children": [{"__typeName": "Text", "id": "name", "text": "{{data.name}}"}]
                }]
            },
            {
                "__typeName": "DataSource",
                "id": "banner",
                "url": format!("{}/banner", mock_server.uri()),
                "headers": []
            }
        ]
    }))
    .unwrap();

    let config = SessionConfig {
        default_headers: vec![Header::new("X-Client", "canopy")],
        ..SessionConfig::default()
    };
    let scope = DataScope::default().with_url_parameter("category", "shoes");
    let mut session = RenderSession::with_config(document, Arc::new(transport()), scope, config);

    let tree = session.settle(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        tree.find(&ViewId::root("banner")).unwrap().status,
        NodeStatus::Failed("Fetch failed: unexpected status code 503".to_string())
    );

    let outline = fold_tree(&mut OutlineRenderer::new(), &tree.root);
    let lines: Vec<&str> = outline.lines().collect();
    assert_eq!(lines[0], "Screen screen");
    assert!(lines[1].starts_with("  DataSource catalog [loaded]"));
    assert_eq!(lines[2], "    Collection products itemCount=2");
    assert_eq!(lines[3], "      Text name#0 text=\"Sneakers\"");
    assert_eq!(lines[4], "      Text name#1 text=\"Boots\"");
    assert!(lines[5].starts_with("  DataSource banner [failed: Fetch failed: unexpected status code 503]"));
}
