//! Integration tests for `HttpGateway` using wiremock HTTP mocks.

use aura_core::{
    Category, CustomerIdentity, NewTrialRequest, ProductId, ProductSnapshot, TrialFilter, TrialId,
    TrialStatus, UserRole,
};
use aura_gateway::{CatalogSource, GatewayError, HttpGateway, SessionResolver, TrialGateway};
use rust_decimal::Decimal;
use wiremock::matchers::{
    bearer_token, body_json, body_partial_json, header_exists, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_gateway(base_url: &str) -> HttpGateway {
    HttpGateway::with_base_url(base_url, 5).expect("gateway construction should not fail")
}

fn serum() -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::from("1"),
        name: "Serum".to_owned(),
        price: Decimal::new(12800, 0),
        category: Some(Category::Skincare),
    }
}

fn remote_record(id: u64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "product_id": 1,
        "product_name": "Serum",
        "unit_price": "12800",
        "quantity": 1,
        "trial_duration_days": 7,
        "customer_notes": "dry skin",
        "status": status,
        "staff_notes": null,
        "created_at": "2025-03-01T09:00:00",
        "updated_at": "2025-03-01T09:30:00"
    })
}

#[tokio::test]
async fn create_trial_posts_payload_and_keeps_snapshots() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/trial-requests"))
        .and(header_exists("x-request-id"))
        .and(body_partial_json(serde_json::json!({
            "product_id": "1",
            "quantity": 1,
            "trial_duration_days": 7,
            "customer_notes": "dry skin",
            "customer_name": "Aiko"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(remote_record(101, "pending")))
        .expect(1)
        .mount(&server)
        .await;

    let request = NewTrialRequest::for_products(vec![serum()])
        .with_memo("dry skin")
        .with_customer(Some(CustomerIdentity {
            name: "Aiko".to_owned(),
            email: "aiko@example.com".to_owned(),
        }));
    let created = test_gateway(&server.uri())
        .create_trial(&request)
        .await
        .expect("create should succeed");

    assert_eq!(created.id, TrialId::from("101"));
    assert_eq!(created.status, TrialStatus::Pending);
    assert_eq!(created.products, vec![serum()]);
    assert_eq!(created.memo.as_deref(), Some("dry skin"));
}

#[tokio::test]
async fn create_trial_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/trial-requests"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = test_gateway(&server.uri()).with_retry(3, 0);
    let err = gateway
        .create_trial(&NewTrialRequest::for_products(vec![serum()]))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::UnexpectedStatus { status: 503, .. }));
    assert!(!err.is_client_side());
}

#[tokio::test]
async fn create_trial_surfaces_validation_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/trial-requests"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(serde_json::json!({ "detail": "product is not active" })),
        )
        .mount(&server)
        .await;

    let err = test_gateway(&server.uri())
        .create_trial(&NewTrialRequest::for_products(vec![serum()]))
        .await
        .unwrap_err();

    match err {
        GatewayError::Rejected { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "product is not active");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn list_trials_sends_filter_and_parses_items() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trial-requests"))
        .and(query_param("status", "approved"))
        .and(query_param("sort_by", "created_at"))
        .and(query_param("sort_order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [remote_record(7, "approved"), remote_record(8, "approved")]
        })))
        .mount(&server)
        .await;

    let trials = test_gateway(&server.uri())
        .list_trials(&TrialFilter::default().with_status(TrialStatus::Approved))
        .await
        .expect("list should succeed");

    assert_eq!(trials.len(), 2);
    assert!(trials.iter().all(|t| t.status == TrialStatus::Approved));
    assert_eq!(trials[0].products[0].name, "Serum");
}

#[tokio::test]
async fn list_trials_retries_after_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trial-requests"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trial-requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let trials = test_gateway(&server.uri())
        .with_retry(1, 0)
        .list_trials(&TrialFilter::default())
        .await
        .expect("second attempt should succeed");

    assert!(trials.is_empty());
}

#[tokio::test]
async fn list_trials_reports_undecodable_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trial-requests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = test_gateway(&server.uri())
        .list_trials(&TrialFilter::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Deserialize { .. }));
    assert!(!err.is_client_side());
}

#[tokio::test]
async fn update_status_sends_status_and_notes() {
    let server = MockServer::start().await;

    let mut updated = remote_record(7, "approved");
    updated["staff_notes"] = serde_json::json!("ok to ship");

    Mock::given(method("PATCH"))
        .and(path("/trial-requests/7/status"))
        .and(body_json(serde_json::json!({
            "status": "approved",
            "staff_notes": "ok to ship"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    let record = test_gateway(&server.uri())
        .update_trial_status(&TrialId::from("7"), TrialStatus::Approved, Some(" ok to ship "))
        .await
        .expect("update should succeed");

    assert_eq!(record.status, TrialStatus::Approved);
    assert_eq!(record.staff_notes.as_deref(), Some("ok to ship"));
}

#[tokio::test]
async fn update_status_conflict_is_a_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/trial-requests/7/status"))
        .respond_with(ResponseTemplate::new(409).set_body_string("already rejected"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_gateway(&server.uri())
        .with_retry(3, 0)
        .update_trial_status(&TrialId::from("7"), TrialStatus::Completed, None)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Rejected { status: 409, .. }));
    assert!(!err.is_client_side());
}

#[tokio::test]
async fn update_status_is_not_retried_after_server_error() {
    let server = MockServer::start().await;

    // A retry after a commit that lost its response would be refused as an
    // illegal repeat of the same transition.
    Mock::given(method("PATCH"))
        .and(path("/trial-requests/7/status"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/trial-requests/7/status"))
        .respond_with(ResponseTemplate::new(409).set_body_string("already approved"))
        .expect(0)
        .mount(&server)
        .await;

    let err = test_gateway(&server.uri())
        .with_retry(3, 0)
        .update_trial_status(&TrialId::from("7"), TrialStatus::Approved, None)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::UnexpectedStatus { status: 503, .. }));
}

#[tokio::test]
async fn delete_treats_missing_record_as_deleted() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/trial-requests/5"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/trial-requests/6"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let gateway = test_gateway(&server.uri());
    gateway
        .delete_trial(&TrialId::from("5"))
        .await
        .expect("204 should succeed");
    gateway
        .delete_trial(&TrialId::from("6"))
        .await
        .expect("404 should count as deleted");
}

#[tokio::test]
async fn stats_accept_backend_field_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/trial-requests/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total_requests": 10,
            "pending_requests": 4,
            "approved_requests": 3,
            "completed_requests": 2,
            "success_rate": 0.2
        })))
        .mount(&server)
        .await;

    let stats = test_gateway(&server.uri())
        .trial_stats()
        .await
        .expect("stats should parse");

    assert_eq!(stats.total, 10);
    assert_eq!(stats.pending, 4);
    assert_eq!(stats.rejected, 0);
}

#[tokio::test]
async fn fetch_products_parses_backend_catalog() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": 1,
                "name": "Premium Face Cream",
                "price": "3500.00",
                "category": "skincare",
                "stock_quantity": 50,
                "rating": 4.5,
                "is_active": true
            }
        ])))
        .mount(&server)
        .await;

    let products = test_gateway(&server.uri())
        .fetch_products()
        .await
        .expect("catalog should parse");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id.as_str(), "1");
    assert_eq!(products[0].stock, 50);
}

#[tokio::test]
async fn current_session_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(bearer_token("tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 3,
            "email": "mika@auraselect.com",
            "name": "Mika",
            "role": "stylist"
        })))
        .mount(&server)
        .await;

    let session = test_gateway(&server.uri())
        .with_token("tok-123")
        .current_session()
        .await
        .expect("session should resolve");

    assert_eq!(session.role, UserRole::Stylist);
    assert_eq!(session.id, "3");
}

#[tokio::test]
async fn current_session_requires_a_token() {
    let server = MockServer::start().await;
    let err = test_gateway(&server.uri())
        .current_session()
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::MissingToken));
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = test_gateway(&server.uri())
        .with_token("stale")
        .current_session()
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized { status: 401 }));
}
