use crate::{
    domain::{LotId, LotStatus},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{ListResponse, LotSummary, OrderConfirmation, OrderRequest},
};

#[test]
fn lot_summary_parses_camel_case_wire_record() {
    let raw = r#"{
        "total": 1,
        "items": [{
            "id": "lot-1",
            "title": "Brass compass",
            "about": "Ship's compass",
            "image": "/compass.png",
            "status": "wait",
            "startsAt": "2024-01-01T10:00:00Z",
            "endsAt": "2024-01-02T10:00:00Z",
            "price": 0,
            "minBidIncrement": 50
        }]
    }"#;

    let parsed: ListResponse<LotSummary> = serde_json::from_str(raw).expect("parse");
    assert_eq!(parsed.total, 1);
    let lot = &parsed.items[0];
    assert_eq!(lot.id, LotId::from("lot-1"));
    assert_eq!(lot.status, LotStatus::Pending);
    assert_eq!(lot.min_bid_increment, 50);
    assert!(lot.history.is_none());
}

#[test]
fn lot_status_accepts_pending_alias() {
    let status: LotStatus = serde_json::from_str("\"pending\"").expect("alias");
    assert_eq!(status, LotStatus::Pending);
    assert_eq!(serde_json::to_string(&LotStatus::Pending).expect("encode"), "\"wait\"");
    assert_eq!(serde_json::to_string(&LotStatus::Closed).expect("encode"), "\"closed\"");
}

#[test]
fn order_request_serializes_items_as_plain_ids() {
    let order = OrderRequest {
        items: vec![LotId::from("a"), LotId::from("b")],
        email: "buyer@example.com".into(),
        phone: "+1 555 010 0000".into(),
    };
    let encoded = serde_json::to_value(&order).expect("encode");
    assert_eq!(encoded["items"], serde_json::json!(["a", "b"]));
}

#[test]
fn order_confirmation_total_is_optional() {
    let confirmation: OrderConfirmation =
        serde_json::from_str(r#"{"id":"order-9"}"#).expect("parse");
    assert_eq!(confirmation.id.as_str(), "order-9");
    assert!(confirmation.total.is_none());
}

#[test]
fn api_error_body_becomes_exception_with_status() {
    let body: ApiError =
        serde_json::from_str(r#"{"code":"not_found","message":"lot missing"}"#).expect("parse");
    assert_eq!(body, ApiError::new(ErrorCode::NotFound, "lot missing"));

    let err: ApiException = body.with_status(404);
    assert_eq!(err.status, 404);
    assert_eq!(err.to_string(), "HTTP 404 not_found: lot missing");
}
