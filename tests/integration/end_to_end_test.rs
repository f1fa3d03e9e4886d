//! End-to-end engine tests.
//!
//! These tests drive a whole product session the way a host would: load a
//! configuration, feed inputs, prepare a request, apply a response, and
//! check what the pool and the outgoing request look like at each step.

use apiforge::config::{load_product_config, parse_product_config};
use apiforge::pool::Provenance;
use apiforge::session::Session;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

use super::init_test_env;

fn payment_config_json() -> String {
    json!({
        "layout": [
            {"type": "combo", "key": "payType", "options": ["CARD", "WALLET"],
             "default": "CARD", "priority": 1},
            {"type": "field", "key": "cardNo", "default": "6222000011112222", "priority": 2},
            {"type": "field", "key": "name", "default": "张三", "priority": 3},
            {"type": "field", "key": "amount", "default": "100", "priority": 4},
            {"type": "field", "key": "rate", "default": "15", "priority": 5},
            {"type": "condition", "key": "acctNo", "condition_field": "payType",
             "mappings": {"CARD": "cardNo", "WALLET": "walletNo"}, "priority": 6},
            {"type": "formula", "key": "fee", "formula": "{amount}*{rate}%", "priority": 7},
            {"type": "formula", "key": "total", "formula": "{amount}+{fee}", "priority": 8},
            {"type": "interface", "key": "pay", "priority": 9}
        ],
        "interfaces": {
            "pay": {
                "url": "https://api.example.com/pay",
                "headers": {
                    "Content-Type": "application/json",
                    "X-Request-Id": "{requestId}"
                },
                "body_template": {
                    "name": "{name}",
                    "acct": "{acctNo}",
                    "amount": "{amount}",
                    "total": "{total}"
                },
                "field_types": {"amount": "int", "total": "float"},
                "response_mapping": {
                    "orderId": "data.orderId",
                    "innerStatus": "data.output.status"
                }
            }
        }
    })
    .to_string()
}

#[test]
fn test_full_request_build_from_config_file() {
    init_test_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("payment.json");
    fs::write(&path, payment_config_json()).unwrap();

    let config = load_product_config(&path).unwrap();
    let mut session = Session::new(config);

    let request = session.prepare_request("pay").unwrap();

    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "https://api.example.com/pay");
    assert_eq!(
        request.headers.get("X-Request-Id").unwrap(),
        session.request_id()
    );
    // fee = 100*15% = 15, total = 115, coerced to float.
    assert_eq!(
        request.body,
        json!({
            "name": "张三",
            "acct": "6222000011112222",
            "amount": 100,
            "total": 115.0
        })
    );
}

#[test]
fn test_typed_body_coercion_end_to_end() {
    init_test_env();
    let config = parse_product_config(&payment_config_json()).unwrap();
    let mut session = Session::new(config);

    session.set_field_input("amount", "250");

    let request = session.prepare_request("pay").unwrap();
    assert_eq!(request.body["amount"], json!(250));
    // 250 + 250*15% = 287.5
    assert_eq!(request.body["total"], json!(287.5));
}

#[test]
fn test_response_extraction_through_embedded_json() {
    init_test_env();
    let config = parse_product_config(&payment_config_json()).unwrap();
    let mut session = Session::new(config);

    let request = session.prepare_request("pay").unwrap();

    // The gateway double-encodes its output field.
    let response = apiforge::ExchangeResponse::new(200)
        .with_body(r#"{"data": {"orderId": "ORD-7", "output": "{\"status\":\"SETTLED\"}"}}"#);

    let changed = session
        .apply_response("pay", request.generation, &response)
        .unwrap();
    assert!(changed.contains(&"orderId".to_string()));
    assert_eq!(session.pool().get_str("orderId"), Some("ORD-7".to_string()));
    assert_eq!(
        session.pool().get_str("innerStatus"),
        Some("SETTLED".to_string())
    );
    assert_eq!(
        session.pool().provenance("orderId"),
        Some(Provenance::ResponseExtraction)
    );
}

#[test]
fn test_condition_switching_never_leaks_across_choices() {
    init_test_env();
    let config = parse_product_config(&payment_config_json()).unwrap();
    let mut session = Session::new(config);

    session.set_variable("walletNo", json!("W-1"), Provenance::SqlOutput);
    session.set_combo_selection("payType", "WALLET");
    assert_eq!(session.pool().get_str("acctNo"), Some("W-1".to_string()));

    // An option with no mapping clears the condition instead of keeping
    // the previous choice's account.
    session.set_combo_selection("payType", "UNKNOWN");
    assert_eq!(session.pool().get_str("acctNo"), Some(String::new()));
}

#[test]
fn test_decrypted_body_used_for_extraction() {
    init_test_env();
    let config = parse_product_config(&payment_config_json()).unwrap();
    let mut session = Session::new(config);

    let request = session.prepare_request("pay").unwrap();
    let mut response = apiforge::ExchangeResponse::new(200).with_body("AAECAwQ=");
    response.decrypted_body = Some(r#"{"data": {"orderId": "ORD-9"}}"#.to_string());

    assert_eq!(
        session.apply_response("pay", request.generation, &response),
        Some(vec!["orderId".to_string()])
    );
    assert_eq!(session.pool().get_str("orderId"), Some("ORD-9".to_string()));
}

#[test]
fn test_non_json_response_extracts_nothing() {
    init_test_env();
    let config = parse_product_config(&payment_config_json()).unwrap();
    let mut session = Session::new(config);

    let request = session.prepare_request("pay").unwrap();
    let response = apiforge::ExchangeResponse::new(502).with_body("Bad Gateway");

    assert!(session
        .apply_response("pay", request.generation, &response)
        .is_none());
    assert!(!session.pool().contains("orderId"));
}

#[test]
fn test_macros_and_array_indices_in_templates() {
    init_test_env();
    let config = parse_product_config(
        &json!({
            "layout": [
                {"type": "field", "key": "row", "default": "2"}
            ],
            "interfaces": {
                "query": {
                    "method": "GET",
                    "url": "https://api.example.com/rows[{row}]?stamp={date}",
                    "body_template": null
                }
            }
        })
        .to_string(),
    )
    .unwrap();
    let mut session = Session::new(config);

    let request = session.prepare_request("query").unwrap();

    // Row 2 (1-based) addresses index 1; {date} expands to today.
    assert!(request.url.starts_with("https://api.example.com/rows[1]?stamp="));
    assert!(!request.url.ends_with("stamp="));
    assert_eq!(request.body, serde_json::Value::Null);
    assert_eq!(request.body_text(), "");
}
