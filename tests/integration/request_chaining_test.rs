//! Request chaining and reactive workflow tests.
//!
//! These tests verify that values extracted from one exchange feed the next
//! request, that derived variables settle through multi-level dependency
//! chains, and that stale completions are discarded.

use apiforge::config::{parse_product_config, SqlSpec};
use apiforge::exec::{run_interface, run_sql, ExecError, HttpExecutor, SqlExecutor, SqlRow};
use apiforge::models::{ExchangeResponse, ResolvedRequest};
use apiforge::pool::Provenance;
use apiforge::session::Session;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

use super::init_test_env;

fn chained_config() -> String {
    json!({
        "layout": [
            {"type": "field", "key": "userId", "default": "42", "priority": 1},
            {"type": "field", "key": "days", "default": "3", "priority": 2},
            {"type": "formula", "key": "fee", "formula": "{days}*2", "priority": 3},
            {"type": "formula", "key": "total", "formula": "{fee}+{days}", "priority": 4},
            {"type": "interface", "key": "login", "priority": 5},
            {"type": "interface", "key": "order", "priority": 6},
            {"type": "sql", "key": "findWallet", "priority": 7}
        ],
        "interfaces": {
            "login": {
                "url": "https://api.example.com/login",
                "body_template": {"id": "{userId}"},
                "response_mapping": {"token": "data.token"}
            },
            "order": {
                "url": "https://api.example.com/order",
                "headers": {"Authorization": "Bearer {token}"},
                "body_template": {"total": "{total}"},
                "field_types": {"total": "int"},
                "response_mapping": {"orderId": "data.orderId"}
            }
        },
        "sqls": {
            "findWallet": {
                "statement": "SELECT walletNo FROM wallets WHERE user = '{userId}'",
                "outputs": ["walletNo"]
            }
        }
    })
    .to_string()
}

/// Scripted HTTP stub: pops one canned response per call and records the
/// requests it saw.
struct ScriptedHttp {
    responses: Vec<ExchangeResponse>,
    seen: Vec<ResolvedRequest>,
}

impl ScriptedHttp {
    fn new(responses: Vec<ExchangeResponse>) -> Self {
        Self {
            responses,
            seen: Vec::new(),
        }
    }
}

impl HttpExecutor for ScriptedHttp {
    fn execute(&mut self, request: &ResolvedRequest) -> Result<ExchangeResponse, ExecError> {
        self.seen.push(request.clone());
        if self.responses.is_empty() {
            return Err(ExecError::Transport("no scripted response".to_string()));
        }
        Ok(self.responses.remove(0))
    }
}

struct FixedSql {
    rows: Vec<SqlRow>,
    seen: Vec<String>,
}

impl SqlExecutor for FixedSql {
    fn query(&mut self, _spec: &SqlSpec, statement: &str) -> Result<Vec<SqlRow>, ExecError> {
        self.seen.push(statement.to_string());
        Ok(self.rows.clone())
    }
}

#[test]
fn test_token_captured_from_login_feeds_order() {
    init_test_env();
    let mut session = Session::new(parse_product_config(&chained_config()).unwrap());
    let mut http = ScriptedHttp::new(vec![
        ExchangeResponse::new(200).with_body(r#"{"data": {"token": "T-abc"}}"#),
        ExchangeResponse::new(200).with_body(r#"{"data": {"orderId": "ORD-1"}}"#),
    ]);

    run_interface(&mut session, &mut http, "login").unwrap();
    assert_eq!(session.pool().get_str("token"), Some("T-abc".to_string()));

    run_interface(&mut session, &mut http, "order").unwrap();

    let order_request = &http.seen[1];
    assert_eq!(
        order_request.headers.get("Authorization").unwrap(),
        "Bearer T-abc"
    );
    // fee = 3*2 = 6, total = 6+3 = 9, coerced to int.
    assert_eq!(order_request.body, json!({"total": 9}));
    assert_eq!(session.pool().get_str("orderId"), Some("ORD-1".to_string()));
}

#[test]
fn test_deep_dependency_chain_settles_before_send() {
    init_test_env();
    let mut session = Session::new(parse_product_config(&chained_config()).unwrap());

    session.set_field_input("days", "10");

    let request = session.prepare_request("order").unwrap();
    // fee = 20, total = 30: two levels deep from the changed field.
    assert_eq!(request.body, json!({"total": 30}));
}

#[test]
fn test_stale_completion_is_discarded() {
    init_test_env();
    let mut session = Session::new(parse_product_config(&chained_config()).unwrap());

    // Prepare two requests; the first is obsolete before its response lands.
    let first = session.prepare_request("login").unwrap();
    let second = session.prepare_request("login").unwrap();
    assert!(second.generation > first.generation);

    let stale = ExchangeResponse::new(200).with_body(r#"{"data": {"token": "OLD"}}"#);
    let fresh = ExchangeResponse::new(200).with_body(r#"{"data": {"token": "NEW"}}"#);

    assert!(session
        .apply_response("login", first.generation, &stale)
        .is_none());
    assert_eq!(
        session.apply_response("login", second.generation, &fresh),
        Some(vec!["token".to_string()])
    );
    assert_eq!(session.pool().get_str("token"), Some("NEW".to_string()));
}

#[test]
fn test_sql_output_flows_into_pool() {
    init_test_env();
    let mut session = Session::new(parse_product_config(&chained_config()).unwrap());
    let mut row = SqlRow::new();
    row.insert("walletNo".to_string(), json!("W-42"));
    row.insert("extra".to_string(), json!("dropped"));
    let mut sql = FixedSql {
        rows: vec![row],
        seen: Vec::new(),
    };

    let count = run_sql(&mut session, &mut sql, "findWallet").unwrap();

    assert_eq!(count, 1);
    assert_eq!(
        sql.seen[0],
        "SELECT walletNo FROM wallets WHERE user = '42'"
    );
    assert_eq!(session.pool().get_str("walletNo"), Some("W-42".to_string()));
    assert_eq!(
        session.pool().provenance("walletNo"),
        Some(Provenance::SqlOutput)
    );
    assert!(!session.pool().contains("extra"));
}

#[test]
fn test_observers_track_the_whole_cascade() {
    init_test_env();
    let mut session = Session::new(parse_product_config(&chained_config()).unwrap());

    let log: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    session.subscribe(move |change| {
        sink.borrow_mut().push((
            change.key.clone(),
            apiforge::pool::value_to_string(&change.new),
        ));
    });

    session.set_field_input("days", "5");

    let entries = log.borrow();
    assert!(entries.contains(&("days".to_string(), "5".to_string())));
    assert!(entries.contains(&("fee".to_string(), "10".to_string())));
    assert!(entries.contains(&("total".to_string(), "15".to_string())));
}

#[test]
fn test_product_switch_regenerates_request_id_but_keeps_payloads() {
    init_test_env();
    let mut session = Session::new(parse_product_config(&chained_config()).unwrap());
    session.set_binary_payload("signatureB64", b"sig");
    session.set_field_input("userId", "override");
    let old_id = session.request_id().to_string();

    session.reset_for_product(parse_product_config(&chained_config()).unwrap());

    assert_ne!(session.request_id(), old_id);
    assert_eq!(session.pool().get_str("userId"), Some("42".to_string()));
    let ctx = session.context();
    assert_eq!(apiforge::resolve("{signatureB64}", &ctx), "c2ln");
}
