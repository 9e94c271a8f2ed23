//! Integration tests for the web mini-app REST API.
//!
//! Each test drives the real axum router with tower's `oneshot`, a
//! throwaway SQLite database and initData signed the same way the
//! Telegram client signs it.
//!
//! Run with: cargo test --test webapp_api_test

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tower::ServiceExt;

use kopilka::storage::db::{self, DbPool};
use kopilka::telegram::{WebAppState, create_webapp_router};

type HmacSha256 = Hmac<Sha256>;

const TEST_TOKEN: &str = "424242:TEST_webapp_token";
const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

// =============================================================================
// Harness
// =============================================================================

struct TestApp {
    router: Router,
    pool: Arc<DbPool>,
    _dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("webapp_test.db");
    let pool = Arc::new(db::create_pool(path.to_str().unwrap()).expect("Failed to create pool"));

    let state = WebAppState {
        db_pool: Arc::clone(&pool),
        bot_token: TEST_TOKEN.to_string(),
    };

    TestApp {
        router: create_webapp_router(state),
        pool,
        _dir: dir,
    }
}

/// Signs `key=value` pairs the way the Telegram client does: the hash
/// is the HMAC-SHA256 of the sorted unencoded lines, the query string
/// carries URL-encoded values.
fn sign_pairs(pairs: &[(&str, &str)], token: &str) -> String {
    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret = HmacSha256::new_from_slice(b"WebAppData").unwrap();
    secret.update(token.as_bytes());
    let secret_key = secret.finalize().into_bytes();
    let mut mac = HmacSha256::new_from_slice(&secret_key).unwrap();
    mac.update(data_check_string.as_bytes());
    let hash = hex::encode(mac.finalize().into_bytes());

    let mut query: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect();
    query.push(format!("hash={}", hash));
    query.join("&")
}

/// Fresh initData for the given embedded user JSON.
fn init_data_for(user_json: &str) -> String {
    let auth_date = chrono::Utc::now().timestamp().to_string();
    sign_pairs(
        &[("auth_date", auth_date.as_str()), ("user", user_json)],
        TEST_TOKEN,
    )
}

async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    init_data: Option<&str>,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(data) = init_data {
        builder = builder.header(INIT_DATA_HEADER, data);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("Body should be valid JSON")
}

/// Creates a category through the API, returns its id.
async fn create_category(app: &TestApp, init_data: &str, name: &str) -> i64 {
    let response = send(
        app,
        "POST",
        "/api/categories",
        Some(init_data),
        Some(serde_json::json!({ "name": name })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

/// Creates an expense through the API, returns the expense id from the
/// follow-up listing.
async fn create_expense(app: &TestApp, init_data: &str, category_id: i64, amount: f64) -> i64 {
    let response = send(
        app,
        "POST",
        "/api/expenses",
        Some(init_data),
        Some(serde_json::json!({ "category_id": category_id, "amount": amount })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let list = body_json(send(app, "GET", "/api/expenses", Some(init_data), None).await).await;
    list[0]["id"].as_i64().unwrap()
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_works_without_auth() {
    let app = test_app();
    let response = send(&app, "GET", "/api/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_missing_init_data_is_unauthorized() {
    let app = test_app();
    let response = send(&app, "GET", "/api/categories", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_garbage_init_data_is_unauthorized() {
    let app = test_app();
    let response = send(&app, "GET", "/api/categories", Some("not=valid&at=all"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_init_data_is_unauthorized() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let forged = init_data.replace("777", "778");
    let response = send(&app, "GET", "/api/categories", Some(&forged), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stale_init_data_is_unauthorized() {
    let app = test_app();
    let stale = (chrono::Utc::now().timestamp() - 200_000).to_string();
    let init_data = sign_pairs(
        &[
            ("auth_date", stale.as_str()),
            ("user", r#"{"id":777,"first_name":"Анна"}"#),
        ],
        TEST_TOKEN,
    );
    let response = send(&app, "GET", "/api/categories", Some(&init_data), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_integer_user_id_is_forbidden() {
    let app = test_app();
    for user_json in [r#"{"id":"abc","first_name":"X"}"#, r#"{"id":12.5}"#] {
        let init_data = init_data_for(user_json);
        let response = send(&app, "GET", "/api/categories", Some(&init_data), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await["error"],
            "Invalid user ID in initData."
        );
    }
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn test_categories_empty_for_unknown_user() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":1,"first_name":"Новый"}"#);
    let response = send(&app, "GET", "/api/categories", Some(&init_data), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_create_category_registers_user() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна","last_name":"Иванова"}"#);

    let response = send(
        &app,
        "POST",
        "/api/categories",
        Some(&init_data),
        Some(serde_json::json!({ "name": "Продукты" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["name"], "Продукты");

    // First touch through the mini-app creates the account
    let conn = app.pool.get().unwrap();
    let user = db::get_user_by_telegram_id(&conn, 777).unwrap().unwrap();
    assert_eq!(user.full_name, "Анна Иванова");
}

#[tokio::test]
async fn test_categories_sorted_by_name() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    create_category(&app, &init_data, "Транспорт").await;
    create_category(&app, &init_data, "Продукты").await;

    let list = body_json(send(&app, "GET", "/api/categories", Some(&init_data), None).await).await;
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Продукты", "Транспорт"]);
}

#[tokio::test]
async fn test_categories_isolated_between_users() {
    let app = test_app();
    let anna = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let boris = init_data_for(r#"{"id":888,"first_name":"Борис"}"#);
    create_category(&app, &anna, "Продукты").await;

    let list = body_json(send(&app, "GET", "/api/categories", Some(&boris), None).await).await;
    assert_eq!(list, serde_json::json!([]));
}

#[tokio::test]
async fn test_create_category_validates_name_length() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);

    let empty = send(
        &app,
        "POST",
        "/api/categories",
        Some(&init_data),
        Some(serde_json::json!({ "name": "" })),
    )
    .await;
    assert_eq!(empty.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(empty).await["error"],
        "Category name must not be empty"
    );

    let too_long = send(
        &app,
        "POST",
        "/api/categories",
        Some(&init_data),
        Some(serde_json::json!({ "name": "а".repeat(101) })),
    )
    .await;
    assert_eq!(too_long.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Exactly a hundred characters is still fine
    let at_limit = send(
        &app,
        "POST",
        "/api/categories",
        Some(&init_data),
        Some(serde_json::json!({ "name": "а".repeat(100) })),
    )
    .await;
    assert_eq!(at_limit.status(), StatusCode::CREATED);
}

// =============================================================================
// Expenses: create and list
// =============================================================================

#[tokio::test]
async fn test_expenses_empty_for_unknown_user() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":1,"first_name":"Новый"}"#);
    let response = send(&app, "GET", "/api/expenses", Some(&init_data), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn test_create_expense_and_list_with_category() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&init_data),
        Some(serde_json::json!({
            "category_id": category_id,
            "amount": 500.5,
            "expense_date": "2025-08-20"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await["message"],
        "Expense added successfully"
    );

    let list = body_json(send(&app, "GET", "/api/expenses", Some(&init_data), None).await).await;
    let expenses = list.as_array().unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0]["amount"], 500.5);
    assert_eq!(expenses[0]["expense_date"], "2025-08-20");
    assert_eq!(expenses[0]["category"]["id"], category_id);
    assert_eq!(expenses[0]["category"]["name"], "Продукты");
}

#[tokio::test]
async fn test_expenses_ordered_newest_first() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;

    for (amount, date) in [
        (10.0, "2025-08-01"),
        (20.0, "2025-08-15"),
        (30.0, "2025-08-15"),
    ] {
        let response = send(
            &app,
            "POST",
            "/api/expenses",
            Some(&init_data),
            Some(serde_json::json!({
                "category_id": category_id,
                "amount": amount,
                "expense_date": date
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Newest date first; within the same date the later insert wins
    let first = body_json(send(&app, "GET", "/api/expenses", Some(&init_data), None).await).await;
    let amounts: Vec<f64> = first
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["amount"].as_f64().unwrap())
        .collect();
    assert_eq!(amounts, vec![30.0, 20.0, 10.0]);

    let second = body_json(send(&app, "GET", "/api/expenses", Some(&init_data), None).await).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_create_expense_date_defaults_to_today() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Кафе").await;

    let before = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&init_data),
        Some(serde_json::json!({ "category_id": category_id, "amount": 120.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let after = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let list = body_json(send(&app, "GET", "/api/expenses", Some(&init_data), None).await).await;
    let date = list[0]["expense_date"].as_str().unwrap();
    // The day may roll over between the request and the check
    assert!(date == before || date == after, "unexpected date: {}", date);
}

#[tokio::test]
async fn test_create_expense_rejects_non_positive_amount() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;

    for amount in [0.0, -5.0] {
        let response = send(
            &app,
            "POST",
            "/api/expenses",
            Some(&init_data),
            Some(serde_json::json!({ "category_id": category_id, "amount": amount })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["error"],
            "Amount must be greater than 0"
        );
    }
}

#[tokio::test]
async fn test_create_expense_rejects_bad_date() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&init_data),
        Some(serde_json::json!({
            "category_id": category_id,
            "amount": 10.0,
            "expense_date": "21.08.2025"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body_json(response).await["error"],
        "Invalid expense_date, expected YYYY-MM-DD"
    );
}

#[tokio::test]
async fn test_create_expense_unknown_category_is_not_found() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    create_category(&app, &init_data, "Продукты").await;

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&init_data),
        Some(serde_json::json!({ "category_id": 9999, "amount": 10.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Category not found or access denied."
    );
}

#[tokio::test]
async fn test_create_expense_foreign_category_is_not_found() {
    let app = test_app();
    let anna = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let boris = init_data_for(r#"{"id":888,"first_name":"Борис"}"#);
    let annas_category = create_category(&app, &anna, "Продукты").await;
    create_category(&app, &boris, "Такси").await;

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&boris),
        Some(serde_json::json!({ "category_id": annas_category, "amount": 10.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Category not found or access denied."
    );
}

#[tokio::test]
async fn test_create_expense_unregistered_user_is_not_found() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":555,"first_name":"Гость"}"#);

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&init_data),
        Some(serde_json::json!({ "category_id": 1, "amount": 10.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "User not found.");
}

// =============================================================================
// Expenses: update and delete
// =============================================================================

#[tokio::test]
async fn test_update_expense_partially() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(&init_data),
        Some(serde_json::json!({
            "category_id": category_id,
            "amount": 100.0,
            "expense_date": "2025-08-10"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let list = body_json(send(&app, "GET", "/api/expenses", Some(&init_data), None).await).await;
    let expense_id = list[0]["id"].as_i64().unwrap();

    // Only the amount changes; date and category stay as they were
    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", expense_id),
        Some(&init_data),
        Some(serde_json::json!({ "amount": 777.25 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["amount"], 777.25);
    assert_eq!(body["expense_date"], "2025-08-10");
    assert_eq!(body["category"]["id"], category_id);
}

#[tokio::test]
async fn test_update_expense_can_move_category() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let groceries = create_category(&app, &init_data, "Продукты").await;
    let taxi = create_category(&app, &init_data, "Такси").await;
    let expense_id = create_expense(&app, &init_data, groceries, 50.0).await;

    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", expense_id),
        Some(&init_data),
        Some(serde_json::json!({ "category_id": taxi })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["category"]["id"], taxi);
    assert_eq!(body["category"]["name"], "Такси");
    assert_eq!(body["amount"], 50.0);
}

#[tokio::test]
async fn test_update_foreign_expense_is_not_found() {
    let app = test_app();
    let anna = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let boris = init_data_for(r#"{"id":888,"first_name":"Борис"}"#);
    let annas_category = create_category(&app, &anna, "Продукты").await;
    create_category(&app, &boris, "Такси").await;
    let annas_expense = create_expense(&app, &anna, annas_category, 50.0).await;

    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", annas_expense),
        Some(&boris),
        Some(serde_json::json!({ "amount": 1.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Expense not found or access denied."
    );
}

#[tokio::test]
async fn test_update_missing_expense_is_not_found() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    create_category(&app, &init_data, "Продукты").await;

    let response = send(
        &app,
        "PUT",
        "/api/expenses/424242",
        Some(&init_data),
        Some(serde_json::json!({ "amount": 1.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_expense_rejects_bad_amount() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;
    let expense_id = create_expense(&app, &init_data, category_id, 50.0).await;

    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", expense_id),
        Some(&init_data),
        Some(serde_json::json!({ "amount": -1.0 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_delete_expense_returns_no_content() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let category_id = create_category(&app, &init_data, "Продукты").await;
    let expense_id = create_expense(&app, &init_data, category_id, 50.0).await;

    let response = send(
        &app,
        "DELETE",
        &format!("/api/expenses/{}", expense_id),
        Some(&init_data),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let list = body_json(send(&app, "GET", "/api/expenses", Some(&init_data), None).await).await;
    assert_eq!(list, serde_json::json!([]));
}

#[tokio::test]
async fn test_delete_missing_expense_is_not_found() {
    let app = test_app();
    let init_data = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    create_category(&app, &init_data, "Продукты").await;

    let response = send(&app, "DELETE", "/api/expenses/424242", Some(&init_data), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Expense not found.");
}

#[tokio::test]
async fn test_delete_foreign_expense_is_forbidden() {
    let app = test_app();
    let anna = init_data_for(r#"{"id":777,"first_name":"Анна"}"#);
    let boris = init_data_for(r#"{"id":888,"first_name":"Борис"}"#);
    let annas_category = create_category(&app, &anna, "Продукты").await;
    create_category(&app, &boris, "Такси").await;
    let annas_expense = create_expense(&app, &anna, annas_category, 50.0).await;

    let response = send(
        &app,
        "DELETE",
        &format!("/api/expenses/{}", annas_expense),
        Some(&boris),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Access denied: you can only delete your own expenses."
    );

    // The expense stays untouched for its owner
    let list = body_json(send(&app, "GET", "/api/expenses", Some(&anna), None).await).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"].as_i64().unwrap(), annas_expense);
}
