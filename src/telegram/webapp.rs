//! REST API мини-приложения.
//!
//! Все ручки, кроме /api/health, требуют подписанный initData в
//! заголовке X-Telegram-Init-Data. Авторизация по владельцу: трогать
//! можно только свои категории и расходы.

use crate::core::error::{AppError, AppResult};
use crate::core::validation;
use crate::storage::db::{self, DbPool};
use crate::telegram::webapp_auth;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// ============================================================================
// СТРУКТУРЫ ДАННЫХ ДЛЯ API
// ============================================================================

/// Общее состояние всех ручек
#[derive(Clone)]
pub struct WebAppState {
    pub db_pool: Arc<DbPool>,
    /// Токен бота, которым Telegram подписывает initData
    pub bot_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpensePayload {
    pub category_id: i64,
    pub amount: f64,
    /// YYYY-MM-DD; если не передана, берется сегодняшняя дата (UTC)
    pub expense_date: Option<String>,
}

/// Частичное обновление: отсутствующее поле не меняется
#[derive(Debug, Deserialize)]
pub struct ExpenseUpdatePayload {
    pub category_id: Option<i64>,
    pub amount: Option<f64>,
    pub expense_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: i64,
    pub amount: f64,
    pub expense_date: String,
    pub created_at: String,
    pub category: CategoryResponse,
}

impl From<db::ExpenseWithCategory> for ExpenseResponse {
    fn from(e: db::ExpenseWithCategory) -> Self {
        Self {
            id: e.id,
            amount: e.amount,
            expense_date: e.expense_date,
            created_at: e.created_at,
            category: CategoryResponse {
                id: e.category_id,
                name: e.category_name,
            },
        }
    }
}

// ============================================================================
// ОШИБКИ
// ============================================================================

/// Ошибка ручки, уходит клиенту как {"error": "..."}
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            ApiError::Internal(m) => {
                // Наружу внутренности не показываем
                log::error!("Internal API error: {}", m);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Validation(m) => ApiError::Unprocessable(m),
            AppError::NotFound(m) => ApiError::NotFound(m),
            AppError::Forbidden(m) => ApiError::Forbidden(m),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::from(AppError::from(e))
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(e: r2d2::Error) -> Self {
        ApiError::from(AppError::from(e))
    }
}

// ============================================================================
// АУТЕНТИФИКАЦИЯ
// ============================================================================

/// Пользователь из проверенного initData
#[derive(Debug, PartialEq)]
struct AuthenticatedUser {
    telegram_id: i64,
    full_name: String,
}

/// Проверяет подпись initData из заголовка и достает пользователя.
async fn authenticate(headers: &HeaderMap, bot_token: &str) -> Result<AuthenticatedUser, ApiError> {
    let init_data = headers
        .get("X-Telegram-Init-Data")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing X-Telegram-Init-Data header".to_string()))?;

    let user =
        webapp_auth::validate_init_data(init_data, bot_token).map_err(ApiError::Unauthorized)?;

    let telegram_id = match user.get("id") {
        Some(v) if v.is_i64() => v.as_i64().unwrap_or_default(),
        Some(_) => {
            return Err(ApiError::Forbidden("Invalid user ID in initData.".to_string()));
        }
        None => return Err(ApiError::Unauthorized("No user id in initData".to_string())),
    };

    let first_name = user.get("first_name").and_then(|v| v.as_str()).unwrap_or("");
    let last_name = user.get("last_name").and_then(|v| v.as_str()).unwrap_or("");
    let full_name = format!("{} {}", first_name, last_name).trim().to_string();

    Ok(AuthenticatedUser {
        telegram_id,
        full_name,
    })
}

// ============================================================================
// РОУТЕР И СЕРВЕР
// ============================================================================

/// Собирает роутер API.
pub fn create_webapp_router(state: WebAppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/categories", get(get_categories).post(create_category))
        .route("/api/expenses", get(get_expenses).post(create_expense))
        .route(
            "/api/expenses/{id}",
            put(update_expense).delete(delete_expense),
        )
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Запускает HTTP-сервер мини-приложения.
pub async fn run_webapp_server(state: WebAppState, port: u16) -> AppResult<()> {
    let router = create_webapp_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Web app API listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

// ============================================================================
// РУЧКИ
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/categories — категории пользователя по имени.
/// Для пользователя без учетки это пустой список, не ошибка.
async fn get_categories(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let auth = authenticate(&headers, &state.bot_token).await?;
    let conn = db::get_connection(&state.db_pool)?;

    let Some(user) = db::get_user_by_telegram_id(&conn, auth.telegram_id)? else {
        return Ok(Json(Vec::new()));
    };

    let categories = db::list_categories(&conn, user.id)?
        .into_iter()
        .map(|c| CategoryResponse {
            id: c.id,
            name: c.name,
        })
        .collect();
    Ok(Json(categories))
}

/// POST /api/categories — создает категорию. Первое обращение через
/// мини-приложение заодно создает учетку пользователя.
async fn create_category(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let auth = authenticate(&headers, &state.bot_token).await?;
    validation::validate_category_name(&payload.name)
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;

    let mut conn = db::get_connection(&state.db_pool)?;
    let user = db::ensure_user(&mut conn, auth.telegram_id, &auth.full_name)?;
    let category = db::create_category(&conn, user.id, &payload.name)?;

    log::info!(
        "User {} created category {} ({})",
        auth.telegram_id,
        category.id,
        category.name
    );
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            id: category.id,
            name: category.name,
        }),
    ))
}

/// GET /api/expenses — расходы пользователя с категориями, свежие
/// первыми.
async fn get_expenses(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let auth = authenticate(&headers, &state.bot_token).await?;
    let conn = db::get_connection(&state.db_pool)?;

    let Some(user) = db::get_user_by_telegram_id(&conn, auth.telegram_id)? else {
        return Ok(Json(Vec::new()));
    };

    let expenses = db::list_expenses_with_categories(&conn, user.id)?
        .into_iter()
        .map(ExpenseResponse::from)
        .collect();
    Ok(Json(expenses))
}

/// POST /api/expenses — добавляет расход в свою категорию.
async fn create_expense(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
    Json(payload): Json<ExpensePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let auth = authenticate(&headers, &state.bot_token).await?;
    validation::validate_expense_amount(payload.amount)
        .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    let expense_date = match payload.expense_date {
        Some(raw) => {
            validation::parse_expense_date(&raw)
                .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
            raw
        }
        None => chrono::Utc::now().format("%Y-%m-%d").to_string(),
    };

    let conn = db::get_connection(&state.db_pool)?;
    let user = db::get_user_by_telegram_id(&conn, auth.telegram_id)?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    let category = db::get_category_owned(&conn, payload.category_id, user.id)?
        .ok_or_else(|| ApiError::NotFound("Category not found or access denied.".to_string()))?;

    db::insert_expense(&conn, user.id, category.id, payload.amount, &expense_date)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Expense added successfully" })),
    ))
}

/// PUT /api/expenses/{id} — частично обновляет свой расход.
async fn update_expense(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
    Path(expense_id): Path<i64>,
    Json(payload): Json<ExpenseUpdatePayload>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let auth = authenticate(&headers, &state.bot_token).await?;

    if let Some(amount) = payload.amount {
        validation::validate_expense_amount(amount)
            .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    }
    if let Some(raw) = payload.expense_date.as_deref() {
        validation::parse_expense_date(raw).map_err(|e| ApiError::Unprocessable(e.to_string()))?;
    }

    let conn = db::get_connection(&state.db_pool)?;
    let user = db::get_user_by_telegram_id(&conn, auth.telegram_id)?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if let Some(category_id) = payload.category_id {
        db::get_category_owned(&conn, category_id, user.id)?.ok_or_else(|| {
            ApiError::NotFound("Category not found or access denied.".to_string())
        })?;
    }

    let expense = match db::get_expense(&conn, expense_id)? {
        Some(e) if e.user_id == user.id => e,
        // Чужой расход не отличается от несуществующего
        _ => {
            return Err(ApiError::NotFound(
                "Expense not found or access denied.".to_string(),
            ));
        }
    };

    let category_id = payload.category_id.unwrap_or(expense.category_id);
    let amount = payload.amount.unwrap_or(expense.amount);
    let expense_date = payload
        .expense_date
        .unwrap_or_else(|| expense.expense_date.clone());

    db::update_expense(&conn, expense.id, category_id, amount, &expense_date)?;

    let updated = db::get_expense_with_category(&conn, expense.id, user.id)?
        .ok_or_else(|| ApiError::Internal("Expense disappeared during update".to_string()))?;
    Ok(Json(updated.into()))
}

/// DELETE /api/expenses/{id} — удаляет свой расход.
/// Чужой расход здесь отличим от несуществующего: 403 против 404.
async fn delete_expense(
    State(state): State<Arc<WebAppState>>,
    headers: HeaderMap,
    Path(expense_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let auth = authenticate(&headers, &state.bot_token).await?;
    let conn = db::get_connection(&state.db_pool)?;
    let user = db::get_user_by_telegram_id(&conn, auth.telegram_id)?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    let expense = db::get_expense(&conn, expense_id)?
        .ok_or_else(|| ApiError::NotFound("Expense not found.".to_string()))?;
    if expense.user_id != user.id {
        return Err(ApiError::Forbidden(
            "Access denied: you can only delete your own expenses.".to_string(),
        ));
    }

    db::delete_expense(&conn, expense_id)?;
    log::info!("User {} deleted expense {}", auth.telegram_id, expense_id);
    Ok(StatusCode::NO_CONTENT)
}
