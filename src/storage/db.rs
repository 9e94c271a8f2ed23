//! Работа с базой данных SQLite: пользователи, категории, расходы и
//! бюджеты из диалога "Личные финансы".

use log::{info, warn};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Result, TransactionBehavior};

/// Пул соединений с базой данных
pub type DbPool = Pool<SqliteConnectionManager>;
/// Соединение, выданное пулом
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

// ============================================================================
// МОДЕЛИ
// ============================================================================

/// Зарегистрированный пользователь
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Внутренний идентификатор (первичный ключ)
    pub id: i64,
    /// Идентификатор пользователя в Telegram
    pub telegram_id: i64,
    /// Полное имя из профиля Telegram
    pub full_name: String,
    /// Когда создана запись
    pub created_at: String,
}

/// Категория расходов, принадлежит ровно одному пользователю
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// Расход
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: f64,
    /// Дата расхода в формате YYYY-MM-DD
    pub expense_date: String,
    pub created_at: String,
}

/// Расход вместе со своей категорией, как он отдается в API
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseWithCategory {
    pub id: i64,
    pub amount: f64,
    pub expense_date: String,
    pub created_at: String,
    pub category_id: i64,
    pub category_name: String,
}

/// Строка бюджета, записанная диалогом
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSlot {
    /// Номер слота, 1..=3
    pub slot: i64,
    pub category: String,
    pub amount: f64,
}

/// Результат попытки регистрации
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    AlreadyRegistered,
}

/// Результат сохранения бюджета из диалога
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetSaveOutcome {
    Saved,
    NotRegistered,
}

// ============================================================================
// ПУЛ И СХЕМА
// ============================================================================

/// Создает пул соединений и инициализирует схему.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    match pool.get() {
        Ok(conn) => {
            if let Err(e) = migrate_schema(&conn) {
                warn!("Schema migration failed: {}", e);
            }
        }
        Err(e) => warn!("Could not get a connection for schema migration: {}", e),
    }

    Ok(pool)
}

/// Берет соединение из пула.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Накатывает схему. Вызывается при создании пула; ошибка миграции
/// логируется, но не валит запуск.
fn migrate_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL UNIQUE,
            full_name TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id),
            category_id INTEGER NOT NULL REFERENCES categories(id),
            amount REAL NOT NULL,
            expense_date TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS budgets (
            user_id INTEGER NOT NULL REFERENCES users(id),
            slot INTEGER NOT NULL CHECK (slot BETWEEN 1 AND 3),
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (user_id, slot)
        );
        CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
        CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, expense_date);",
    )?;

    // Ранние версии не хранили имя пользователя
    let mut has_full_name = false;
    {
        let mut stmt = conn.prepare("PRAGMA table_info(users)")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let column: String = row.get(1)?;
            if column == "full_name" {
                has_full_name = true;
            }
        }
    }
    if !has_full_name {
        conn.execute(
            "ALTER TABLE users ADD COLUMN full_name TEXT NOT NULL DEFAULT ''",
            [],
        )?;
        info!("Migrated users table: added full_name column");
    }

    Ok(())
}

// ============================================================================
// ПОЛЬЗОВАТЕЛИ
// ============================================================================

fn read_user_row(row: &rusqlite::Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        full_name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn fetch_user_by_telegram_id(conn: &Connection, telegram_id: i64) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, telegram_id, full_name, created_at FROM users WHERE telegram_id = ?1",
    )?;
    let mut rows = stmt.query(&[&telegram_id as &dyn rusqlite::ToSql])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_user_row(row)?)),
        None => Ok(None),
    }
}

/// Возвращает пользователя по telegram_id, если он зарегистрирован.
pub fn get_user_by_telegram_id(conn: &DbConnection, telegram_id: i64) -> Result<Option<User>> {
    fetch_user_by_telegram_id(conn, telegram_id)
}

/// Регистрирует пользователя. Повторная регистрация не ошибка:
/// возвращается AlreadyRegistered, существующая запись не меняется.
/// Проверка и вставка идут в одной immediate-транзакции, чтобы два
/// одновременных нажатия кнопки не создали дубль.
pub fn register_user(
    conn: &mut DbConnection,
    telegram_id: i64,
    full_name: &str,
) -> Result<RegistrationOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let outcome = if fetch_user_by_telegram_id(&tx, telegram_id)?.is_some() {
        RegistrationOutcome::AlreadyRegistered
    } else {
        tx.execute(
            "INSERT INTO users (telegram_id, full_name) VALUES (?1, ?2)",
            &[&telegram_id as &dyn rusqlite::ToSql, &full_name],
        )?;
        RegistrationOutcome::Created
    };
    tx.commit()?;
    Ok(outcome)
}

/// Возвращает пользователя, создавая запись при первом обращении.
/// Так регистрируются пользователи, пришедшие через мини-приложение.
pub fn ensure_user(conn: &mut DbConnection, telegram_id: i64, full_name: &str) -> Result<User> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if let Some(user) = fetch_user_by_telegram_id(&tx, telegram_id)? {
        tx.commit()?;
        return Ok(user);
    }
    tx.execute(
        "INSERT INTO users (telegram_id, full_name) VALUES (?1, ?2)",
        &[&telegram_id as &dyn rusqlite::ToSql, &full_name],
    )?;
    let user = fetch_user_by_telegram_id(&tx, telegram_id)?
        .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    tx.commit()?;
    Ok(user)
}

// ============================================================================
// КАТЕГОРИИ
// ============================================================================

/// Категории пользователя, отсортированные по имени.
pub fn list_categories(conn: &DbConnection, user_id: i64) -> Result<Vec<Category>> {
    let mut stmt =
        conn.prepare("SELECT id, user_id, name FROM categories WHERE user_id = ?1 ORDER BY name")?;
    let mut rows = stmt.query(&[&user_id as &dyn rusqlite::ToSql])?;
    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        categories.push(Category {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
        });
    }
    Ok(categories)
}

/// Создает категорию и возвращает ее с присвоенным id.
pub fn create_category(conn: &DbConnection, user_id: i64, name: &str) -> Result<Category> {
    conn.execute(
        "INSERT INTO categories (user_id, name) VALUES (?1, ?2)",
        &[&user_id as &dyn rusqlite::ToSql, &name],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        user_id,
        name: name.to_string(),
    })
}

/// Категория по id, но только если принадлежит пользователю.
pub fn get_category_owned(
    conn: &DbConnection,
    category_id: i64,
    user_id: i64,
) -> Result<Option<Category>> {
    let mut stmt =
        conn.prepare("SELECT id, user_id, name FROM categories WHERE id = ?1 AND user_id = ?2")?;
    let mut rows = stmt.query(&[&category_id as &dyn rusqlite::ToSql, &user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(Category {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
        })),
        None => Ok(None),
    }
}

// ============================================================================
// РАСХОДЫ
// ============================================================================

fn read_expense_with_category_row(row: &rusqlite::Row<'_>) -> Result<ExpenseWithCategory> {
    Ok(ExpenseWithCategory {
        id: row.get(0)?,
        amount: row.get(1)?,
        expense_date: row.get(2)?,
        created_at: row.get(3)?,
        category_id: row.get(4)?,
        category_name: row.get(5)?,
    })
}

/// Расходы пользователя с категориями, свежие даты первыми; при
/// одинаковой дате первым идет более поздний расход.
pub fn list_expenses_with_categories(
    conn: &DbConnection,
    user_id: i64,
) -> Result<Vec<ExpenseWithCategory>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.amount, e.expense_date, e.created_at, c.id, c.name
         FROM expenses e
         JOIN categories c ON c.id = e.category_id
         WHERE e.user_id = ?1
         ORDER BY e.expense_date DESC, e.id DESC",
    )?;
    let mut rows = stmt.query(&[&user_id as &dyn rusqlite::ToSql])?;
    let mut expenses = Vec::new();
    while let Some(row) = rows.next()? {
        expenses.push(read_expense_with_category_row(row)?);
    }
    Ok(expenses)
}

/// Добавляет расход и возвращает id новой записи.
pub fn insert_expense(
    conn: &DbConnection,
    user_id: i64,
    category_id: i64,
    amount: f64,
    expense_date: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO expenses (user_id, category_id, amount, expense_date) VALUES (?1, ?2, ?3, ?4)",
        &[
            &user_id as &dyn rusqlite::ToSql,
            &category_id,
            &amount,
            &expense_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Расход по id без проверки владельца. Кто им владеет, разбирается
/// вызывающий код: для удаления чужого расхода нужен другой ответ,
/// чем для отсутствующего.
pub fn get_expense(conn: &DbConnection, expense_id: i64) -> Result<Option<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category_id, amount, expense_date, created_at
         FROM expenses WHERE id = ?1",
    )?;
    let mut rows = stmt.query(&[&expense_id as &dyn rusqlite::ToSql])?;
    match rows.next()? {
        Some(row) => Ok(Some(Expense {
            id: row.get(0)?,
            user_id: row.get(1)?,
            category_id: row.get(2)?,
            amount: row.get(3)?,
            expense_date: row.get(4)?,
            created_at: row.get(5)?,
        })),
        None => Ok(None),
    }
}

/// Расход с категорией по id, только принадлежащий пользователю.
pub fn get_expense_with_category(
    conn: &DbConnection,
    expense_id: i64,
    user_id: i64,
) -> Result<Option<ExpenseWithCategory>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.amount, e.expense_date, e.created_at, c.id, c.name
         FROM expenses e
         JOIN categories c ON c.id = e.category_id
         WHERE e.id = ?1 AND e.user_id = ?2",
    )?;
    let mut rows = stmt.query(&[&expense_id as &dyn rusqlite::ToSql, &user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_expense_with_category_row(row)?)),
        None => Ok(None),
    }
}

/// Перезаписывает изменяемые поля расхода.
pub fn update_expense(
    conn: &DbConnection,
    expense_id: i64,
    category_id: i64,
    amount: f64,
    expense_date: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE expenses SET category_id = ?1, amount = ?2, expense_date = ?3 WHERE id = ?4",
        &[
            &category_id as &dyn rusqlite::ToSql,
            &amount,
            &expense_date,
            &expense_id,
        ],
    )?;
    Ok(())
}

/// Удаляет расход.
pub fn delete_expense(conn: &DbConnection, expense_id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM expenses WHERE id = ?1",
        &[&expense_id as &dyn rusqlite::ToSql],
    )?;
    Ok(())
}

// ============================================================================
// БЮДЖЕТЫ ДИАЛОГА
// ============================================================================

/// Сохраняет три строки бюджета одним апсертом в одной транзакции.
/// Пользователь должен быть зарегистрирован заранее: диалог не
/// создает учетку.
pub fn save_budget(
    conn: &mut DbConnection,
    telegram_id: i64,
    slots: &[(String, f64); 3],
) -> Result<BudgetSaveOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let Some(user) = fetch_user_by_telegram_id(&tx, telegram_id)? else {
        return Ok(BudgetSaveOutcome::NotRegistered);
    };
    for (i, (category, amount)) in slots.iter().enumerate() {
        let slot = (i + 1) as i64;
        tx.execute(
            "INSERT INTO budgets (user_id, slot, category, amount, updated_at)
             VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
             ON CONFLICT(user_id, slot) DO UPDATE SET
                 category = excluded.category,
                 amount = excluded.amount,
                 updated_at = excluded.updated_at",
            &[&user.id as &dyn rusqlite::ToSql, &slot, category, amount],
        )?;
    }
    tx.commit()?;
    Ok(BudgetSaveOutcome::Saved)
}

/// Строки бюджета пользователя по номеру слота.
pub fn get_budget(conn: &DbConnection, user_id: i64) -> Result<Vec<BudgetSlot>> {
    let mut stmt =
        conn.prepare("SELECT slot, category, amount FROM budgets WHERE user_id = ?1 ORDER BY slot")?;
    let mut rows = stmt.query(&[&user_id as &dyn rusqlite::ToSql])?;
    let mut slots = Vec::new();
    while let Some(row) = rows.next()? {
        slots.push(BudgetSlot {
            slot: row.get(0)?,
            category: row.get(1)?,
            amount: row.get(2)?,
        });
    }
    Ok(slots)
}
