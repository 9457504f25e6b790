//! Rows shared by the database-backed handler tests.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::stock::{Movement, MovementKind};

pub async fn employee(pool: &PgPool, code: &str, name: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO employees (employee_code, name, password_hash) VALUES ($1, $2, 'x') RETURNING id",
    )
    .bind(code)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn customer(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO customers (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A product with an opening purchase of `purchased`.
pub async fn product(pool: &PgPool, code: &str, purchased: i64) -> Uuid {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO products (product_code, product_name, unit) VALUES ($1, 'Cypermethrin', 'litres') RETURNING id",
    )
    .bind(code)
    .fetch_one(pool)
    .await
    .unwrap();

    movement(pool, id, None, MovementKind::Purchase, purchased).await;
    id
}

pub async fn movement(pool: &PgPool, product_id: Uuid, employee_id: Option<Uuid>, kind: MovementKind, quantity: i64) {
    let mut conn = pool.acquire().await.unwrap();
    crate::stock::ledger::record(
        &mut *conn,
        &[Movement {
            product_id,
            employee_id,
            kind,
            quantity: Decimal::from(quantity),
            reference: None,
        }],
    )
    .await
    .unwrap();
}

pub async fn available(pool: &PgPool, product_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT quantity_available FROM product_balances WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn in_hand(pool: &PgPool, employee_id: Uuid, product_id: Uuid) -> Decimal {
    sqlx::query_scalar::<_, Decimal>(
        "SELECT quantity FROM employee_holdings WHERE employee_id = $1 AND product_id = $2",
    )
    .bind(employee_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await
    .unwrap()
    .unwrap_or(Decimal::ZERO)
}

pub async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
