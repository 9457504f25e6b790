use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::{Movement, ProductStock, StockLine, StockPosition};
use crate::models::ProductUnit;

#[derive(FromRow)]
struct ProductStockRow {
    id: Uuid,
    product_name: String,
    unit: ProductUnit,
    quantity_available: Decimal,
}

#[derive(FromRow)]
struct HoldingRow {
    product_id: Uuid,
    quantity: Decimal,
}

/// Takes row locks on the given products so concurrent stock operations on
/// them run one after another.
pub async fn lock_products(conn: &mut PgConnection, product_ids: &[Uuid]) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(product_ids)
        .fetch_all(conn)
        .await?;
    Ok(())
}

/// Loads the warehouse balances of `product_ids` and, when given, everything
/// the employee currently holds.
pub async fn load_position(
    conn: &mut PgConnection,
    product_ids: &[Uuid],
    employee_id: Option<Uuid>,
) -> Result<StockPosition, sqlx::Error> {
    let products = sqlx::query_as::<_, ProductStockRow>(
        r#"
        SELECT p.id, p.product_name, p.unit, b.quantity_available
        FROM products p
        JOIN product_balances b ON b.product_id = p.id
        WHERE p.id = ANY($1) AND p.deleted_at IS NULL
        "#,
    )
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut position = StockPosition::new();
    for row in products {
        position.insert_product(ProductStock {
            product_id: row.id,
            product_name: row.product_name,
            unit: row.unit,
            available: row.quantity_available,
        });
    }

    if let Some(employee_id) = employee_id {
        let holdings = sqlx::query_as::<_, HoldingRow>(
            "SELECT product_id, quantity FROM employee_holdings WHERE employee_id = $1 AND quantity > 0",
        )
        .bind(employee_id)
        .fetch_all(&mut *conn)
        .await?;

        for h in holdings {
            position.set_in_hand(h.product_id, h.quantity);
        }
    }

    Ok(position)
}

/// Appends movements to the ledger.
pub async fn record(conn: &mut PgConnection, movements: &[Movement]) -> Result<(), sqlx::Error> {
    for m in movements {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (product_id, employee_id, kind, quantity, reference)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(m.product_id)
        .bind(m.employee_id)
        .bind(m.kind)
        .bind(m.quantity)
        .bind(&m.reference)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Current stock in hand of an employee, ordered by product name.
pub async fn stock_in_hand<'e, E>(executor: E, employee_id: Uuid) -> Result<Vec<StockLine>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, (Uuid, String, ProductUnit, Decimal)>(
        r#"
        SELECT h.product_id, p.product_name, p.unit, h.quantity
        FROM employee_holdings h
        JOIN products p ON p.id = h.product_id
        WHERE h.employee_id = $1 AND h.quantity > 0
        ORDER BY p.product_name
        "#,
    )
    .bind(employee_id)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(product_id, product_name, unit, quantity)| StockLine {
            product_id,
            product_name,
            quantity,
            unit,
        })
        .collect())
}
