use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{unique_violation, AppError, AppResult},
    handlers::activities,
    models::{ActivityKind, Product, ProductUnit, PRODUCT_SELECT},
    stock::{self, ledger, Movement, MovementKind},
    utils::{next_code, validate},
};

#[derive(Deserialize)]
pub struct ProductForm {
    product_code: Option<String>,
    product_name: String,
    unit: ProductUnit,
    date_of_purchase: Option<NaiveDate>,
    quantity_purchased: Decimal,
    #[serde(default)]
    supplier_name: String,
    #[serde(default)]
    remarks: String,
}

#[derive(Deserialize)]
pub struct ProductUpdateForm {
    product_name: String,
    unit: ProductUnit,
    date_of_purchase: Option<NaiveDate>,
    #[serde(default)]
    supplier_name: String,
    #[serde(default)]
    remarks: String,
}

#[derive(Deserialize)]
pub struct RestockForm {
    quantity: Decimal,
}

pub async fn fetch_product(conn: &mut PgConnection, id: Uuid) -> Result<Option<Product>, sqlx::Error> {
    let sql = format!("{} AND p.id = $1", PRODUCT_SELECT);
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn products_list(State(db): State<Database>) -> AppResult<Json<Vec<Product>>> {
    let products = sqlx::query_as::<_, Product>(&format!("{} ORDER BY p.product_code", PRODUCT_SELECT))
        .fetch_all(&db)
        .await?;

    Ok(Json(products))
}

pub async fn create_product(
    State(db): State<Database>,
    Json(form): Json<ProductForm>,
) -> AppResult<Json<Product>> {
    let product_name = validate::required("Product name", &form.product_name)?;
    if form.quantity_purchased < Decimal::ZERO {
        return Err(AppError::validation("Quantity purchased cannot be negative"));
    }
    stock::check_scale(form.quantity_purchased)?;

    let mut tx = db.begin().await?;

    let product_code = match validate::non_blank(form.product_code) {
        Some(code) => code,
        None => {
            let codes: Vec<String> = sqlx::query_scalar("SELECT product_code FROM products")
                .fetch_all(&mut *tx)
                .await?;
            next_code("PRD", codes.iter().map(String::as_str))
        }
    };

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO products (product_code, product_name, unit, date_of_purchase, supplier_name, remarks)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&product_code)
    .bind(&product_name)
    .bind(form.unit)
    .bind(form.date_of_purchase)
    .bind(form.supplier_name.trim())
    .bind(form.remarks.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| unique_violation(e, "Product ID already exists"))?;

    if form.quantity_purchased > Decimal::ZERO {
        ledger::record(
            &mut tx,
            &[Movement {
                product_id: id,
                employee_id: None,
                kind: MovementKind::Purchase,
                quantity: form.quantity_purchased,
                reference: None,
            }],
        )
        .await?;
    }

    activities::record(
        &mut tx,
        ActivityKind::ProductAdded,
        format!(
            "Product {} ({}) added with {} {}",
            product_name, product_code, form.quantity_purchased, form.unit
        ),
    )
    .await?;

    let product = fetch_product(&mut tx, id).await?.ok_or(AppError::NotFound("Product"))?;
    tx.commit().await?;

    Ok(Json(product))
}

pub async fn update_product(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(form): Json<ProductUpdateForm>,
) -> AppResult<Json<Product>> {
    let product_name = validate::required("Product name", &form.product_name)?;

    let mut tx = db.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE products SET
            product_name = $2, unit = $3, date_of_purchase = $4,
            supplier_name = $5, remarks = $6, updated_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .bind(&product_name)
    .bind(form.unit)
    .bind(form.date_of_purchase)
    .bind(form.supplier_name.trim())
    .bind(form.remarks.trim())
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Product"));
    }

    let product = fetch_product(&mut tx, id).await?.ok_or(AppError::NotFound("Product"))?;
    activities::record(
        &mut tx,
        ActivityKind::ProductUpdated,
        format!("Product {} ({}) updated", product.product_name, product.product_code),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let mut tx = db.begin().await?;

    ledger::lock_products(&mut tx, &[id]).await?;
    let product = fetch_product(&mut tx, id).await?.ok_or(AppError::NotFound("Product"))?;

    let held: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM employee_holdings WHERE product_id = $1 AND quantity > 0)",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if held {
        return Err(AppError::validation(
            "Product is still held by employees. Approve their returns first.",
        ));
    }

    sqlx::query("UPDATE products SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    activities::record(
        &mut tx,
        ActivityKind::ProductDeleted,
        format!("Product {} ({}) deleted", product.product_name, product.product_code),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn restock_product(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(form): Json<RestockForm>,
) -> AppResult<Json<Product>> {
    let movement = stock::plan_restock(id, form.quantity)?;

    let mut tx = db.begin().await?;
    ledger::lock_products(&mut tx, &[id]).await?;

    if fetch_product(&mut tx, id).await?.is_none() {
        return Err(AppError::NotFound("Product"));
    }

    ledger::record(&mut tx, &[movement]).await?;

    let product = fetch_product(&mut tx, id).await?.ok_or(AppError::NotFound("Product"))?;
    activities::record(
        &mut tx,
        ActivityKind::StockRestocked,
        format!(
            "Restocked {} (+{} {}). New Balance: {} {}",
            product.product_name, form.quantity, product.unit, product.quantity_available, product.unit
        ),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::fixtures;
    use sqlx::PgPool;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn delete_keeps_the_ledger(pool: PgPool) {
        let employee = fixtures::employee(&pool, "EMP0001", "Suresh").await;
        let product = fixtures::product(&pool, "PRD0001", 50).await;
        fixtures::movement(&pool, product, Some(employee), MovementKind::Assign, 5).await;

        let err = delete_product(State(pool.clone()), Path(product)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        fixtures::movement(&pool, product, Some(employee), MovementKind::Return, 5).await;
        delete_product(State(pool.clone()), Path(product)).await.unwrap();

        let Json(listed) = products_list(State(pool.clone())).await.unwrap();
        assert!(listed.is_empty());
        assert_eq!(fixtures::count(&pool, "stock_movements").await, 3);

        let again = restock_product(State(pool.clone()), Path(product), Json(RestockForm { quantity: Decimal::ONE }))
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::NotFound("Product")));
    }
}
