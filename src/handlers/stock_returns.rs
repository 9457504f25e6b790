use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{types::Json as SqlJson, QueryBuilder};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    handlers::{activities, employees::fetch_employee},
    models::{ActivityKind, Employee, Job, StockReturnRequest, StockReturnStatus},
    stock::{ledger, LineRequest},
};

#[derive(Deserialize)]
pub struct ReturnForm {
    pub employee_id: Uuid,
    pub job_id: Option<Uuid>,
    pub products: Vec<LineRequest>,
}

#[derive(Deserialize)]
pub struct ReturnFilters {
    employee_id: Option<Uuid>,
    status: Option<StockReturnStatus>,
}

pub async fn stock_returns_list(
    State(db): State<Database>,
    Query(filters): Query<ReturnFilters>,
) -> AppResult<Json<Vec<StockReturnRequest>>> {
    let mut query = QueryBuilder::new("SELECT * FROM stock_return_requests WHERE TRUE");
    if let Some(employee_id) = filters.employee_id {
        query.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(status) = filters.status {
        query.push(" AND status = ").push_bind(status);
    }
    query.push(" ORDER BY requested_at DESC");

    let requests = query.build_query_as::<StockReturnRequest>().fetch_all(&db).await?;
    Ok(Json(requests))
}

pub async fn create_stock_return(
    State(db): State<Database>,
    Json(form): Json<ReturnForm>,
) -> AppResult<Json<StockReturnRequest>> {
    let employee = fetch_employee(&db, form.employee_id)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    Ok(Json(request_return(&db, &employee, form.job_id, &form.products).await?))
}

/// Files a pending return. Nothing moves until an admin approves it, and the
/// requested quantities are not checked against the employee's holding.
pub async fn request_return(
    db: &Database,
    employee: &Employee,
    job_id: Option<Uuid>,
    products: &[LineRequest],
) -> AppResult<StockReturnRequest> {
    let mut tx = db.begin().await?;

    let product_ids: Vec<Uuid> = products.iter().map(|l| l.product_id).collect();
    let position = ledger::load_position(&mut tx, &product_ids, None).await?;
    let lines = position.describe(products)?;

    let bill_number = match job_id {
        Some(job_id) => {
            let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Job"))?;
            if job.employee_id != Some(employee.id) {
                return Err(AppError::validation("Job is not assigned to this employee"));
            }
            Some(job.bill_number)
        }
        None => None,
    };

    let request = sqlx::query_as::<_, StockReturnRequest>(
        r#"
        INSERT INTO stock_return_requests (employee_id, employee_name, job_id, bill_number, products_returned)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(employee.id)
    .bind(&employee.name)
    .bind(job_id)
    .bind(&bill_number)
    .bind(SqlJson(&lines))
    .fetch_one(&mut *tx)
    .await?;

    let description = match &bill_number {
        Some(bill) => format!("Stock return requested for Job {} by {}", bill, employee.name),
        None => format!("Manual stock return requested by {}", employee.name),
    };
    activities::record(&mut tx, ActivityKind::StockReturnRequested, description).await?;
    tx.commit().await?;

    Ok(request)
}

async fn resolve(db: &Database, id: Uuid, approve: bool) -> AppResult<StockReturnRequest> {
    let mut tx = db.begin().await?;

    let request = sqlx::query_as::<_, StockReturnRequest>(
        "SELECT * FROM stock_return_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Stock return request"))?;

    if !request.is_pending() {
        return Ok(request);
    }

    let status = if approve {
        StockReturnStatus::Approved
    } else {
        StockReturnStatus::Rejected
    };

    let returning_employee = request.employee_id.filter(|_| approve);
    if let Some(employee_id) = returning_employee {
        sqlx::query("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await?;

        let lines = &request.products_returned.0;
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        ledger::lock_products(&mut tx, &product_ids).await?;
        let position = ledger::load_position(&mut tx, &product_ids, Some(employee_id)).await?;

        let reference = request
            .bill_number
            .clone()
            .unwrap_or_else(|| format!("RET-{}", request.id));
        let movements = position.plan_return(employee_id, &reference, lines);
        ledger::record(&mut tx, &movements).await?;
    }

    let resolved = sqlx::query_as::<_, StockReturnRequest>(
        r#"
        UPDATE stock_return_requests SET status = $2, resolved_at = $3
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    let (kind, verb) = if approve {
        (ActivityKind::StockReturnApproved, "approved")
    } else {
        (ActivityKind::StockReturnRejected, "rejected")
    };
    activities::record(&mut tx, kind, resolved.resolution_description(verb)).await?;
    tx.commit().await?;

    Ok(resolved)
}

/// Moves the requested stock back to the warehouse, capped per line at what
/// the employee still holds.
pub async fn approve_stock_return(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockReturnRequest>> {
    Ok(Json(resolve(&db, id, true).await?))
}

pub async fn reject_stock_return(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockReturnRequest>> {
    Ok(Json(resolve(&db, id, false).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::fixtures;
    use crate::stock::MovementKind;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn approval_moves_stock_once(pool: PgPool) {
        let employee_id = fixtures::employee(&pool, "EMP0001", "Suresh").await;
        let product = fixtures::product(&pool, "PRD0001", 50).await;
        fixtures::movement(&pool, product, Some(employee_id), MovementKind::Assign, 20).await;
        let employee = fetch_employee(&pool, employee_id).await.unwrap().unwrap();

        let lines = [LineRequest {
            product_id: product,
            quantity: Decimal::from(5),
        }];
        let request = request_return(&pool, &employee, None, &lines).await.unwrap();
        assert!(request.is_pending());
        assert_eq!(fixtures::available(&pool, product).await, Decimal::from(30));

        let Json(first) = approve_stock_return(State(pool.clone()), Path(request.id)).await.unwrap();
        assert_eq!(first.status, StockReturnStatus::Approved);

        let Json(second) = approve_stock_return(State(pool.clone()), Path(request.id)).await.unwrap();
        assert_eq!(second.resolved_at, first.resolved_at);
        let Json(rejected) = reject_stock_return(State(pool.clone()), Path(request.id)).await.unwrap();
        assert_eq!(rejected.status, StockReturnStatus::Approved);

        assert_eq!(fixtures::available(&pool, product).await, Decimal::from(35));
        assert_eq!(fixtures::in_hand(&pool, employee_id, product).await, Decimal::from(15));
    }
}
