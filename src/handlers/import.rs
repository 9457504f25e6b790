use axum::{extract::State, response::Json};
use chrono::Utc;
use sqlx::{types::Json as SqlJson, PgConnection};

use crate::{
    database::Database,
    error::{AppError, AppResult},
    handlers::{activities, customers},
    legacy::{self, ImportPlan, ImportSummary, LegacySnapshot},
    models::{ActivityKind, ACTIVITY_LOG_LIMIT},
    stock::ledger,
    utils::hash_password,
};

async fn write_plan(conn: &mut PgConnection, plan: &ImportPlan) -> AppResult<()> {
    for e in &plan.employees {
        let password_hash = hash_password(&e.password)?;
        sqlx::query(
            r#"
            INSERT INTO employees (
                id, employee_code, name, father_name, aadhaar_number, date_of_birth,
                mobile_number, emergency_contact, address, photo_url, date_of_joining, password_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(e.id)
        .bind(&e.employee_code)
        .bind(&e.name)
        .bind(&e.father_name)
        .bind(&e.aadhaar_number)
        .bind(e.date_of_birth)
        .bind(&e.mobile_number)
        .bind(&e.emergency_contact)
        .bind(&e.address)
        .bind(&e.photo_url)
        .bind(e.date_of_joining)
        .bind(&password_hash)
        .execute(&mut *conn)
        .await?;
    }

    for p in &plan.products {
        sqlx::query(
            r#"
            INSERT INTO products (id, product_code, product_name, unit, date_of_purchase, supplier_name, remarks)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(p.id)
        .bind(&p.product_code)
        .bind(&p.product_name)
        .bind(p.unit)
        .bind(p.date_of_purchase)
        .bind(&p.supplier_name)
        .bind(&p.remarks)
        .execute(&mut *conn)
        .await?;
    }

    ledger::record(&mut *conn, &plan.movements).await?;

    for c in &plan.customers {
        sqlx::query("INSERT INTO customers (id, name, contact_number, address, email) VALUES ($1, $2, $3, $4, $5)")
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.contact_number)
            .bind(&c.address)
            .bind(&c.email)
            .execute(&mut *conn)
            .await?;

        if let Some(contract) = &c.contract {
            customers::insert_contract(&mut *conn, c.id, contract).await?;
        }
    }

    for j in &plan.jobs {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, bill_number, customer_id, customer_name, employee_id, employee_name, job_date,
                products_assigned, products_used, amount, service_type, next_service_date,
                status, remarks, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(j.id)
        .bind(&j.bill_number)
        .bind(j.customer_id)
        .bind(&j.customer_name)
        .bind(j.employee_id)
        .bind(&j.employee_name)
        .bind(j.job_date)
        .bind(SqlJson(&j.products_assigned))
        .bind(j.products_used.as_ref().map(SqlJson))
        .bind(j.amount)
        .bind(&j.service_type)
        .bind(j.next_service_date)
        .bind(j.status)
        .bind(&j.remarks)
        .bind(j.created_at)
        .execute(&mut *conn)
        .await?;
    }

    for r in &plan.returns {
        sqlx::query(
            r#"
            INSERT INTO stock_return_requests (
                employee_id, employee_name, job_id, bill_number, products_returned,
                status, requested_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(r.employee_id)
        .bind(&r.employee_name)
        .bind(r.job_id)
        .bind(&r.bill_number)
        .bind(SqlJson(&r.products_returned))
        .bind(r.status)
        .bind(r.requested_at)
        .bind(r.resolved_at)
        .execute(&mut *conn)
        .await?;
    }

    let mut history: Vec<_> = plan.activities.iter().collect();
    history.sort_by_key(|a| a.created_at);
    let keep = history.len().saturating_sub(ACTIVITY_LOG_LIMIT as usize);
    for a in &history[keep..] {
        sqlx::query("INSERT INTO activities (kind, description, created_at) VALUES ($1, $2, $3)")
            .bind(a.kind)
            .bind(&a.description)
            .bind(a.created_at)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Loads an old whole-app snapshot into an empty database.
pub async fn import_legacy(
    State(db): State<Database>,
    Json(snapshot): Json<LegacySnapshot>,
) -> AppResult<Json<ImportSummary>> {
    let mut tx = db.begin().await?;

    let populated: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM employees) OR EXISTS (SELECT 1 FROM products)",
    )
    .fetch_one(&mut *tx)
    .await?;
    if populated {
        return Err(AppError::validation(
            "Legacy import only runs against an empty database",
        ));
    }

    let plan = legacy::convert(&snapshot, Utc::now());
    for warning in &plan.warnings {
        log::warn!("Legacy import: {}", warning);
    }

    write_plan(&mut tx, &plan).await?;

    let summary = plan.summary();
    activities::record(
        &mut tx,
        ActivityKind::LegacyImported,
        format!(
            "Imported {} employees, {} products, {} customers and {} jobs from legacy data",
            summary.employees, summary.products, summary.customers, summary.jobs
        ),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(summary))
}
