use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{types::Json as SqlJson, PgConnection, QueryBuilder};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{unique_violation, AppError, AppResult},
    handlers::{activities, customers::fetch_customer},
    models::{ActivityKind, Employee, Job, JobStatus},
    stock::{self, ledger, LineRequest, StockError},
    utils::validate,
};

pub const DUPLICATE_BILL_MESSAGE: &str =
    "This bill number already exists. Please enter a unique bill number.";

#[derive(Deserialize)]
pub struct JobForm {
    pub bill_number: String,
    pub customer_id: Uuid,
    pub employee_id: Uuid,
    pub job_date: Option<NaiveDate>,
    pub products: Vec<LineRequest>,
    pub amount: Option<Decimal>,
    pub service_type: Option<String>,
    pub next_service_date: Option<NaiveDate>,
    #[serde(default)]
    pub remarks: String,
    pub visit_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CompletionForm {
    pub products_used: Vec<LineRequest>,
}

#[derive(Deserialize, Default)]
pub struct JobFilters {
    pub employee_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub status: Option<JobStatus>,
}

pub async fn jobs_list(
    State(db): State<Database>,
    Query(filters): Query<JobFilters>,
) -> AppResult<Json<Vec<Job>>> {
    let jobs = list_jobs(&db, &filters).await?;
    Ok(Json(jobs))
}

pub async fn list_jobs(db: &Database, filters: &JobFilters) -> Result<Vec<Job>, sqlx::Error> {
    let mut query = QueryBuilder::new("SELECT * FROM jobs WHERE TRUE");
    if let Some(employee_id) = filters.employee_id {
        query.push(" AND employee_id = ").push_bind(employee_id);
    }
    // A customer's service history.
    if let Some(customer_id) = filters.customer_id {
        query.push(" AND customer_id = ").push_bind(customer_id);
    }
    if let Some(status) = filters.status {
        query.push(" AND status = ").push_bind(status);
    }
    query.push(" ORDER BY created_at DESC");

    query.build_query_as::<Job>().fetch_all(db).await
}

pub async fn assign_job(
    State(db): State<Database>,
    Json(form): Json<JobForm>,
) -> AppResult<Json<Job>> {
    Ok(Json(assign(&db, form).await?))
}

pub async fn complete_job(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(form): Json<CompletionForm>,
) -> AppResult<Json<Job>> {
    Ok(Json(complete(&db, id, &form.products_used, None).await?))
}

async fn lock_employee(conn: &mut PgConnection, id: Uuid) -> AppResult<Employee> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Employee"))
}

/// Creates a pending job and hands its stock to the employee. Either every
/// line fits and everything is written, or nothing is.
pub async fn assign(db: &Database, form: JobForm) -> AppResult<Job> {
    let bill_number = validate::required("Bill number", &form.bill_number)?;
    if form.products.is_empty() {
        return Err(StockError::NoLines.into());
    }

    let mut tx = db.begin().await?;

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM jobs WHERE LOWER(bill_number) = LOWER($1))",
    )
    .bind(&bill_number)
    .fetch_one(&mut *tx)
    .await?;
    if taken {
        return Err(AppError::validation(DUPLICATE_BILL_MESSAGE));
    }

    let employee = lock_employee(&mut tx, form.employee_id).await?;
    let customer = fetch_customer(&mut *tx, form.customer_id)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    if let Some(visit_id) = form.visit_id {
        let owner: Option<Uuid> = sqlx::query_scalar(
            "SELECT c.customer_id FROM visits v JOIN contracts c ON c.id = v.contract_id WHERE v.id = $1",
        )
        .bind(visit_id)
        .fetch_optional(&mut *tx)
        .await?;
        match owner {
            None => return Err(AppError::NotFound("Visit")),
            Some(owner) if owner != customer.id => {
                return Err(AppError::validation("Visit does not belong to this customer"))
            }
            Some(_) => {}
        }
    }

    let product_ids: Vec<Uuid> = form.products.iter().map(|l| l.product_id).collect();
    ledger::lock_products(&mut tx, &product_ids).await?;
    let position = ledger::load_position(&mut tx, &product_ids, Some(employee.id)).await?;
    let plan = position.plan_assignment(employee.id, &bill_number, &form.products)?;

    let job = sqlx::query_as::<_, Job>(
        r#"
        INSERT INTO jobs (
            bill_number, customer_id, customer_name, employee_id, employee_name, visit_id,
            job_date, products_assigned, amount, service_type, next_service_date, remarks
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&bill_number)
    .bind(customer.id)
    .bind(&customer.name)
    .bind(employee.id)
    .bind(&employee.name)
    .bind(form.visit_id)
    .bind(form.job_date.unwrap_or_else(|| Utc::now().date_naive()))
    .bind(SqlJson(&plan.lines))
    .bind(form.amount)
    .bind(validate::non_blank(form.service_type))
    .bind(form.next_service_date)
    .bind(form.remarks.trim())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| unique_violation(e, DUPLICATE_BILL_MESSAGE))?;

    ledger::record(&mut tx, &plan.movements).await?;

    activities::record(
        &mut tx,
        ActivityKind::JobAssigned,
        format!(
            "Job {} assigned to {} for customer {}",
            job.bill_number, employee.name, customer.name
        ),
    )
    .await?;
    tx.commit().await?;

    Ok(job)
}

/// Completes a job, recording what was used. The unused remainder stays with
/// the employee until they file a return request.
///
/// With `acting_employee` set, jobs belonging to anyone else are reported as
/// missing. Completing an already completed job returns it unchanged.
pub async fn complete(
    db: &Database,
    job_id: Uuid,
    used: &[LineRequest],
    acting_employee: Option<Uuid>,
) -> AppResult<Job> {
    let mut tx = db.begin().await?;

    let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 FOR UPDATE")
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Job"))?;

    if acting_employee.is_some() && job.employee_id != acting_employee {
        return Err(AppError::NotFound("Job"));
    }
    if job.is_completed() {
        return Ok(job);
    }

    let used_lines = stock::validate_usage(&job.products_assigned.0, used)?;

    if let Some(employee_id) = job.employee_id {
        let product_ids: Vec<Uuid> = used_lines.iter().map(|l| l.product_id).collect();
        lock_employee(&mut tx, employee_id).await?;
        ledger::lock_products(&mut tx, &product_ids).await?;
        let position = ledger::load_position(&mut tx, &product_ids, Some(employee_id)).await?;
        let movements = position.plan_consumption(employee_id, &job.bill_number, &used_lines);
        ledger::record(&mut tx, &movements).await?;
    }

    let completed = sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs SET status = $2, products_used = $3, completed_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(job.id)
    .bind(JobStatus::Completed)
    .bind(SqlJson(&used_lines))
    .fetch_one(&mut *tx)
    .await?;

    if let Some(visit_id) = completed.visit_id {
        sqlx::query(
            r#"
            UPDATE visits SET status = 'COMPLETED', completion_date = NOW(),
                assigned_employee_id = COALESCE($2, assigned_employee_id)
            WHERE id = $1
            "#,
        )
        .bind(visit_id)
        .bind(completed.employee_id)
        .execute(&mut *tx)
        .await?;
    }

    activities::record(
        &mut tx,
        ActivityKind::JobCompleted,
        format!("Job {} completed by {}", completed.bill_number, completed.employee_name),
    )
    .await?;
    tx.commit().await?;

    Ok(completed)
}
