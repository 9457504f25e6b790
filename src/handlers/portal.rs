//! Employee self-service: login with employee code and password, then view
//! and act on the session employee's own jobs and stock.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::{
    config::Config,
    database::Database,
    error::{AppError, AppResult},
    handlers::{jobs, stock_returns},
    middleware::{clear_session, get_current_employee, session_cookie, EMPLOYEE_COOKIE},
    models::{Employee, Job, StockReturnRequest},
    stock::{ledger, LineRequest, StockLine},
    utils::{create_token, verify_password, SessionRole},
};

#[derive(Deserialize)]
pub struct PortalLoginForm {
    employee_code: String,
    password: String,
}

#[derive(Deserialize)]
pub struct PortalReturnForm {
    job_id: Option<Uuid>,
    products: Vec<LineRequest>,
}

#[derive(Serialize)]
pub struct PortalView {
    pub employee: Employee,
    pub stock_in_hand: Vec<StockLine>,
    pub jobs: Vec<Job>,
}

async fn session_employee(cookies: &Cookies, db: &Database, config: &Config) -> AppResult<Employee> {
    get_current_employee(cookies, db, config)
        .await
        .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))
}

pub async fn login(
    State(db): State<Database>,
    State(config): State<Arc<Config>>,
    cookies: Cookies,
    Json(form): Json<PortalLoginForm>,
) -> AppResult<Json<Employee>> {
    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE employee_code = $1")
        .bind(form.employee_code.trim())
        .fetch_optional(&db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid employee ID".to_string()))?;

    if !verify_password(&form.password, &employee.password_hash)? {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let token = create_token(&config.jwt_secret, employee.id.to_string(), SessionRole::Employee)?;
    cookies.add(session_cookie(EMPLOYEE_COOKIE, token));
    log::info!("Employee {} logged in to the portal", employee.employee_code);

    Ok(Json(employee))
}

pub async fn logout(cookies: Cookies) -> Json<Value> {
    clear_session(&cookies, EMPLOYEE_COOKIE);
    Json(json!({ "success": true }))
}

pub async fn me(
    State(db): State<Database>,
    State(config): State<Arc<Config>>,
    cookies: Cookies,
) -> AppResult<Json<PortalView>> {
    let employee = session_employee(&cookies, &db, &config).await?;
    let stock_in_hand = ledger::stock_in_hand(&db, employee.id).await?;
    let jobs = jobs::list_jobs(
        &db,
        &jobs::JobFilters {
            employee_id: Some(employee.id),
            ..Default::default()
        },
    )
    .await?;

    Ok(Json(PortalView { employee, stock_in_hand, jobs }))
}

pub async fn complete_job(
    State(db): State<Database>,
    State(config): State<Arc<Config>>,
    cookies: Cookies,
    Path(id): Path<Uuid>,
    Json(form): Json<jobs::CompletionForm>,
) -> AppResult<Json<Job>> {
    let employee = session_employee(&cookies, &db, &config).await?;
    Ok(Json(jobs::complete(&db, id, &form.products_used, Some(employee.id)).await?))
}

pub async fn request_return(
    State(db): State<Database>,
    State(config): State<Arc<Config>>,
    cookies: Cookies,
    Json(form): Json<PortalReturnForm>,
) -> AppResult<Json<StockReturnRequest>> {
    let employee = session_employee(&cookies, &db, &config).await?;
    let request = stock_returns::request_return(&db, &employee, form.job_id, &form.products).await?;
    Ok(Json(request))
}
