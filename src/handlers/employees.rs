use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{unique_violation, AppError, AppResult},
    handlers::activities,
    models::{ActivityKind, Employee, EmployeeDetail, EmployeeSummary, DEFAULT_EMPLOYEE_PASSWORD},
    stock::ledger,
    utils::{hash_password, next_code, validate},
};

#[derive(Deserialize)]
pub struct EmployeeForm {
    employee_code: Option<String>,
    name: String,
    #[serde(default)]
    father_name: String,
    #[serde(default)]
    aadhaar_number: String,
    date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    mobile_number: String,
    #[serde(default)]
    emergency_contact: String,
    #[serde(default)]
    address: String,
    photo_url: Option<String>,
    date_of_joining: Option<NaiveDate>,
    password: Option<String>,
}

impl EmployeeForm {
    fn validate(&self) -> AppResult<String> {
        let name = validate::required("Name", &self.name)?;

        let aadhaar = self.aadhaar_number.trim();
        if !aadhaar.is_empty() && !validate::is_valid_aadhaar(aadhaar) {
            return Err(AppError::validation("Aadhaar number must be exactly 12 digits"));
        }
        let mobile = self.mobile_number.trim();
        if !mobile.is_empty() && !validate::is_valid_mobile(mobile) {
            return Err(AppError::validation("Mobile number must be exactly 10 digits"));
        }
        let emergency = self.emergency_contact.trim();
        if !emergency.is_empty() && !validate::is_valid_mobile(emergency) {
            return Err(AppError::validation("Emergency contact must be exactly 10 digits"));
        }

        Ok(name)
    }
}

pub async fn fetch_employee<'e, E>(executor: E, id: Uuid) -> Result<Option<Employee>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn employees_list(State(db): State<Database>) -> AppResult<Json<Vec<EmployeeSummary>>> {
    let employees = sqlx::query_as::<_, EmployeeSummary>(
        "SELECT id, name, employee_code FROM employees ORDER BY name",
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(employees))
}

pub async fn employee_detail(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EmployeeDetail>> {
    let employee = fetch_employee(&db, id).await?.ok_or(AppError::NotFound("Employee"))?;
    let stock_in_hand = ledger::stock_in_hand(&db, id).await?;

    Ok(Json(EmployeeDetail { employee, stock_in_hand }))
}

pub async fn create_employee(
    State(db): State<Database>,
    Json(form): Json<EmployeeForm>,
) -> AppResult<Json<Employee>> {
    let name = form.validate()?;
    let password = validate::non_blank(form.password.clone())
        .unwrap_or_else(|| DEFAULT_EMPLOYEE_PASSWORD.to_string());
    let password_hash = hash_password(&password)?;

    let mut tx = db.begin().await?;

    let employee_code = match validate::non_blank(form.employee_code.clone()) {
        Some(code) => code,
        None => {
            let codes: Vec<String> = sqlx::query_scalar("SELECT employee_code FROM employees")
                .fetch_all(&mut *tx)
                .await?;
            next_code("EMP", codes.iter().map(String::as_str))
        }
    };

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees (
            employee_code, name, father_name, aadhaar_number, date_of_birth, mobile_number,
            emergency_contact, address, photo_url, date_of_joining, password_hash
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(&employee_code)
    .bind(&name)
    .bind(form.father_name.trim())
    .bind(form.aadhaar_number.trim())
    .bind(form.date_of_birth)
    .bind(form.mobile_number.trim())
    .bind(form.emergency_contact.trim())
    .bind(form.address.trim())
    .bind(validate::non_blank(form.photo_url))
    .bind(form.date_of_joining)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| unique_violation(e, "Employee ID already exists"))?;

    activities::record(
        &mut tx,
        ActivityKind::EmployeeAdded,
        format!("Employee {} ({}) added", employee.name, employee.employee_code),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(employee))
}

pub async fn update_employee(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(form): Json<EmployeeForm>,
) -> AppResult<Json<Employee>> {
    let name = form.validate()?;
    let password_hash = match validate::non_blank(form.password.clone()) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let mut tx = db.begin().await?;

    let existing = fetch_employee(&mut *tx, id).await?.ok_or(AppError::NotFound("Employee"))?;
    let employee_code = validate::non_blank(form.employee_code.clone()).unwrap_or(existing.employee_code);

    let employee = sqlx::query_as::<_, Employee>(
        r#"
        UPDATE employees SET
            employee_code = $2, name = $3, father_name = $4, aadhaar_number = $5,
            date_of_birth = $6, mobile_number = $7, emergency_contact = $8, address = $9,
            photo_url = $10, date_of_joining = $11,
            password_hash = COALESCE($12, password_hash), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&employee_code)
    .bind(&name)
    .bind(form.father_name.trim())
    .bind(form.aadhaar_number.trim())
    .bind(form.date_of_birth)
    .bind(form.mobile_number.trim())
    .bind(form.emergency_contact.trim())
    .bind(form.address.trim())
    .bind(validate::non_blank(form.photo_url))
    .bind(form.date_of_joining)
    .bind(password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| unique_violation(e, "Employee ID already exists"))?;

    activities::record(
        &mut tx,
        ActivityKind::EmployeeUpdated,
        format!("Employee {} ({}) updated", employee.name, employee.employee_code),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(employee))
}

pub async fn delete_employee(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let mut tx = db.begin().await?;

    let employee = fetch_employee(&mut *tx, id).await?.ok_or(AppError::NotFound("Employee"))?;

    sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    activities::record(
        &mut tx,
        ActivityKind::EmployeeDeleted,
        format!("Employee {} ({}) deleted", employee.name, employee.employee_code),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}
