use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

use crate::stock::StockLine;

/// Password given to employees created without one.
pub const DEFAULT_EMPLOYEE_PASSWORD: &str = "123456";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub name: String,
    pub father_name: String,
    pub aadhaar_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile_number: String,
    pub emergency_contact: String,
    pub address: String,
    pub photo_url: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Roster entry returned by `GET /api/employees`
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct EmployeeSummary {
    pub id: Uuid,
    pub name: String,
    pub employee_code: String,
}

#[derive(Debug, Serialize)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub employee: Employee,
    pub stock_in_hand: Vec<StockLine>,
}
