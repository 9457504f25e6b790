use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::stock::StockLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub bill_number: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    pub visit_id: Option<Uuid>,
    pub job_date: NaiveDate,
    pub products_assigned: Json<Vec<StockLine>>,
    pub products_used: Option<Json<Vec<StockLine>>>,
    pub amount: Option<Decimal>,
    pub service_type: Option<String>,
    pub next_service_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub remarks: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
