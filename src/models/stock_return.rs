use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::stock::StockLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_return_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StockReturnStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockReturnRequest {
    pub id: Uuid,
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    pub job_id: Option<Uuid>,
    pub bill_number: Option<String>,
    pub products_returned: Json<Vec<StockLine>>,
    pub status: StockReturnStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StockReturnRequest {
    pub fn is_pending(&self) -> bool {
        self.status == StockReturnStatus::Pending
    }

    /// Activity text for a resolution.
    pub fn resolution_description(&self, verb: &str) -> String {
        match &self.bill_number {
            Some(bill) => format!("Stock return {} for Job {} ({})", verb, bill, self.employee_name),
            None => format!("Manual stock return {} for {}", verb, self.employee_name),
        }
    }
}
