use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Only this many of the most recent activities are kept.
pub const ACTIVITY_LOG_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    EmployeeAdded,
    EmployeeUpdated,
    EmployeeDeleted,
    ProductAdded,
    ProductUpdated,
    ProductDeleted,
    CustomerAdded,
    CustomerUpdated,
    CustomerDeleted,
    LeadAdded,
    LeadConverted,
    JobAssigned,
    JobCompleted,
    VisitCompleted,
    StockReturnRequested,
    StockReturnApproved,
    StockReturnRejected,
    StockRestocked,
    LegacyImported,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
