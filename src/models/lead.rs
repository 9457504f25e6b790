use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "lead_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub address: Option<String>,
    pub source: Option<String>,
    pub followed_by_id: Option<Uuid>,
    pub status: LeadStatus,
    pub converted_customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Address used for the customer created from this lead.
    pub fn customer_address(&self) -> String {
        match self.address.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => "Address Pending".to_string(),
        }
    }
}
