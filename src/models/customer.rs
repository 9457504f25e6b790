use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::utils::validate;

/// Upper bound on service dates scheduled with a new contract.
pub const MAX_SERVICE_DATES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub contact_number: String,
    pub address: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_type: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub contract_value: Decimal,
    pub gst: Decimal,
    pub total_amount: Decimal,
    pub terms: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "visit_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum VisitStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visit {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub status: VisitStatus,
    pub completion_date: Option<DateTime<Utc>>,
    pub assigned_employee_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ContractWithVisits {
    #[serde(flatten)]
    pub contract: Contract,
    pub visits: Vec<Visit>,
}

#[derive(Debug, Serialize)]
pub struct CustomerWithContracts {
    #[serde(flatten)]
    pub customer: Customer,
    pub contracts: Vec<ContractWithVisits>,
}

impl CustomerWithContracts {
    /// Nests contracts and visits under their customers, keeping the order
    /// of `customers`.
    pub fn assemble(customers: Vec<Customer>, contracts: Vec<Contract>, visits: Vec<Visit>) -> Vec<Self> {
        let mut contracts: Vec<ContractWithVisits> = contracts
            .into_iter()
            .map(|contract| ContractWithVisits { contract, visits: Vec::new() })
            .collect();

        for visit in visits {
            if let Some(c) = contracts.iter_mut().find(|c| c.contract.id == visit.contract_id) {
                c.visits.push(visit);
            }
        }

        customers
            .into_iter()
            .map(|customer| {
                let (mine, rest): (Vec<_>, Vec<_>) = contracts
                    .drain(..)
                    .partition(|c| c.contract.customer_id == customer.id);
                contracts = rest;
                CustomerWithContracts { customer, contracts: mine }
            })
            .collect()
    }
}

/// Contract terms as written to the store; blanks fall back to the defaults
/// the admin forms use.
#[derive(Debug, Clone)]
pub struct NewContract {
    pub service_type: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub contract_value: Decimal,
    pub gst: Decimal,
    pub total_amount: Decimal,
    pub terms: String,
    pub service_dates: Vec<NaiveDate>,
}

impl NewContract {
    pub fn with_defaults(
        service_type: Option<String>,
        frequency: Option<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        let today = Utc::now().date_naive();
        Self {
            service_type: validate::non_blank(service_type).unwrap_or_else(|| "General".to_string()),
            frequency: validate::non_blank(frequency).unwrap_or_else(|| "Once".to_string()),
            start_date: start_date.unwrap_or(today),
            end_date: end_date.unwrap_or(today),
            contract_value: Decimal::ZERO,
            gst: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            terms: String::new(),
            service_dates: Vec::new(),
        }
    }
}
