use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json as SqlJson, FromRow};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    models::LeadStatus,
    stock::StockLine,
};

#[derive(Deserialize)]
pub struct ReportQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ServiceEntry {
    pub id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_contact: String,
    pub service_type: String,
    pub employee_name: String,
    #[serde(skip)]
    products: Option<SqlJson<Vec<StockLine>>>,
    #[sqlx(skip)]
    pub products_used: Vec<StockLine>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeadEntry {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    pub source: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub converted_to: Option<String>,
    pub employee_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeadStats {
    pub total: usize,
    pub converted: usize,
    pub conversion_rate: String,
    pub list: Vec<LeadEntry>,
}

impl LeadStats {
    /// A lead counts as converted when it points at a customer, whatever its
    /// status says.
    pub fn from_leads(list: Vec<LeadEntry>) -> Self {
        let total = list.len();
        let converted = list.iter().filter(|l| l.converted_to.is_some()).count();
        let rate = if total > 0 {
            converted as f64 * 100.0 / total as f64
        } else {
            0.0
        };

        Self {
            total,
            converted,
            conversion_rate: format!("{:.1}", rate),
            list,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub services: Vec<ServiceEntry>,
    pub leads: LeadStats,
}

fn parse_day(raw: Option<&str>, today: NaiveDate) -> AppResult<NaiveDate> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::validation(format!("Invalid date: {}", s))),
        None => Ok(today),
    }
}

/// Half-open window from the start of `from` up to the start of the day after
/// `to`. Missing bounds default to `today`.
pub fn report_window(
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let from = parse_day(from, today)?;
    let to = parse_day(to, today)?;

    let start = from.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    let end = to
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc());

    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AppError::validation("Invalid date range")),
    }
}

pub async fn reports(
    State(db): State<Database>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<Report>> {
    let (start, end) = report_window(query.from.as_deref(), query.to.as_deref(), Utc::now().date_naive())?;

    let mut services = sqlx::query_as::<_, ServiceEntry>(
        r#"
        SELECT
            v.id,
            v.completion_date AS date,
            cu.name AS customer_name,
            cu.address AS customer_address,
            cu.contact_number AS customer_contact,
            c.service_type,
            COALESCE(e.name, 'Unassigned') AS employee_name,
            j.products_used AS products
        FROM visits v
        JOIN contracts c ON c.id = v.contract_id
        JOIN customers cu ON cu.id = c.customer_id
        LEFT JOIN employees e ON e.id = v.assigned_employee_id
        LEFT JOIN LATERAL (
            SELECT products_used FROM jobs
            WHERE visit_id = v.id AND status = 'completed'
            ORDER BY completed_at DESC
            LIMIT 1
        ) j ON TRUE
        WHERE v.status = 'COMPLETED'
          AND v.completion_date >= $1 AND v.completion_date < $2
        ORDER BY v.completion_date DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&db)
    .await?;

    for service in &mut services {
        if let Some(SqlJson(lines)) = service.products.take() {
            service.products_used = lines.into_iter().filter(|l| !l.quantity.is_zero()).collect();
        }
    }

    let leads = sqlx::query_as::<_, LeadEntry>(
        r#"
        SELECT
            l.id, l.name, l.mobile, l.source, l.status, l.created_at,
            cu.name AS converted_to,
            e.name AS employee_name
        FROM leads l
        LEFT JOIN customers cu ON cu.id = l.converted_customer_id
        LEFT JOIN employees e ON e.id = l.followed_by_id
        WHERE l.created_at >= $1 AND l.created_at < $2
        ORDER BY l.created_at DESC
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(&db)
    .await?;

    Ok(Json(Report {
        services,
        leads: LeadStats::from_leads(leads),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(converted_to: Option<&str>) -> LeadEntry {
        LeadEntry {
            id: Uuid::new_v4(),
            name: "Meena".to_string(),
            mobile: "9123456780".to_string(),
            source: None,
            status: if converted_to.is_some() { LeadStatus::Converted } else { LeadStatus::New },
            created_at: Utc::now(),
            converted_to: converted_to.map(str::to_string),
            employee_name: None,
        }
    }

    #[test]
    fn conversion_rate_has_one_decimal() {
        let stats = LeadStats::from_leads(vec![lead(Some("Meena")), lead(None), lead(None)]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.converted, 1);
        assert_eq!(stats.conversion_rate, "33.3");

        let empty = LeadStats::from_leads(Vec::new());
        assert_eq!(empty.conversion_rate, "0.0");
    }

    #[test]
    fn window_spans_whole_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

        let (start, end) = report_window(None, None, today).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-03-14T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2025-03-15T00:00:00+00:00");

        let (start, end) = report_window(Some("2025-01-01"), Some("2025-01-31"), today).unwrap();
        assert_eq!(start.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());

        let err = report_window(Some("14/03/2025"), None, today).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date: 14/03/2025");
    }
}
