use axum::{extract::State, response::Json};
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppResult,
    handlers::activities,
    models::{Activity, Product, LOW_STOCK_THRESHOLD, PRODUCT_SELECT},
};

/// How many days ahead upcoming services are shown.
const UPCOMING_DAYS: u64 = 2;
const RECENT_ACTIVITY_COUNT: i64 = 10;

#[derive(Debug, Serialize, FromRow)]
pub struct Counts {
    pub employees: i64,
    pub products: i64,
    pub customers: i64,
    pub pending_jobs: i64,
    pub pending_returns: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct UpcomingService {
    pub job_id: Uuid,
    pub bill_number: String,
    pub customer_name: String,
    pub employee_name: String,
    pub service_type: Option<String>,
    pub next_service_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub counts: Counts,
    pub low_stock: Vec<Product>,
    pub upcoming_services: Vec<UpcomingService>,
    pub recent_activities: Vec<Activity>,
}

/// Inclusive date range for upcoming services.
pub fn upcoming_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let last = today.checked_add_days(Days::new(UPCOMING_DAYS)).unwrap_or(today);
    (today, last)
}

pub async fn dashboard(State(db): State<Database>) -> AppResult<Json<Dashboard>> {
    let counts = sqlx::query_as::<_, Counts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM employees) AS employees,
            (SELECT COUNT(*) FROM products WHERE deleted_at IS NULL) AS products,
            (SELECT COUNT(*) FROM customers) AS customers,
            (SELECT COUNT(*) FROM jobs WHERE status = 'pending') AS pending_jobs,
            (SELECT COUNT(*) FROM stock_return_requests WHERE status = 'pending') AS pending_returns
        "#,
    )
    .fetch_one(&db)
    .await?;

    let low_stock = sqlx::query_as::<_, Product>(&format!(
        "{} AND b.quantity_available <= $1 ORDER BY b.quantity_available, p.product_name",
        PRODUCT_SELECT
    ))
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(&db)
    .await?;

    let (first, last) = upcoming_range(Utc::now().date_naive());
    let upcoming_services = sqlx::query_as::<_, UpcomingService>(
        r#"
        SELECT id AS job_id, bill_number, customer_name, employee_name, service_type, next_service_date
        FROM jobs
        WHERE next_service_date BETWEEN $1 AND $2
        ORDER BY next_service_date, bill_number
        "#,
    )
    .bind(first)
    .bind(last)
    .fetch_all(&db)
    .await?;

    let recent_activities = activities::recent(&db, RECENT_ACTIVITY_COUNT).await?;

    Ok(Json(Dashboard {
        counts,
        low_stock,
        upcoming_services,
        recent_activities,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upcoming_range_covers_two_days_ahead() {
        let today = NaiveDate::from_ymd_opt(2025, 12, 30).unwrap();
        let (first, last) = upcoming_range(today);
        assert_eq!(first, today);
        assert_eq!(last, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }
}
