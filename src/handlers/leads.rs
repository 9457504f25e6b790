use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    handlers::{activities, customers},
    models::{ActivityKind, Customer, Lead, LeadStatus},
    utils::validate,
};

pub const ALREADY_CONVERTED_MESSAGE: &str = "Lead already converted";

#[derive(Deserialize)]
pub struct LeadForm {
    name: String,
    mobile: String,
    address: Option<String>,
    source: Option<String>,
    followed_by_id: Option<Uuid>,
}

/// Locks a lead for conversion. Missing leads are 404, converted ones 400.
pub async fn lock_convertible(conn: &mut PgConnection, id: Uuid) -> AppResult<Lead> {
    let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("Lead"))?;

    if lead.status == LeadStatus::Converted {
        return Err(AppError::validation(ALREADY_CONVERTED_MESSAGE));
    }
    Ok(lead)
}

pub async fn link_to_customer(conn: &mut PgConnection, lead_id: Uuid, customer_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE leads SET status = $2, converted_customer_id = $3 WHERE id = $1")
        .bind(lead_id)
        .bind(LeadStatus::Converted)
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn leads_list(State(db): State<Database>) -> AppResult<Json<Vec<Lead>>> {
    let leads = sqlx::query_as::<_, Lead>("SELECT * FROM leads ORDER BY created_at DESC")
        .fetch_all(&db)
        .await?;

    Ok(Json(leads))
}

pub async fn create_lead(
    State(db): State<Database>,
    Json(form): Json<LeadForm>,
) -> AppResult<Json<Lead>> {
    let name = validate::required("Name", &form.name)?;
    let mobile = validate::required("Mobile", &form.mobile)?;

    let mut tx = db.begin().await?;

    let lead = sqlx::query_as::<_, Lead>(
        r#"
        INSERT INTO leads (name, mobile, address, source, followed_by_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&mobile)
    .bind(validate::non_blank(form.address))
    .bind(validate::non_blank(form.source))
    .bind(form.followed_by_id)
    .fetch_one(&mut *tx)
    .await?;

    activities::record(&mut tx, ActivityKind::LeadAdded, format!("Lead {} added", lead.name)).await?;
    tx.commit().await?;

    Ok(Json(lead))
}

/// Turns a lead into a customer and links the two.
pub async fn convert_lead(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Customer>> {
    let mut tx = db.begin().await?;

    let lead = lock_convertible(&mut tx, id).await?;
    let customer = customers::insert_customer(&mut tx, &lead.name, &lead.mobile, &lead.customer_address(), None).await?;
    link_to_customer(&mut tx, lead.id, customer.id).await?;

    activities::record(
        &mut tx,
        ActivityKind::LeadConverted,
        format!("Lead {} converted to customer", lead.name),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(customer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::fixtures;
    use sqlx::PgPool;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn second_conversion_keeps_the_first_link(pool: PgPool) {
        let form = LeadForm {
            name: "Kiran".to_string(),
            mobile: "9000000000".to_string(),
            address: None,
            source: Some("Walk-in".to_string()),
            followed_by_id: None,
        };
        let Json(lead) = create_lead(State(pool.clone()), Json(form)).await.unwrap();

        let Json(customer) = convert_lead(State(pool.clone()), Path(lead.id)).await.unwrap();
        assert_eq!(customer.address, "Address Pending");

        let err = convert_lead(State(pool.clone()), Path(lead.id)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == ALREADY_CONVERTED_MESSAGE));

        let missing = convert_lead(State(pool.clone()), Path(Uuid::new_v4())).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound("Lead")));

        assert_eq!(fixtures::count(&pool, "customers").await, 1);
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(lead.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(lead.status, LeadStatus::Converted);
        assert_eq!(lead.converted_customer_id, Some(customer.id));
    }
}
