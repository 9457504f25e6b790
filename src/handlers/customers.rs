use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    handlers::{activities, leads},
    models::{ActivityKind, Contract, Customer, CustomerWithContracts, NewContract, Visit, MAX_SERVICE_DATES},
    utils::validate,
};

#[derive(Deserialize)]
pub struct CustomerForm {
    name: String,
    #[serde(default)]
    contact_number: String,
    #[serde(default)]
    address: String,
    email: Option<String>,
    service_type: Option<String>,
    frequency: Option<String>,
    contract_start_date: Option<NaiveDate>,
    contract_end_date: Option<NaiveDate>,
    contract_amount: Option<Decimal>,
    gst: Option<Decimal>,
    total_amount: Option<Decimal>,
    terms: Option<String>,
    #[serde(default)]
    service_dates: Vec<NaiveDate>,
    lead_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct CustomerUpdateForm {
    name: String,
    #[serde(default)]
    contact_number: String,
    #[serde(default)]
    address: String,
    email: Option<String>,
}

pub async fn fetch_customer<'e, E>(executor: E, id: Uuid) -> Result<Option<Customer>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn insert_customer(
    conn: &mut PgConnection,
    name: &str,
    contact_number: &str,
    address: &str,
    email: Option<String>,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (name, contact_number, address, email)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(contact_number)
    .bind(address)
    .bind(email)
    .fetch_one(&mut *conn)
    .await
}

/// Writes a contract and one pending visit per service date.
pub async fn insert_contract(
    conn: &mut PgConnection,
    customer_id: Uuid,
    contract: &NewContract,
) -> Result<Contract, sqlx::Error> {
    let created = sqlx::query_as::<_, Contract>(
        r#"
        INSERT INTO contracts (
            customer_id, service_type, frequency, start_date, end_date,
            contract_value, gst, total_amount, terms
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(customer_id)
    .bind(&contract.service_type)
    .bind(&contract.frequency)
    .bind(contract.start_date)
    .bind(contract.end_date)
    .bind(contract.contract_value)
    .bind(contract.gst)
    .bind(contract.total_amount)
    .bind(&contract.terms)
    .fetch_one(&mut *conn)
    .await?;

    for date in &contract.service_dates {
        sqlx::query("INSERT INTO visits (contract_id, scheduled_date) VALUES ($1, $2)")
            .bind(created.id)
            .bind(date)
            .execute(&mut *conn)
            .await?;
    }

    Ok(created)
}

async fn load_nested(conn: &mut PgConnection, customers: Vec<Customer>) -> Result<Vec<CustomerWithContracts>, sqlx::Error> {
    let ids: Vec<Uuid> = customers.iter().map(|c| c.id).collect();

    let contracts = sqlx::query_as::<_, Contract>(
        "SELECT * FROM contracts WHERE customer_id = ANY($1) ORDER BY created_at",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let contract_ids: Vec<Uuid> = contracts.iter().map(|c| c.id).collect();
    let visits = sqlx::query_as::<_, Visit>(
        "SELECT * FROM visits WHERE contract_id = ANY($1) ORDER BY scheduled_date",
    )
    .bind(&contract_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(CustomerWithContracts::assemble(customers, contracts, visits))
}

pub async fn customers_list(State(db): State<Database>) -> AppResult<Json<Vec<CustomerWithContracts>>> {
    let mut conn = db.acquire().await?;

    let customers = sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY created_at DESC")
        .fetch_all(&mut *conn)
        .await?;

    Ok(Json(load_nested(&mut conn, customers).await?))
}

pub async fn create_customer(
    State(db): State<Database>,
    Json(form): Json<CustomerForm>,
) -> AppResult<Json<CustomerWithContracts>> {
    let name = validate::required("Name", &form.name)?;
    if form.service_dates.len() > MAX_SERVICE_DATES {
        return Err(AppError::validation(format!(
            "At most {} service dates can be scheduled",
            MAX_SERVICE_DATES
        )));
    }

    let mut contract = NewContract::with_defaults(
        form.service_type,
        form.frequency,
        form.contract_start_date,
        form.contract_end_date,
    );
    contract.contract_value = form.contract_amount.unwrap_or(Decimal::ZERO);
    contract.gst = form.gst.unwrap_or(Decimal::ZERO);
    contract.total_amount = form.total_amount.unwrap_or(Decimal::ZERO);
    contract.terms = form.terms.unwrap_or_default();
    contract.service_dates = form.service_dates;

    let mut tx = db.begin().await?;

    let lead = match form.lead_id {
        Some(lead_id) => Some(leads::lock_convertible(&mut tx, lead_id).await?),
        None => None,
    };

    let customer = insert_customer(
        &mut tx,
        &name,
        form.contact_number.trim(),
        form.address.trim(),
        validate::non_blank(form.email),
    )
    .await?;
    insert_contract(&mut tx, customer.id, &contract).await?;

    if let Some(lead) = lead {
        leads::link_to_customer(&mut tx, lead.id, customer.id).await?;
    }

    activities::record(&mut tx, ActivityKind::CustomerAdded, format!("Customer {} added", customer.name)).await?;

    let mut nested = load_nested(&mut tx, vec![customer]).await?;
    tx.commit().await?;

    nested.pop().map(Json).ok_or(AppError::NotFound("Customer"))
}

pub async fn update_customer(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(form): Json<CustomerUpdateForm>,
) -> AppResult<Json<Customer>> {
    let name = validate::required("Name", &form.name)?;

    let mut tx = db.begin().await?;

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers SET
            name = $2, contact_number = $3, address = $4, email = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&name)
    .bind(form.contact_number.trim())
    .bind(form.address.trim())
    .bind(validate::non_blank(form.email))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Customer"))?;

    activities::record(&mut tx, ActivityKind::CustomerUpdated, format!("Customer {} updated", customer.name)).await?;
    tx.commit().await?;

    Ok(Json(customer))
}

/// Deletes a customer together with its contracts and their visits, and
/// detaches any lead that was converted into it.
pub async fn delete_customer(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let mut tx = db.begin().await?;

    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    sqlx::query(
        "DELETE FROM visits WHERE contract_id IN (SELECT id FROM contracts WHERE customer_id = $1)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM contracts WHERE customer_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE leads SET converted_customer_id = NULL, status = 'NEW' WHERE converted_customer_id = $1",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    activities::record(&mut tx, ActivityKind::CustomerDeleted, format!("Customer {} deleted", customer.name)).await?;
    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::fixtures;
    use crate::models::{Lead, LeadStatus};
    use sqlx::PgPool;

    #[sqlx::test]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn delete_removes_contracts_and_frees_the_lead(pool: PgPool) {
        let lead_id: Uuid = sqlx::query_scalar("INSERT INTO leads (name, mobile) VALUES ('Kiran', '9000000000') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

        let form: CustomerForm = serde_json::from_value(json!({
            "name": "Kiran",
            "contact_number": "9000000000",
            "service_type": "Termite Control",
            "service_dates": ["2025-01-10", "2025-04-10"],
            "lead_id": lead_id
        }))
        .unwrap();
        let Json(created) = create_customer(State(pool.clone()), Json(form)).await.unwrap();
        assert_eq!(fixtures::count(&pool, "visits").await, 2);

        delete_customer(State(pool.clone()), Path(created.customer.id)).await.unwrap();

        assert_eq!(fixtures::count(&pool, "customers").await, 0);
        assert_eq!(fixtures::count(&pool, "contracts").await, 0);
        assert_eq!(fixtures::count(&pool, "visits").await, 0);
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(lead_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.converted_customer_id, None);

        let again = delete_customer(State(pool.clone()), Path(created.customer.id)).await.unwrap_err();
        assert!(matches!(again, AppError::NotFound("Customer")));
    }
}
