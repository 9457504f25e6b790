use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    handlers::activities,
    models::{ActivityKind, Visit, VisitStatus},
};

#[derive(Deserialize, Default)]
pub struct VisitCompletionForm {
    employee_id: Option<Uuid>,
}

/// Marks a scheduled visit as done without touching stock.
pub async fn complete_visit(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    form: Option<Json<VisitCompletionForm>>,
) -> AppResult<Json<Visit>> {
    let form = form.map(|Json(f)| f).unwrap_or_default();

    let mut tx = db.begin().await?;

    let visit = sqlx::query_as::<_, Visit>("SELECT * FROM visits WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Visit"))?;

    if visit.status == VisitStatus::Completed {
        return Ok(Json(visit));
    }

    let visit = sqlx::query_as::<_, Visit>(
        r#"
        UPDATE visits SET status = $2, completion_date = NOW(),
            assigned_employee_id = COALESCE($3, assigned_employee_id)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(VisitStatus::Completed)
    .bind(form.employee_id)
    .fetch_one(&mut *tx)
    .await?;

    let customer_name: Option<String> = sqlx::query_scalar(
        "SELECT cu.name FROM contracts c JOIN customers cu ON cu.id = c.customer_id WHERE c.id = $1",
    )
    .bind(visit.contract_id)
    .fetch_optional(&mut *tx)
    .await?;

    activities::record(
        &mut tx,
        ActivityKind::VisitCompleted,
        format!(
            "Visit on {} completed for {}",
            visit.scheduled_date,
            customer_name.as_deref().unwrap_or("unknown customer")
        ),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(visit))
}
