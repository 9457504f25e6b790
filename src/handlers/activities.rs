use axum::{extract::State, response::Json};
use sqlx::PgConnection;

use crate::{
    database::Database,
    error::AppResult,
    models::{Activity, ActivityKind, ACTIVITY_LOG_LIMIT},
};

/// Appends an entry to the activity log and drops everything beyond the most
/// recent `ACTIVITY_LOG_LIMIT`.
pub async fn record(
    conn: &mut PgConnection,
    kind: ActivityKind,
    description: impl Into<String>,
) -> Result<(), sqlx::Error> {
    let description = description.into();
    log::info!("{:?}: {}", kind, description);

    sqlx::query("INSERT INTO activities (kind, description) VALUES ($1, $2)")
        .bind(kind)
        .bind(&description)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        DELETE FROM activities
        WHERE id NOT IN (
            SELECT id FROM activities ORDER BY created_at DESC LIMIT $1
        )
        "#,
    )
    .bind(ACTIVITY_LOG_LIMIT)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn recent(db: &Database, limit: i64) -> Result<Vec<Activity>, sqlx::Error> {
    sqlx::query_as::<_, Activity>("SELECT * FROM activities ORDER BY created_at DESC LIMIT $1")
        .bind(limit)
        .fetch_all(db)
        .await
}

pub async fn activities_list(State(db): State<Database>) -> AppResult<Json<Vec<Activity>>> {
    Ok(Json(recent(&db, ACTIVITY_LOG_LIMIT).await?))
}
