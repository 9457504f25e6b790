use axum::{extract::State, response::Json};

use crate::{
    database::Database,
    error::AppResult,
    models::Settings,
    utils::validate,
};

pub async fn get_settings(State(db): State<Database>) -> AppResult<Json<Settings>> {
    let settings = sqlx::query_as::<_, Settings>(
        "SELECT company_name, panel_name, admin_name, logo_url FROM settings WHERE id = 1",
    )
    .fetch_optional(&db)
    .await?
    .unwrap_or_default();

    Ok(Json(settings))
}

pub async fn update_settings(
    State(db): State<Database>,
    Json(form): Json<Settings>,
) -> AppResult<Json<Settings>> {
    let settings = Settings {
        company_name: validate::required("Company name", &form.company_name)?,
        panel_name: validate::required("Panel name", &form.panel_name)?,
        admin_name: validate::required("Admin name", &form.admin_name)?,
        logo_url: validate::non_blank(form.logo_url),
    };

    sqlx::query(
        r#"
        INSERT INTO settings (id, company_name, panel_name, admin_name, logo_url)
        VALUES (1, $1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET
            company_name = EXCLUDED.company_name,
            panel_name = EXCLUDED.panel_name,
            admin_name = EXCLUDED.admin_name,
            logo_url = EXCLUDED.logo_url
        "#,
    )
    .bind(&settings.company_name)
    .bind(&settings.panel_name)
    .bind(&settings.admin_name)
    .bind(&settings.logo_url)
    .execute(&db)
    .await?;

    Ok(Json(settings))
}
