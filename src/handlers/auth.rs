use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_cookies::Cookies;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    middleware::{clear_session, is_admin_logged_in, session_cookie, ADMIN_COOKIE},
    utils::{create_token, SessionRole},
};

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Checks the single admin account from the environment. Usernames are
/// compared without surrounding whitespace, passwords exactly.
pub fn check_admin_credentials(config: &Config, username: &str, password: &str) -> AppResult<()> {
    if username.trim() != config.admin_username {
        return Err(AppError::Unauthorized("Invalid username".to_string()));
    }
    if password != config.admin_password {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }
    Ok(())
}

pub async fn login(
    State(config): State<Arc<Config>>,
    cookies: Cookies,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<Value>> {
    check_admin_credentials(&config, &form.username, &form.password)?;

    let token = create_token(&config.jwt_secret, config.admin_username.clone(), SessionRole::Admin)?;
    cookies.add(session_cookie(ADMIN_COOKIE, token));
    log::info!("Admin {} logged in", config.admin_username);

    Ok(Json(json!({ "success": true })))
}

pub async fn logout(cookies: Cookies) -> Json<Value> {
    clear_session(&cookies, ADMIN_COOKIE);
    Json(json!({ "success": true }))
}

pub async fn session(State(config): State<Arc<Config>>, cookies: Cookies) -> Json<Value> {
    Json(json!({ "logged_in": is_admin_logged_in(&cookies, &config) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/pestdesk".to_string(),
            port: 3000,
            jwt_secret: "secret".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "hunter2".to_string(),
        }
    }

    #[test]
    fn admin_credentials_report_which_part_is_wrong() {
        let config = config();
        assert!(check_admin_credentials(&config, " admin ", "hunter2").is_ok());
        assert_eq!(
            check_admin_credentials(&config, "root", "hunter2").unwrap_err().to_string(),
            "Invalid username"
        );
        assert_eq!(
            check_admin_credentials(&config, "admin", "hunter").unwrap_err().to_string(),
            "Invalid password"
        );
    }
}
