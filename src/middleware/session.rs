use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    config::Config,
    database::Database,
    models::Employee,
    utils::{verify_token, SessionRole, SESSION_HOURS},
};

pub const ADMIN_COOKIE: &str = "admin_session";
pub const EMPLOYEE_COOKIE: &str = "employee_session";

/// HTTP-only cookie carrying a session token.
pub fn session_cookie(name: &'static str, token: String) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::hours(SESSION_HOURS))
        .build()
}

pub fn clear_session(cookies: &Cookies, name: &'static str) {
    let mut cookie = Cookie::from(name);
    cookie.set_path("/");
    cookies.remove(cookie);
}

fn claims_for(cookies: &Cookies, name: &str, config: &Config, role: SessionRole) -> Option<String> {
    let token = cookies.get(name)?.value().to_string();
    let claims = verify_token(&config.jwt_secret, &token).ok()?;
    (claims.role == role).then_some(claims.sub)
}

/// The admin login flag. It only informs the UI; no route is gated on it.
pub fn is_admin_logged_in(cookies: &Cookies, config: &Config) -> bool {
    claims_for(cookies, ADMIN_COOKIE, config, SessionRole::Admin).is_some()
}

/// Employee behind the portal session cookie, if the token is valid and the
/// employee still exists.
pub async fn get_current_employee(cookies: &Cookies, db: &Database, config: &Config) -> Option<Employee> {
    let subject = claims_for(cookies, EMPLOYEE_COOKIE, config, SessionRole::Employee)?;
    let employee_id = Uuid::parse_str(&subject).ok()?;

    match sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(employee_id)
        .fetch_optional(db)
        .await
    {
        Ok(employee) => employee,
        Err(e) => {
            log::error!("Failed to load session employee {}: {}", employee_id, e);
            None
        }
    }
}
