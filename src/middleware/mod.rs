pub mod session;

pub use session::{
    clear_session, get_current_employee, is_admin_logged_in, session_cookie, ADMIN_COOKIE,
    EMPLOYEE_COOKIE,
};
