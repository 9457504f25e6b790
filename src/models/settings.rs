use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Settings {
    pub company_name: String,
    pub panel_name: String,
    pub admin_name: String,
    pub logo_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            company_name: "HPC - Hygiene Pest Control".to_string(),
            panel_name: "Admin Panel".to_string(),
            admin_name: "Admin".to_string(),
            logo_url: Some("/images/logo-20hpc.png".to_string()),
        }
    }
}
