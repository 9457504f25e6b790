use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Products at or below this warehouse balance show up as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_unit", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductUnit {
    Litres,
    Ml,
    Kg,
    Mg,
    Pieces,
}

impl std::fmt::Display for ProductUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProductUnit::Litres => "litres",
            ProductUnit::Ml => "ml",
            ProductUnit::Kg => "kg",
            ProductUnit::Mg => "mg",
            ProductUnit::Pieces => "pieces",
        };
        f.write_str(s)
    }
}

// Balances come from the `product_balances` view joined in by every query.
// Deleted products stay in the table so their ledger history survives.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub unit: ProductUnit,
    pub date_of_purchase: Option<NaiveDate>,
    pub supplier_name: String,
    pub remarks: String,
    pub quantity_purchased: Decimal,
    pub quantity_available: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.product_code, p.product_name, p.unit, p.date_of_purchase,
           p.supplier_name, p.remarks, b.quantity_purchased, b.quantity_available,
           p.created_at, p.updated_at
    FROM products p
    JOIN product_balances b ON b.product_id = p.id
    WHERE p.deleted_at IS NULL
"#;
