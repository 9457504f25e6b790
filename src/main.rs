mod config;
mod database;
mod error;
mod handlers;
mod legacy;
mod middleware;
mod models;
mod stock;
mod utils;

use std::{error::Error, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Config;
use database::{create_database_pool, run_migrations, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let db = create_database_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    log::info!("Migrations applied");

    let addr = config.bind_address();
    let state = AppState {
        db,
        config: Arc::new(config),
    };
    let app = create_router(state);

    log::info!("PestDesk server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Admin session flag
        .route("/api/login", post(handlers::auth::login))
        .route("/api/logout", post(handlers::auth::logout))
        .route("/api/session", get(handlers::auth::session))
        .route(
            "/api/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/activities", get(handlers::activities::activities_list))

        // Customers and leads
        .route(
            "/api/customers",
            get(handlers::customers::customers_list).post(handlers::customers::create_customer),
        )
        .route(
            "/api/customers/:id",
            put(handlers::customers::update_customer).delete(handlers::customers::delete_customer),
        )
        .route("/api/visits/:id/complete", post(handlers::visits::complete_visit))
        .route(
            "/api/leads",
            get(handlers::leads::leads_list).post(handlers::leads::create_lead),
        )
        .route("/api/leads/:id/convert", post(handlers::leads::convert_lead))
        .route("/api/reports", get(handlers::reports::reports))

        // Employees
        .route(
            "/api/employees",
            get(handlers::employees::employees_list).post(handlers::employees::create_employee),
        )
        .route(
            "/api/employees/:id",
            get(handlers::employees::employee_detail)
                .put(handlers::employees::update_employee)
                .delete(handlers::employees::delete_employee),
        )

        // Products and stock
        .route(
            "/api/products",
            get(handlers::products::products_list).post(handlers::products::create_product),
        )
        .route(
            "/api/products/:id",
            put(handlers::products::update_product).delete(handlers::products::delete_product),
        )
        .route("/api/products/:id/restock", post(handlers::products::restock_product))
        .route(
            "/api/jobs",
            get(handlers::jobs::jobs_list).post(handlers::jobs::assign_job),
        )
        .route("/api/jobs/:id/complete", post(handlers::jobs::complete_job))
        .route(
            "/api/stock-returns",
            get(handlers::stock_returns::stock_returns_list)
                .post(handlers::stock_returns::create_stock_return),
        )
        .route(
            "/api/stock-returns/:id/approve",
            post(handlers::stock_returns::approve_stock_return),
        )
        .route(
            "/api/stock-returns/:id/reject",
            post(handlers::stock_returns::reject_stock_return),
        )

        // Employee portal
        .route("/api/portal/login", post(handlers::portal::login))
        .route("/api/portal/logout", post(handlers::portal::logout))
        .route("/api/portal/me", get(handlers::portal::me))
        .route("/api/portal/jobs/:id/complete", post(handlers::portal::complete_job))
        .route("/api/portal/returns", post(handlers::portal::request_return))

        .route("/api/import/legacy", post(handlers::import::import_legacy))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB, legacy snapshots can be large
        )
        .with_state(state)
}
