pub mod activities;
pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod employees;
pub mod import;
pub mod jobs;
pub mod leads;
pub mod portal;
pub mod products;
pub mod reports;
pub mod settings;
pub mod stock_returns;
pub mod visits;

#[cfg(test)]
mod fixtures;

pub use dashboard::dashboard;
