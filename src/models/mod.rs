pub mod activity;
pub mod customer;
pub mod employee;
pub mod job;
pub mod lead;
pub mod product;
pub mod settings;
pub mod stock_return;

pub use activity::{Activity, ActivityKind, ACTIVITY_LOG_LIMIT};
pub use customer::{Contract, Customer, CustomerWithContracts, NewContract, Visit, VisitStatus, MAX_SERVICE_DATES};
pub use employee::{Employee, EmployeeDetail, EmployeeSummary, DEFAULT_EMPLOYEE_PASSWORD};
pub use job::{Job, JobStatus};
pub use lead::{Lead, LeadStatus};
pub use product::{Product, ProductUnit, LOW_STOCK_THRESHOLD, PRODUCT_SELECT};
pub use settings::Settings;
pub use stock_return::{StockReturnRequest, StockReturnStatus};
