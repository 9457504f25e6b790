//! One-shot migration of the old single-document store.
//!
//! The old application kept everything in one JSON blob with camelCase keys,
//! flat contract fields on customers and a stored `stockInHand` list per
//! employee. `convert` turns such a blob into rows for the normalized schema
//! plus the opening ledger movements that reproduce every stored balance. It
//! does no I/O; the import handler persists the plan in one transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{ActivityKind, JobStatus, NewContract, ProductUnit, StockReturnStatus, DEFAULT_EMPLOYEE_PASSWORD, MAX_SERVICE_DATES},
    stock::{Movement, MovementKind, StockLine, QUANTITY_SCALE},
    utils::{next_code, validate},
};

const LEGACY_REFERENCE: &str = "legacy import";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacySnapshot {
    pub employees: Vec<LegacyEmployee>,
    pub products: Vec<LegacyProduct>,
    pub customers: Vec<LegacyCustomer>,
    pub jobs: Vec<LegacyJob>,
    pub activities: Vec<LegacyActivity>,
    pub stock_return_requests: Vec<LegacyReturn>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyAssignment {
    pub product_id: String,
    pub product_name: String,
    pub quantity_given: Decimal,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyEmployee {
    pub employee_id: String,
    pub name: String,
    pub father_name: String,
    pub aadhaar_number: String,
    pub date_of_birth: String,
    pub mobile_number: String,
    pub emergency_contact: String,
    pub address: String,
    pub photo: Option<String>,
    pub date_of_joining: String,
    pub password: Option<String>,
    pub stock_in_hand: Vec<LegacyAssignment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyProduct {
    pub product_id: String,
    pub product_name: String,
    pub date_of_purchase: String,
    pub quantity_purchased: Decimal,
    pub quantity_available: Decimal,
    pub unit: Option<ProductUnit>,
    pub supplier_name: String,
    pub remarks: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyCustomer {
    pub id: String,
    pub name: String,
    pub address: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub service_type: Option<String>,
    pub contract_start_date: Option<String>,
    pub contract_end_date: Option<String>,
    pub contract_amount: Option<Decimal>,
    pub frequency: Option<String>,
    pub service_dates: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyJob {
    pub id: String,
    pub bill_number: String,
    pub customer_id: String,
    pub customer_name: String,
    pub employee_id: String,
    pub employee_name: String,
    pub job_date: String,
    pub products_assigned: Vec<LegacyAssignment>,
    pub products_used: Option<Vec<LegacyAssignment>>,
    pub amount: Option<Decimal>,
    pub service_type: Option<String>,
    pub next_service_date: Option<String>,
    pub status: Option<JobStatus>,
    pub remarks: String,
    pub created_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyReturn {
    pub job_id: Option<String>,
    pub bill_number: Option<String>,
    pub employee_id: String,
    pub employee_name: String,
    pub products_returned: Vec<LegacyAssignment>,
    pub status: Option<StockReturnStatus>,
    pub requested_at: String,
    pub resolved_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LegacyActivity {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct ImportedEmployee {
    pub id: Uuid,
    pub employee_code: String,
    pub name: String,
    pub father_name: String,
    pub aadhaar_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub mobile_number: String,
    pub emergency_contact: String,
    pub address: String,
    pub photo_url: Option<String>,
    pub date_of_joining: Option<NaiveDate>,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ImportedProduct {
    pub id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub unit: ProductUnit,
    pub date_of_purchase: Option<NaiveDate>,
    pub supplier_name: String,
    pub remarks: String,
}

#[derive(Debug, Clone)]
pub struct ImportedCustomer {
    pub id: Uuid,
    pub name: String,
    pub contact_number: String,
    pub address: String,
    pub email: Option<String>,
    pub contract: Option<NewContract>,
}

#[derive(Debug, Clone)]
pub struct ImportedJob {
    pub id: Uuid,
    pub bill_number: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    pub job_date: NaiveDate,
    pub products_assigned: Vec<StockLine>,
    pub products_used: Option<Vec<StockLine>>,
    pub amount: Option<Decimal>,
    pub service_type: Option<String>,
    pub next_service_date: Option<NaiveDate>,
    pub status: JobStatus,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ImportedReturn {
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    pub job_id: Option<Uuid>,
    pub bill_number: Option<String>,
    pub products_returned: Vec<StockLine>,
    pub status: StockReturnStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ImportedActivity {
    pub kind: ActivityKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Everything the import writes, in dependency order.
#[derive(Debug, Default)]
pub struct ImportPlan {
    pub employees: Vec<ImportedEmployee>,
    pub products: Vec<ImportedProduct>,
    pub movements: Vec<Movement>,
    pub customers: Vec<ImportedCustomer>,
    pub jobs: Vec<ImportedJob>,
    pub returns: Vec<ImportedReturn>,
    pub activities: Vec<ImportedActivity>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub employees: usize,
    pub products: usize,
    pub customers: usize,
    pub jobs: usize,
    pub stock_returns: usize,
    pub activities: usize,
    pub warnings: Vec<String>,
}

impl ImportPlan {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            employees: self.employees.len(),
            products: self.products.len(),
            customers: self.customers.len(),
            jobs: self.jobs.len(),
            stock_returns: self.returns.len(),
            activities: self.activities.len(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Accepts `2024-05-01` as well as full ISO timestamps.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc()))
}

fn parse_activity_kind(raw: &str) -> Option<ActivityKind> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}

struct Converter {
    now: DateTime<Utc>,
    employees_by_code: HashMap<String, (Uuid, String)>,
    products_by_code: HashMap<String, (Uuid, String, ProductUnit)>,
    customers_by_legacy_id: HashMap<String, (Uuid, String)>,
    jobs_by_legacy_id: HashMap<String, Uuid>,
    // Imported ids by snapshot position, `None` for skipped duplicates.
    employee_slots: Vec<Option<Uuid>>,
    product_slots: Vec<Option<Uuid>>,
    plan: ImportPlan,
}

impl Converter {
    fn lines(&mut self, context: &str, assignments: &[LegacyAssignment]) -> Vec<StockLine> {
        let mut lines = Vec::with_capacity(assignments.len());
        for a in assignments {
            match self.products_by_code.get(a.product_id.trim()) {
                Some((id, name, unit)) => lines.push(StockLine {
                    product_id: *id,
                    product_name: name.clone(),
                    quantity: a.quantity_given.round_dp(QUANTITY_SCALE),
                    unit: *unit,
                }),
                None => self.plan.warnings.push(format!(
                    "{}: dropped line for unknown product {} ({})",
                    context, a.product_id, a.product_name
                )),
            }
        }
        lines
    }

    fn employees(&mut self, employees: &[LegacyEmployee]) {
        let mut codes: Vec<String> = employees
            .iter()
            .map(|e| e.employee_id.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        for e in employees {
            let code = match e.employee_id.trim() {
                "" => {
                    let code = next_code("EMP", codes.iter().map(String::as_str));
                    codes.push(code.clone());
                    code
                }
                code => code.to_string(),
            };
            if self.employees_by_code.contains_key(&code) {
                self.plan.warnings.push(format!("Skipped duplicate employee {}", code));
                self.employee_slots.push(None);
                continue;
            }

            let id = Uuid::new_v4();
            self.employees_by_code.insert(code.clone(), (id, e.name.clone()));
            self.employee_slots.push(Some(id));
            self.plan.employees.push(ImportedEmployee {
                id,
                employee_code: code,
                name: e.name.trim().to_string(),
                father_name: e.father_name.trim().to_string(),
                aadhaar_number: e.aadhaar_number.trim().to_string(),
                date_of_birth: parse_date(&e.date_of_birth),
                mobile_number: e.mobile_number.trim().to_string(),
                emergency_contact: e.emergency_contact.trim().to_string(),
                address: e.address.trim().to_string(),
                photo_url: validate::non_blank(e.photo.clone()),
                date_of_joining: parse_date(&e.date_of_joining),
                password: validate::non_blank(e.password.clone())
                    .unwrap_or_else(|| DEFAULT_EMPLOYEE_PASSWORD.to_string()),
            });
        }
    }

    fn products(&mut self, products: &[LegacyProduct]) {
        let mut codes: Vec<String> = products
            .iter()
            .map(|p| p.product_id.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        for p in products {
            let code = match p.product_id.trim() {
                "" => {
                    let code = next_code("PRD", codes.iter().map(String::as_str));
                    codes.push(code.clone());
                    code
                }
                code => code.to_string(),
            };
            if self.products_by_code.contains_key(&code) {
                self.plan.warnings.push(format!("Skipped duplicate product {}", code));
                self.product_slots.push(None);
                continue;
            }

            let id = Uuid::new_v4();
            self.product_slots.push(Some(id));
            let unit = p.unit.unwrap_or(ProductUnit::Pieces);
            self.products_by_code
                .insert(code.clone(), (id, p.product_name.trim().to_string(), unit));
            self.plan.products.push(ImportedProduct {
                id,
                product_code: code,
                product_name: p.product_name.trim().to_string(),
                unit,
                date_of_purchase: parse_date(&p.date_of_purchase),
                supplier_name: p.supplier_name.trim().to_string(),
                remarks: p.remarks.trim().to_string(),
            });
        }
    }

    /// Opening movements: a purchase of the stored purchased figure, one
    /// assignment per stored holding, then an adjustment for whatever gap is
    /// left between the resulting and the stored warehouse balance. Runs
    /// after `employees` and `products`, whose slots it walks.
    fn opening_movements(&mut self, snapshot: &LegacySnapshot) {
        let mut assigned: HashMap<Uuid, Decimal> = HashMap::new();
        let mut holdings = Vec::new();

        let employee_slots = std::mem::take(&mut self.employee_slots);
        for (e, slot) in snapshot.employees.iter().zip(employee_slots) {
            let Some(employee_id) = slot else {
                continue;
            };
            let context = format!("Stock in hand of {}", e.name);
            for line in self.lines(&context, &e.stock_in_hand) {
                if line.quantity <= Decimal::ZERO {
                    continue;
                }
                *assigned.entry(line.product_id).or_insert(Decimal::ZERO) += line.quantity;
                holdings.push(Movement {
                    product_id: line.product_id,
                    employee_id: Some(employee_id),
                    kind: MovementKind::Assign,
                    quantity: line.quantity,
                    reference: Some(LEGACY_REFERENCE.to_string()),
                });
            }
        }

        let product_slots = std::mem::take(&mut self.product_slots);
        for (p, slot) in snapshot.products.iter().zip(product_slots) {
            let Some(product_id) = slot else {
                continue;
            };

            let mut purchased = p.quantity_purchased.round_dp(QUANTITY_SCALE);
            if purchased < Decimal::ZERO {
                self.plan.warnings.push(format!(
                    "Product {}: negative purchased quantity {} imported as an adjustment",
                    p.product_name, p.quantity_purchased
                ));
                purchased = Decimal::ZERO;
            }
            if purchased > Decimal::ZERO {
                self.plan.movements.push(Movement {
                    product_id,
                    employee_id: None,
                    kind: MovementKind::Purchase,
                    quantity: purchased,
                    reference: Some(LEGACY_REFERENCE.to_string()),
                });
            }

            let handed_out = assigned.get(&product_id).copied().unwrap_or(Decimal::ZERO);
            let gap = p.quantity_available.round_dp(QUANTITY_SCALE) - (purchased - handed_out);
            if gap != Decimal::ZERO {
                self.plan.movements.push(Movement {
                    product_id,
                    employee_id: None,
                    kind: MovementKind::Adjustment,
                    quantity: gap,
                    reference: Some(LEGACY_REFERENCE.to_string()),
                });
            }
        }

        self.plan.movements.extend(holdings);
    }

    fn customers(&mut self, customers: &[LegacyCustomer]) {
        for c in customers {
            let has_contract = validate::non_blank(c.service_type.clone()).is_some()
                || validate::non_blank(c.frequency.clone()).is_some()
                || c.contract_start_date.is_some()
                || c.contract_end_date.is_some()
                || c.contract_amount.is_some()
                || !c.service_dates.is_empty();

            let contract = has_contract.then(|| {
                let mut contract = NewContract::with_defaults(
                    c.service_type.clone(),
                    c.frequency.clone(),
                    c.contract_start_date.as_deref().and_then(parse_date),
                    c.contract_end_date.as_deref().and_then(parse_date),
                );
                let amount = c.contract_amount.unwrap_or(Decimal::ZERO);
                contract.contract_value = amount;
                contract.total_amount = amount;
                contract.service_dates = c.service_dates.iter().filter_map(|d| parse_date(d)).collect();
                contract
            });

            let contract = contract.map(|mut contract| {
                if contract.service_dates.len() > MAX_SERVICE_DATES {
                    self.plan.warnings.push(format!(
                        "Customer {}: kept the first {} service dates",
                        c.name, MAX_SERVICE_DATES
                    ));
                    contract.service_dates.truncate(MAX_SERVICE_DATES);
                }
                contract
            });

            let id = Uuid::new_v4();
            self.customers_by_legacy_id
                .insert(c.id.clone(), (id, c.name.trim().to_string()));
            self.plan.customers.push(ImportedCustomer {
                id,
                name: c.name.trim().to_string(),
                contact_number: c.contact_number.trim().to_string(),
                address: c.address.trim().to_string(),
                email: validate::non_blank(c.email.clone()),
                contract,
            });
        }
    }

    fn jobs(&mut self, jobs: &[LegacyJob]) {
        let mut bills: HashSet<String> = HashSet::new();

        for j in jobs {
            let mut bill_number = j.bill_number.trim().to_string();
            if bill_number.is_empty() {
                bill_number = format!("LEGACY-{}", self.plan.jobs.len() + 1);
            }
            if !bills.insert(bill_number.to_lowercase()) {
                let mut n = self.plan.jobs.len() + 1;
                let renamed = loop {
                    let candidate = format!("{}-DUP{}", bill_number, n);
                    if bills.insert(candidate.to_lowercase()) {
                        break candidate;
                    }
                    n += 1;
                };
                self.plan
                    .warnings
                    .push(format!("Duplicate bill number {} imported as {}", bill_number, renamed));
                bill_number = renamed;
            }

            let context = format!("Job {}", bill_number);
            let products_assigned = self.lines(&context, &j.products_assigned);
            let products_used = j
                .products_used
                .as_ref()
                .map(|used| self.lines(&context, used));

            let customer = self.customers_by_legacy_id.get(&j.customer_id).cloned();
            let employee = self.employees_by_code.get(j.employee_id.trim()).cloned();
            let created_at = parse_timestamp(&j.created_at).unwrap_or(self.now);

            let id = Uuid::new_v4();
            if !j.id.is_empty() {
                self.jobs_by_legacy_id.insert(j.id.clone(), id);
            }

            self.plan.jobs.push(ImportedJob {
                id,
                bill_number,
                customer_id: customer.as_ref().map(|c| c.0),
                customer_name: customer.map(|c| c.1).unwrap_or_else(|| j.customer_name.clone()),
                employee_id: employee.as_ref().map(|e| e.0),
                employee_name: employee.map(|e| e.1).unwrap_or_else(|| j.employee_name.clone()),
                job_date: parse_date(&j.job_date).unwrap_or_else(|| created_at.date_naive()),
                products_assigned,
                products_used,
                amount: j.amount,
                service_type: validate::non_blank(j.service_type.clone()),
                next_service_date: j.next_service_date.as_deref().and_then(parse_date),
                status: j.status.unwrap_or(JobStatus::Pending),
                remarks: j.remarks.trim().to_string(),
                created_at,
            });
        }
    }

    fn returns(&mut self, returns: &[LegacyReturn]) {
        for r in returns {
            let employee = self.employees_by_code.get(r.employee_id.trim()).cloned();
            let products_returned = self.lines("Stock return", &r.products_returned);
            let job_id = r
                .job_id
                .as_ref()
                .and_then(|id| self.jobs_by_legacy_id.get(id).copied());

            self.plan.returns.push(ImportedReturn {
                employee_id: employee.as_ref().map(|e| e.0),
                employee_name: employee.map(|e| e.1).unwrap_or_else(|| r.employee_name.clone()),
                job_id,
                bill_number: validate::non_blank(r.bill_number.clone()),
                products_returned,
                status: r.status.unwrap_or(StockReturnStatus::Pending),
                requested_at: parse_timestamp(&r.requested_at).unwrap_or(self.now),
                resolved_at: r.resolved_at.as_deref().and_then(parse_timestamp),
            });
        }
    }

    fn activities(&mut self, activities: &[LegacyActivity]) {
        for a in activities {
            match parse_activity_kind(&a.kind) {
                Some(kind) => self.plan.activities.push(ImportedActivity {
                    kind,
                    description: a.description.clone(),
                    created_at: parse_timestamp(&a.timestamp).unwrap_or(self.now),
                }),
                None => self
                    .plan
                    .warnings
                    .push(format!("Skipped activity of unknown type {}", a.kind)),
            }
        }
    }
}

/// Converts a legacy snapshot into an import plan.
pub fn convert(snapshot: &LegacySnapshot, now: DateTime<Utc>) -> ImportPlan {
    let mut converter = Converter {
        now,
        employees_by_code: HashMap::new(),
        products_by_code: HashMap::new(),
        customers_by_legacy_id: HashMap::new(),
        jobs_by_legacy_id: HashMap::new(),
        employee_slots: Vec::new(),
        product_slots: Vec::new(),
        plan: ImportPlan::default(),
    };

    converter.employees(&snapshot.employees);
    converter.products(&snapshot.products);
    converter.opening_movements(snapshot);
    converter.customers(&snapshot.customers);
    converter.jobs(&snapshot.jobs);
    converter.returns(&snapshot.stock_return_requests);
    converter.activities(&snapshot.activities);

    converter.plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::{ProductStock, StockPosition};
    use serde_json::json;

    fn snapshot() -> LegacySnapshot {
        serde_json::from_value(json!({
            "employees": [{
                "id": "1700000000000-abc",
                "employeeId": "EMP0001",
                "name": "Suresh",
                "mobileNumber": "9876543210",
                "dateOfJoining": "2024-02-01",
                "password": "secret",
                "stockInHand": [
                    { "productId": "PRD0001", "productName": "Cypermethrin", "quantityGiven": 5, "unit": "litres" }
                ]
            }],
            "products": [{
                "productId": "PRD0001",
                "productName": "Cypermethrin",
                "quantityPurchased": 50,
                "quantityAvailable": 35,
                "unit": "litres"
            }],
            "customers": [{
                "id": "c-1",
                "name": "Green Villa",
                "address": "7 Hill Road",
                "contactNumber": "9000000001",
                "serviceType": "Termite Control",
                "contractAmount": 4500,
                "frequency": "Quarterly",
                "serviceDates": ["2024-03-01", "2024-06-01T00:00:00.000Z"]
            }, {
                "id": "c-2",
                "name": "Walk-in",
                "address": "",
                "contactNumber": ""
            }],
            "jobs": [{
                "id": "j-1",
                "billNumber": "B-100",
                "customerId": "c-1",
                "customerName": "Green Villa",
                "employeeId": "EMP0001",
                "employeeName": "Suresh",
                "jobDate": "2024-03-01",
                "productsAssigned": [
                    { "productId": "PRD0001", "productName": "Cypermethrin", "quantityGiven": 20, "unit": "litres" }
                ],
                "productsUsed": [
                    { "productId": "PRD0001", "productName": "Cypermethrin", "quantityGiven": 15, "unit": "litres" }
                ],
                "status": "completed",
                "remarks": "",
                "createdAt": "2024-03-01T09:30:00.000Z"
            }, {
                "id": "j-2",
                "billNumber": "b-100",
                "customerId": "gone",
                "customerName": "Old Customer",
                "employeeId": "EMP0099",
                "employeeName": "Former Staff",
                "jobDate": "2024-03-02",
                "productsAssigned": [],
                "status": "pending",
                "createdAt": "2024-03-02T09:30:00.000Z"
            }],
            "activities": [
                { "id": "a-1", "type": "job_assigned", "description": "Job B-100 assigned", "timestamp": "2024-03-01T09:30:00.000Z" },
                { "id": "a-2", "type": "mystery", "description": "?", "timestamp": "2024-03-01T09:31:00.000Z" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let snapshot: LegacySnapshot = serde_json::from_value(json!({ "employees": [] })).unwrap();
        let plan = convert(&snapshot, Utc::now());
        assert!(plan.products.is_empty());
        assert!(plan.movements.is_empty());
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn opening_movements_reproduce_stored_balances() {
        let plan = convert(&snapshot(), Utc::now());
        let product = &plan.products[0];
        let employee = &plan.employees[0];

        let mut position = StockPosition::new();
        position.insert_product(ProductStock {
            product_id: product.id,
            product_name: product.product_name.clone(),
            unit: product.unit,
            available: Decimal::ZERO,
        });
        position.apply(&plan.movements);

        assert_eq!(position.available(product.id), Decimal::from(35));
        assert_eq!(position.in_hand(product.id), Decimal::from(5));

        let purchased: Decimal = plan
            .movements
            .iter()
            .filter(|m| m.kind == MovementKind::Purchase)
            .map(|m| m.quantity)
            .sum();
        assert_eq!(purchased, Decimal::from(50));
        assert!(plan
            .movements
            .iter()
            .filter(|m| m.kind == MovementKind::Assign)
            .all(|m| m.employee_id == Some(employee.id)));
    }

    #[test]
    fn flat_contract_fields_become_a_contract() {
        let plan = convert(&snapshot(), Utc::now());

        let contract = plan.customers[0].contract.as_ref().unwrap();
        assert_eq!(contract.service_type, "Termite Control");
        assert_eq!(contract.frequency, "Quarterly");
        assert_eq!(contract.total_amount, Decimal::from(4500));
        assert_eq!(
            contract.service_dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            ]
        );
        assert!(plan.customers[1].contract.is_none());
    }

    #[test]
    fn jobs_keep_names_when_references_are_unknown() {
        let plan = convert(&snapshot(), Utc::now());

        let first = &plan.jobs[0];
        assert_eq!(first.customer_id, Some(plan.customers[0].id));
        assert_eq!(first.employee_id, Some(plan.employees[0].id));
        assert_eq!(first.status, JobStatus::Completed);
        assert_eq!(first.products_used.as_ref().unwrap()[0].quantity, Decimal::from(15));

        let second = &plan.jobs[1];
        assert_eq!(second.customer_id, None);
        assert_eq!(second.customer_name, "Old Customer");
        assert_eq!(second.employee_id, None);
        assert_eq!(second.employee_name, "Former Staff");
        assert_ne!(second.bill_number.to_lowercase(), "b-100");
        assert_eq!(plan.warnings.iter().filter(|w| w.starts_with("Duplicate bill")).count(), 1);
    }

    #[test]
    fn unknown_activity_types_are_skipped() {
        let plan = convert(&snapshot(), Utc::now());
        assert_eq!(plan.activities.len(), 1);
        assert_eq!(plan.activities[0].kind, ActivityKind::JobAssigned);
        assert_eq!(plan.employees[0].password, "secret");
    }

    #[test]
    fn blank_codes_keep_their_opening_stock() {
        let snapshot: LegacySnapshot = serde_json::from_value(json!({
            "employees": [{
                "employeeId": "",
                "name": "Ravi",
                "stockInHand": [{ "productId": "PRD0001", "productName": "Gel bait", "quantityGiven": 7 }]
            }],
            "products": [
                { "productId": "PRD0001", "productName": "Gel bait", "quantityPurchased": 20, "quantityAvailable": 13 },
                { "productId": " ", "productName": "Spray pump", "quantityPurchased": 4, "quantityAvailable": 4 }
            ]
        }))
        .unwrap();
        let plan = convert(&snapshot, Utc::now());

        let employee = &plan.employees[0];
        assert_eq!(employee.employee_code, "EMP0001");
        let assigns: Vec<_> = plan
            .movements
            .iter()
            .filter(|m| m.kind == MovementKind::Assign)
            .collect();
        assert_eq!(assigns.len(), 1);
        assert_eq!(assigns[0].employee_id, Some(employee.id));
        assert_eq!(assigns[0].quantity, Decimal::from(7));

        let pump = &plan.products[1];
        assert_eq!(pump.product_code, "PRD0002");
        assert!(plan
            .movements
            .iter()
            .any(|m| m.product_id == pump.id && m.kind == MovementKind::Purchase && m.quantity == Decimal::from(4)));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn renamed_bills_never_collide() {
        let snapshot: LegacySnapshot = serde_json::from_value(json!({
            "jobs": [
                { "id": "1", "billNumber": "A-DUP3", "jobDate": "2024-01-01" },
                { "id": "2", "billNumber": "A", "jobDate": "2024-01-01" },
                { "id": "3", "billNumber": "a", "jobDate": "2024-01-01" },
                { "id": "4", "billNumber": "A", "jobDate": "2024-01-01" }
            ]
        }))
        .unwrap();
        let plan = convert(&snapshot, Utc::now());

        let bills: HashSet<String> = plan.jobs.iter().map(|j| j.bill_number.to_lowercase()).collect();
        assert_eq!(bills.len(), 4);
        assert_eq!(plan.warnings.iter().filter(|w| w.starts_with("Duplicate bill")).count(), 2);
    }

    #[test]
    fn negative_purchases_become_adjustments() {
        let snapshot: LegacySnapshot = serde_json::from_value(json!({
            "products": [
                { "productId": "PRD0001", "productName": "Gel bait", "quantityPurchased": -3, "quantityAvailable": 2.00049 }
            ]
        }))
        .unwrap();
        let plan = convert(&snapshot, Utc::now());

        assert!(plan.movements.iter().all(|m| m.kind == MovementKind::Adjustment));
        assert!(plan.movements.iter().all(|m| m.quantity.scale() <= QUANTITY_SCALE));
        let total: Decimal = plan.movements.iter().map(|m| m.quantity).sum();
        assert_eq!(total, Decimal::from(2));
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn dates_accept_both_formats() {
        assert_eq!(parse_date("2024-05-01"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_date("2024-05-01T10:00:00.000Z"), NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(parse_date(""), None);
        assert_eq!(
            parse_timestamp("2024-05-01T10:00:00.000Z").map(|t| t.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );
    }
}
