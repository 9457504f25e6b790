//! Stock lifecycle planning.
//!
//! Balances are never stored: the warehouse balance of a product and the
//! quantity an employee carries are both sums over the append-only movement
//! ledger. The functions here look at the current position of the products
//! and the employee an operation touches and decide which movements to
//! append. They perform no I/O; `ledger` loads positions and persists
//! movements inside the caller's transaction.

pub mod ledger;

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ProductUnit;

/// Decimal places kept by the ledger's quantity column.
pub const QUANTITY_SCALE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "stock_movement_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Purchase,
    Restock,
    Assign,
    Consume,
    Return,
    Adjustment,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub product_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub kind: MovementKind,
    pub quantity: Decimal,
    pub reference: Option<String>,
}

/// A product line frozen onto a job or a return request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: ProductUnit,
}

/// A (product, quantity) pair as submitted by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductStock {
    pub product_id: Uuid,
    pub product_name: String,
    pub unit: ProductUnit,
    pub available: Decimal,
}

#[derive(Debug, Error, PartialEq)]
pub enum StockError {
    #[error("At least one product is required")]
    NoLines,
    #[error("Quantity must be greater than 0")]
    NonPositiveQuantity,
    #[error("Quantities allow at most 3 decimal places")]
    TooPrecise,
    #[error("Product {0} not found")]
    UnknownProduct(Uuid),
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    Insufficient {
        product: String,
        requested: Decimal,
        available: Decimal,
    },
    #[error("{0} was not assigned to this job")]
    NotAssigned(String),
    #[error("Used quantity for {product} must be between 0 and {assigned}")]
    UsageOutOfRange { product: String, assigned: Decimal },
}

/// Result of planning a job assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lines: Vec<StockLine>,
    pub movements: Vec<Movement>,
}

/// Warehouse balances of some products plus what one employee carries.
#[derive(Debug, Clone, Default)]
pub struct StockPosition {
    products: HashMap<Uuid, ProductStock>,
    in_hand: HashMap<Uuid, Decimal>,
}

impl StockPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&mut self, product: ProductStock) {
        self.products.insert(product.product_id, product);
    }

    pub fn set_in_hand(&mut self, product_id: Uuid, quantity: Decimal) {
        self.in_hand.insert(product_id, quantity);
    }

    pub fn available(&self, product_id: Uuid) -> Decimal {
        self.products
            .get(&product_id)
            .map(|p| p.available)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn in_hand(&self, product_id: Uuid) -> Decimal {
        self.in_hand.get(&product_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Applies movements to the in-memory balances, the same way the ledger
    /// views sum them.
    pub fn apply(&mut self, movements: &[Movement]) {
        for m in movements {
            let q = m.quantity;
            match m.kind {
                MovementKind::Purchase | MovementKind::Restock | MovementKind::Adjustment => {
                    self.shift_warehouse(m.product_id, q);
                }
                MovementKind::Assign => {
                    self.shift_warehouse(m.product_id, -q);
                    self.shift_in_hand(m.product_id, q);
                }
                MovementKind::Consume => self.shift_in_hand(m.product_id, -q),
                MovementKind::Return => {
                    self.shift_in_hand(m.product_id, -q);
                    self.shift_warehouse(m.product_id, q);
                }
            }
        }
    }

    fn shift_warehouse(&mut self, product_id: Uuid, delta: Decimal) {
        if let Some(p) = self.products.get_mut(&product_id) {
            p.available += delta;
        }
    }

    fn shift_in_hand(&mut self, product_id: Uuid, delta: Decimal) {
        let held = self.in_hand.entry(product_id).or_insert(Decimal::ZERO);
        *held += delta;
        if *held <= Decimal::ZERO {
            self.in_hand.remove(&product_id);
        }
    }

    /// Resolves requested lines against known products, rejecting empty
    /// requests, non-positive quantities and unknown products. Rows naming
    /// the same product are merged, first occurrence keeps its place.
    pub fn describe(&self, requests: &[LineRequest]) -> Result<Vec<StockLine>, StockError> {
        if requests.is_empty() {
            return Err(StockError::NoLines);
        }

        let mut lines: Vec<StockLine> = Vec::with_capacity(requests.len());
        for req in requests {
            if req.quantity <= Decimal::ZERO {
                return Err(StockError::NonPositiveQuantity);
            }
            check_scale(req.quantity)?;
            let product = self
                .products
                .get(&req.product_id)
                .ok_or(StockError::UnknownProduct(req.product_id))?;

            match lines.iter_mut().find(|l| l.product_id == req.product_id) {
                Some(line) => line.quantity += req.quantity,
                None => lines.push(StockLine {
                    product_id: product.product_id,
                    product_name: product.product_name.clone(),
                    quantity: req.quantity,
                    unit: product.unit,
                }),
            }
        }
        Ok(lines)
    }

    /// Plans handing stock to an employee for a job.
    ///
    /// Every row must fit into the warehouse balance left over after the
    /// other rows of the same request that name the same product; if any row
    /// does not fit nothing is planned.
    pub fn plan_assignment(
        &self,
        employee_id: Uuid,
        reference: &str,
        requests: &[LineRequest],
    ) -> Result<Assignment, StockError> {
        let lines = self.describe(requests)?;

        for line in &lines {
            let available = self.available(line.product_id);
            if line.quantity > available {
                return Err(StockError::Insufficient {
                    product: line.product_name.clone(),
                    requested: line.quantity,
                    available,
                });
            }
        }

        let movements = lines
            .iter()
            .map(|line| Movement {
                product_id: line.product_id,
                employee_id: Some(employee_id),
                kind: MovementKind::Assign,
                quantity: line.quantity,
                reference: Some(reference.to_string()),
            })
            .collect();

        Ok(Assignment { lines, movements })
    }

    /// Plans the consumption recorded when a job completes. The employee's
    /// holding is floored at zero; the warehouse is not touched.
    pub fn plan_consumption(
        &self,
        employee_id: Uuid,
        reference: &str,
        used: &[StockLine],
    ) -> Vec<Movement> {
        self.drain_in_hand(employee_id, reference, used, MovementKind::Consume)
    }

    /// Plans the movements of an approved return: each line moves back to the
    /// warehouse, capped at what the employee still holds.
    pub fn plan_return(
        &self,
        employee_id: Uuid,
        reference: &str,
        returned: &[StockLine],
    ) -> Vec<Movement> {
        self.drain_in_hand(employee_id, reference, returned, MovementKind::Return)
    }

    fn drain_in_hand(
        &self,
        employee_id: Uuid,
        reference: &str,
        lines: &[StockLine],
        kind: MovementKind,
    ) -> Vec<Movement> {
        let mut remaining = self.in_hand.clone();
        let mut movements = Vec::new();

        for line in lines {
            let held = remaining.entry(line.product_id).or_insert(Decimal::ZERO);
            let quantity = line.quantity.min(*held);
            if quantity <= Decimal::ZERO {
                continue;
            }
            *held -= quantity;
            movements.push(Movement {
                product_id: line.product_id,
                employee_id: Some(employee_id),
                kind,
                quantity,
                reference: Some(reference.to_string()),
            });
        }
        movements
    }
}

/// Rejects quantities the ledger would have to round.
pub fn check_scale(quantity: Decimal) -> Result<(), StockError> {
    if quantity.normalize().scale() > QUANTITY_SCALE {
        return Err(StockError::TooPrecise);
    }
    Ok(())
}

/// Merges lines naming the same product, first occurrence keeps its place.
pub fn merge_lines(lines: &[StockLine]) -> Vec<StockLine> {
    let mut merged: Vec<StockLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(m) => m.quantity += line.quantity,
            None => merged.push(line.clone()),
        }
    }
    merged
}

/// Plans a warehouse restock.
pub fn plan_restock(product_id: Uuid, quantity: Decimal) -> Result<Movement, StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity);
    }
    check_scale(quantity)?;
    Ok(Movement {
        product_id,
        employee_id: None,
        kind: MovementKind::Restock,
        quantity,
        reference: None,
    })
}

/// Checks the quantities reported when a job is completed against what was
/// assigned and returns the usage lines to record, in assignment order.
/// Assigned products missing from `used` count as zero, and assigned rows
/// naming the same product are checked as one line.
pub fn validate_usage(
    assigned: &[StockLine],
    used: &[LineRequest],
) -> Result<Vec<StockLine>, StockError> {
    for u in used {
        if !assigned.iter().any(|a| a.product_id == u.product_id) {
            return Err(StockError::NotAssigned(u.product_id.to_string()));
        }
        check_scale(u.quantity)?;
    }

    merge_lines(assigned)
        .iter()
        .map(|a| {
            let quantity: Decimal = used
                .iter()
                .filter(|u| u.product_id == a.product_id)
                .map(|u| u.quantity)
                .sum();
            if quantity < Decimal::ZERO || quantity > a.quantity {
                return Err(StockError::UsageOutOfRange {
                    product: a.product_name.clone(),
                    assigned: a.quantity,
                });
            }
            Ok(StockLine {
                quantity,
                ..a.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn position_with(available: i64) -> (StockPosition, Uuid) {
        let product_id = Uuid::new_v4();
        let mut position = StockPosition::new();
        position.insert_product(ProductStock {
            product_id,
            product_name: "Cypermethrin".to_string(),
            unit: ProductUnit::Litres,
            available: qty(available),
        });
        (position, product_id)
    }

    fn line(product_id: Uuid, n: i64) -> LineRequest {
        LineRequest {
            product_id,
            quantity: qty(n),
        }
    }

    #[test]
    fn assignment_moves_stock_to_employee() {
        let (mut position, product) = position_with(50);
        let employee = Uuid::new_v4();

        let plan = position
            .plan_assignment(employee, "B-1", &[line(product, 20)])
            .unwrap();
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.movements[0].kind, MovementKind::Assign);

        position.apply(&plan.movements);
        assert_eq!(position.available(product), qty(30));
        assert_eq!(position.in_hand(product), qty(20));
    }

    #[test]
    fn assignment_merges_into_existing_holding() {
        let (mut position, product) = position_with(50);
        position.set_in_hand(product, qty(4));

        let plan = position
            .plan_assignment(Uuid::new_v4(), "B-2", &[line(product, 6)])
            .unwrap();
        position.apply(&plan.movements);
        assert_eq!(position.in_hand(product), qty(10));
    }

    #[test]
    fn rows_for_the_same_product_share_the_balance() {
        let (position, product) = position_with(50);

        let err = position
            .plan_assignment(Uuid::new_v4(), "B-3", &[line(product, 30), line(product, 30)])
            .unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                product: "Cypermethrin".to_string(),
                requested: qty(60),
                available: qty(50),
            }
        );

        let plan = position
            .plan_assignment(Uuid::new_v4(), "B-3", &[line(product, 30), line(product, 20)])
            .unwrap();
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].quantity, qty(50));
    }

    #[test]
    fn one_bad_row_rejects_the_whole_assignment() {
        let (mut position, first) = position_with(10);
        let second = Uuid::new_v4();
        position.insert_product(ProductStock {
            product_id: second,
            product_name: "Gel bait".to_string(),
            unit: ProductUnit::Pieces,
            available: qty(2),
        });

        let err = position
            .plan_assignment(Uuid::new_v4(), "B-4", &[line(first, 5), line(second, 3)])
            .unwrap_err();
        assert!(matches!(err, StockError::Insufficient { .. }));
        assert_eq!(position.available(first), qty(10));
    }

    #[test]
    fn assignment_rejects_bad_input() {
        let (position, product) = position_with(10);
        let employee = Uuid::new_v4();

        assert_eq!(
            position.plan_assignment(employee, "B", &[]).unwrap_err(),
            StockError::NoLines
        );
        assert_eq!(
            position
                .plan_assignment(employee, "B", &[line(product, 0)])
                .unwrap_err(),
            StockError::NonPositiveQuantity
        );
        let stranger = Uuid::new_v4();
        assert_eq!(
            position
                .plan_assignment(employee, "B", &[line(stranger, 1)])
                .unwrap_err(),
            StockError::UnknownProduct(stranger)
        );
    }

    #[test]
    fn consumption_is_floored_at_holding_and_spares_warehouse() {
        let (mut position, product) = position_with(30);
        position.set_in_hand(product, qty(20));
        let employee = Uuid::new_v4();

        let used = vec![StockLine {
            product_id: product,
            product_name: "Cypermethrin".to_string(),
            quantity: qty(15),
            unit: ProductUnit::Litres,
        }];
        let movements = position.plan_consumption(employee, "B-1", &used);
        position.apply(&movements);
        assert_eq!(position.in_hand(product), qty(5));
        assert_eq!(position.available(product), qty(30));

        let too_much = vec![StockLine {
            quantity: qty(9),
            ..used[0].clone()
        }];
        let movements = position.plan_consumption(employee, "B-1", &too_much);
        assert_eq!(movements[0].quantity, qty(5));
        position.apply(&movements);
        assert_eq!(position.in_hand(product), Decimal::ZERO);
    }

    #[test]
    fn zero_usage_plans_nothing() {
        let (mut position, product) = position_with(30);
        position.set_in_hand(product, qty(20));
        let used = vec![StockLine {
            product_id: product,
            product_name: "Cypermethrin".to_string(),
            quantity: Decimal::ZERO,
            unit: ProductUnit::Litres,
        }];
        assert!(position
            .plan_consumption(Uuid::new_v4(), "B-1", &used)
            .is_empty());
    }

    #[test]
    fn return_is_capped_at_holding() {
        let (mut position, product) = position_with(30);
        position.set_in_hand(product, qty(5));

        let returned = vec![StockLine {
            product_id: product,
            product_name: "Cypermethrin".to_string(),
            quantity: qty(8),
            unit: ProductUnit::Litres,
        }];
        let movements = position.plan_return(Uuid::new_v4(), "R-1", &returned);
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity, qty(5));

        position.apply(&movements);
        assert_eq!(position.available(product), qty(35));
        assert_eq!(position.in_hand(product), Decimal::ZERO);
    }

    #[test]
    fn full_lifecycle_matches_worked_example() {
        let (mut position, product) = position_with(50);
        let employee = Uuid::new_v4();

        let plan = position
            .plan_assignment(employee, "B-100", &[line(product, 20)])
            .unwrap();
        position.apply(&plan.movements);

        let used = validate_usage(&plan.lines, &[line(product, 15)]).unwrap();
        let consumed = position.plan_consumption(employee, "B-100", &used);
        position.apply(&consumed);
        assert_eq!(position.in_hand(product), qty(5));
        assert_eq!(position.available(product), qty(30));

        let returned = position.describe(&[line(product, 5)]).unwrap();
        let movements = position.plan_return(employee, "R-1", &returned);
        position.apply(&movements);
        assert_eq!(position.available(product), qty(35));
        assert_eq!(position.in_hand(product), Decimal::ZERO);
    }

    #[test]
    fn usage_is_checked_against_assignment() {
        let product = Uuid::new_v4();
        let other = Uuid::new_v4();
        let assigned = vec![
            StockLine {
                product_id: product,
                product_name: "Cypermethrin".to_string(),
                quantity: qty(20),
                unit: ProductUnit::Litres,
            },
            StockLine {
                product_id: other,
                product_name: "Gel bait".to_string(),
                quantity: qty(3),
                unit: ProductUnit::Pieces,
            },
        ];

        let used = validate_usage(&assigned, &[line(product, 12)]).unwrap();
        assert_eq!(used[0].quantity, qty(12));
        assert_eq!(used[1].quantity, Decimal::ZERO);

        assert!(matches!(
            validate_usage(&assigned, &[line(product, 21)]),
            Err(StockError::UsageOutOfRange { .. })
        ));
        assert!(matches!(
            validate_usage(&assigned, &[line(product, -1)]),
            Err(StockError::UsageOutOfRange { .. })
        ));
        assert!(matches!(
            validate_usage(&assigned, &[line(Uuid::new_v4(), 1)]),
            Err(StockError::NotAssigned(_))
        ));
    }

    #[test]
    fn usage_counts_duplicate_assigned_rows_once() {
        let product = Uuid::new_v4();
        let row = StockLine {
            product_id: product,
            product_name: "Cypermethrin".to_string(),
            quantity: qty(5),
            unit: ProductUnit::Litres,
        };
        let assigned = vec![row.clone(), row];

        let used = validate_usage(&assigned, &[line(product, 4)]).unwrap();
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].quantity, qty(4));

        let used = validate_usage(&assigned, &[line(product, 10)]).unwrap();
        assert_eq!(used[0].quantity, qty(10));
    }

    #[test]
    fn quantities_beyond_three_decimals_are_rejected() {
        let (position, product) = position_with(10);
        let tiny = LineRequest {
            product_id: product,
            quantity: Decimal::new(4, 4),
        };
        assert_eq!(
            position.plan_assignment(Uuid::new_v4(), "B-5", &[tiny.clone()]).unwrap_err(),
            StockError::TooPrecise
        );
        assert_eq!(plan_restock(product, Decimal::new(12345, 4)).unwrap_err(), StockError::TooPrecise);

        // Trailing zeros do not count.
        let plan = position
            .plan_assignment(
                Uuid::new_v4(),
                "B-6",
                &[LineRequest {
                    product_id: product,
                    quantity: Decimal::new(15000, 4),
                }],
            )
            .unwrap();
        assert_eq!(plan.lines[0].quantity, Decimal::new(15, 1));

        let assigned = plan.lines;
        assert_eq!(validate_usage(&assigned, &[tiny]).unwrap_err(), StockError::TooPrecise);
    }

    #[test]
    fn quantities_serialize_as_json_numbers() {
        let line = StockLine {
            product_id: Uuid::new_v4(),
            product_name: "Cypermethrin".to_string(),
            quantity: Decimal::new(25, 1),
            unit: ProductUnit::Litres,
        };
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["quantity"], serde_json::json!(2.5));

        let back: StockLine = serde_json::from_value(value).unwrap();
        assert_eq!(back.quantity, Decimal::new(25, 1));
    }

    #[test]
    fn restock_requires_positive_quantity() {
        let product = Uuid::new_v4();
        let movement = plan_restock(product, qty(25)).unwrap();
        assert_eq!(movement.kind, MovementKind::Restock);
        assert_eq!(movement.employee_id, None);
        assert_eq!(
            plan_restock(product, Decimal::ZERO).unwrap_err(),
            StockError::NonPositiveQuantity
        );
    }
}
