//! Quantity reconciliation: the pure computations behind the
//! Estimated -> Requisitioned -> Purchased -> Received -> Issued chain.
//!
//! Everything here is side-effect free. Callers fetch the inputs (lines and
//! downstream consumption) and persist the outputs; this module only does
//! the arithmetic, so every report and dashboard tile agrees on it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// The single place line amounts derive from. `amount` is never entered
/// directly anywhere in the system.
pub fn line_amount(qty: Decimal, rate: Decimal) -> Decimal {
    qty * rate
}

/// Remaining requisitioned quantity not yet consumed by purchase order
/// lines, floored at zero. A negative raw difference indicates corrupt
/// consumption data, which [`raw_balance`] lets callers detect.
pub fn balance_qty(requested: Decimal, consumed: Decimal) -> Decimal {
    (requested - consumed).max(Decimal::ZERO)
}

/// Unfloored difference, for integrity checks.
pub fn raw_balance(requested: Decimal, consumed: Decimal) -> Decimal {
    requested - consumed
}

/// Per-line balance snapshot for one requisition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineBalance {
    pub line_id: Uuid,
    pub requested_qty: Decimal,
    pub consumed_qty: Decimal,
    pub balance_qty: Decimal,
}

/// Computes per-line balances for a requisition given the purchase
/// consumption keyed by requisition line id. Lines with no consumption get
/// their full requested quantity as balance.
pub fn requisition_balances(
    lines: &[(Uuid, Decimal)],
    consumed: &HashMap<Uuid, Decimal>,
) -> Vec<LineBalance> {
    lines
        .iter()
        .map(|(line_id, requested)| {
            let consumed_qty = consumed.get(line_id).copied().unwrap_or(Decimal::ZERO);
            LineBalance {
                line_id: *line_id,
                requested_qty: *requested,
                consumed_qty,
                balance_qty: balance_qty(*requested, consumed_qty),
            }
        })
        .collect()
}

/// Lock policy: a requisition is locked iff every line is fully consumed.
/// An empty line set never locks (there is nothing to consume).
pub fn is_locked(balances: &[LineBalance]) -> bool {
    !balances.is_empty() && balances.iter().all(|b| b.balance_qty == Decimal::ZERO)
}

/// Verifies that no line is over-consumed, surfacing the 1-based row index
/// of the first offender.
pub fn check_no_overconsumption(balances: &[LineBalance]) -> Result<(), ServiceError> {
    for (idx, b) in balances.iter().enumerate() {
        if raw_balance(b.requested_qty, b.consumed_qty) < Decimal::ZERO {
            return Err(ServiceError::InvalidQuantity(format!(
                "Line {}: consumed quantity {} exceeds requested quantity {}",
                idx + 1,
                b.consumed_qty,
                b.requested_qty
            )));
        }
    }
    Ok(())
}

/// Aggregate quantities per (project, item) pair. `received_qty` and
/// `issued_qty` come from the receipt/issue collaborators and are read-only
/// inputs here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct ItemReconciliation {
    pub estimated_qty: Decimal,
    pub requisitioned_qty: Decimal,
    pub purchased_qty: Decimal,
    pub received_qty: Decimal,
    pub issued_qty: Decimal,
}

impl ItemReconciliation {
    /// Requisitioned quantity not yet covered by purchase orders.
    pub fn purchase_outstanding(&self) -> Decimal {
        balance_qty(self.requisitioned_qty, self.purchased_qty)
    }

    /// Purchased quantity not yet received from suppliers.
    pub fn receipt_outstanding(&self) -> Decimal {
        balance_qty(self.purchased_qty, self.received_qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lines(entries: &[(Uuid, Decimal)]) -> Vec<(Uuid, Decimal)> {
        entries.to_vec()
    }

    #[test]
    fn amount_is_quantity_times_rate() {
        assert_eq!(line_amount(dec!(100), dec!(10)), dec!(1000));
        assert_eq!(line_amount(dec!(2.5), dec!(4)), dec!(10.0));
        assert_eq!(line_amount(dec!(0), dec!(99)), dec!(0));
    }

    #[test]
    fn balance_floors_at_zero() {
        assert_eq!(balance_qty(dec!(100), dec!(60)), dec!(40));
        assert_eq!(balance_qty(dec!(100), dec!(100)), dec!(0));
        assert_eq!(balance_qty(dec!(100), dec!(130)), dec!(0));
        assert_eq!(raw_balance(dec!(100), dec!(130)), dec!(-30));
    }

    #[test]
    fn balances_default_to_full_requested_quantity() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut consumed = HashMap::new();
        consumed.insert(a, dec!(60));

        let balances = requisition_balances(&lines(&[(a, dec!(100)), (b, dec!(20))]), &consumed);
        assert_eq!(balances[0].balance_qty, dec!(40));
        assert_eq!(balances[1].balance_qty, dec!(20));
        assert_eq!(balances[1].consumed_qty, dec!(0));
    }

    #[test]
    fn lock_requires_every_line_fully_consumed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut consumed = HashMap::new();
        consumed.insert(a, dec!(100));

        let partial = requisition_balances(&lines(&[(a, dec!(100)), (b, dec!(20))]), &consumed);
        assert!(!is_locked(&partial));

        consumed.insert(b, dec!(20));
        let full = requisition_balances(&lines(&[(a, dec!(100)), (b, dec!(20))]), &consumed);
        assert!(is_locked(&full));

        assert!(!is_locked(&[]));
    }

    #[test]
    fn overconsumption_is_reported_with_row_index() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut consumed = HashMap::new();
        consumed.insert(b, dec!(25));

        let balances = requisition_balances(&lines(&[(a, dec!(10)), (b, dec!(20))]), &consumed);
        let err = check_no_overconsumption(&balances).unwrap_err();
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn reconciliation_outstanding_quantities() {
        let rec = ItemReconciliation {
            estimated_qty: dec!(500),
            requisitioned_qty: dec!(300),
            purchased_qty: dec!(180),
            received_qty: dec!(50),
            issued_qty: dec!(20),
        };
        assert_eq!(rec.purchase_outstanding(), dec!(120));
        assert_eq!(rec.receipt_outstanding(), dec!(130));
    }
}
