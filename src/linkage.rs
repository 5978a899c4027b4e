//! Requisition-to-purchase-order linkage: the selection/deselection
//! algorithm applied while a purchase order is being built.
//!
//! Pure draft-state manipulation. The owning service resolves the source
//! requisition (with balances computed excluding the PO being edited) and
//! the "originally selected" snapshot taken when the PO was opened; this
//! module applies the toggle rules to the in-memory draft.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Membership entry in a draft PO's requisition set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequisitionRef {
    pub requisition_id: Uuid,
    pub requisition_number: String,
    pub requisition_date: NaiveDate,
    pub created_by: Uuid,
}

/// A purchase order line as it exists while the document is being built.
/// `purchase_qty` stays empty until the user fills it; requisition-sourced
/// lines carry the back-reference triple, manual lines carry none of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DraftLine {
    pub item_id: Option<Uuid>,
    pub item_name: String,
    pub unit: String,
    pub boq_qty: Option<Decimal>,
    pub balance_qty: Option<Decimal>,
    pub purchase_qty: Option<Decimal>,
    pub rate: Decimal,
    pub requisition_id: Option<Uuid>,
    pub requisition_number: Option<String>,
    pub requisition_line_id: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
}

impl DraftLine {
    fn is_manual(&self) -> bool {
        self.requisition_id.is_none()
    }
}

/// The mutable draft state of a purchase order under construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PoDraft {
    pub requisitions: Vec<RequisitionRef>,
    pub items: Vec<DraftLine>,
}

/// One requisition line as offered for selection, with its balance computed
/// against every other purchase order.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceLine {
    pub line_id: Uuid,
    pub item_id: Option<Uuid>,
    pub item_name: String,
    pub unit: String,
    pub requested_qty: Decimal,
    pub balance_qty: Decimal,
    pub rate: Decimal,
}

/// An approved requisition as offered to the PO builder.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRequisition {
    pub id: Uuid,
    pub requisition_number: String,
    pub requisition_date: NaiveDate,
    pub created_by: Uuid,
    pub is_locked: bool,
    pub lines: Vec<SourceLine>,
}

/// Removes requisition `requisition_id` from the draft: every line sourced
/// from it and its entry in the requisition set.
pub fn deselect_requisition(draft: &mut PoDraft, requisition_id: Uuid) {
    draft
        .items
        .retain(|line| line.requisition_id != Some(requisition_id));
    draft
        .requisitions
        .retain(|r| r.requisition_id != requisition_id);
}

/// Adds requisition `source` to the draft.
///
/// A locked requisition is selectable only when it belongs to the
/// `originally_selected` snapshot (it was already part of this PO when the
/// PO was opened for editing). Lines already fully consumed elsewhere are
/// not offered again. Pre-existing manual lines are replaced, not merged;
/// lines sourced from other requisitions are kept.
pub fn select_requisition(
    draft: &mut PoDraft,
    source: &SourceRequisition,
    originally_selected: &HashSet<Uuid>,
) -> Result<(), ServiceError> {
    if draft
        .requisitions
        .iter()
        .any(|r| r.requisition_id == source.id)
    {
        return Ok(());
    }

    if source.is_locked && !originally_selected.contains(&source.id) {
        return Err(ServiceError::RequisitionLocked(source.id));
    }

    draft.items.retain(|line| !line.is_manual());

    for line in source.lines.iter().filter(|l| l.balance_qty > Decimal::ZERO) {
        draft.items.push(DraftLine {
            item_id: line.item_id,
            item_name: line.item_name.clone(),
            unit: line.unit.clone(),
            boq_qty: Some(line.requested_qty),
            balance_qty: Some(line.balance_qty),
            purchase_qty: None,
            rate: line.rate,
            requisition_id: Some(source.id),
            requisition_number: Some(source.requisition_number.clone()),
            requisition_line_id: Some(line.line_id),
            delivery_date: None,
        });
    }

    draft.requisitions.push(RequisitionRef {
        requisition_id: source.id,
        requisition_number: source.requisition_number.clone(),
        requisition_date: source.requisition_date,
        created_by: source.created_by,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn source(locked: bool, balances: &[Decimal]) -> SourceRequisition {
        SourceRequisition {
            id: Uuid::new_v4(),
            requisition_number: "REQ-00007".to_string(),
            requisition_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            created_by: Uuid::new_v4(),
            is_locked: locked,
            lines: balances
                .iter()
                .enumerate()
                .map(|(i, balance)| SourceLine {
                    line_id: Uuid::new_v4(),
                    item_id: Some(Uuid::new_v4()),
                    item_name: format!("Item {}", i + 1),
                    unit: "bag".to_string(),
                    requested_qty: dec!(100),
                    balance_qty: *balance,
                    rate: dec!(10),
                })
                .collect(),
        }
    }

    fn manual_line(name: &str) -> DraftLine {
        DraftLine {
            item_id: Some(Uuid::new_v4()),
            item_name: name.to_string(),
            unit: "m3".to_string(),
            boq_qty: None,
            balance_qty: None,
            purchase_qty: Some(dec!(5)),
            rate: dec!(3),
            requisition_id: None,
            requisition_number: None,
            requisition_line_id: None,
            delivery_date: None,
        }
    }

    #[test]
    fn locked_requisition_is_rejected_for_new_selection() {
        let mut draft = PoDraft::default();
        let src = source(true, &[dec!(0)]);
        let err =
            select_requisition(&mut draft, &src, &HashSet::new()).unwrap_err();
        assert_matches!(err, ServiceError::RequisitionLocked(id) if id == src.id);
    }

    #[test]
    fn originally_selected_requisition_is_exempt_from_the_lock() {
        let mut draft = PoDraft::default();
        let src = source(true, &[dec!(40)]);
        let originally: HashSet<Uuid> = [src.id].into_iter().collect();
        select_requisition(&mut draft, &src, &originally).unwrap();
        assert_eq!(draft.requisitions.len(), 1);
        assert_eq!(draft.items.len(), 1);
    }

    #[test]
    fn selection_replaces_manual_lines() {
        let mut draft = PoDraft {
            requisitions: vec![],
            items: vec![manual_line("Sand"), manual_line("Gravel")],
        };
        let src = source(false, &[dec!(100), dec!(60)]);
        select_requisition(&mut draft, &src, &HashSet::new()).unwrap();

        assert_eq!(draft.items.len(), 2);
        assert!(draft.items.iter().all(|l| l.requisition_id == Some(src.id)));
        assert!(draft.items.iter().all(|l| l.purchase_qty.is_none()));
        assert_eq!(draft.items[0].boq_qty, Some(dec!(100)));
        assert_eq!(draft.items[0].balance_qty, Some(dec!(100)));
    }

    #[test]
    fn later_selections_append_alongside_attributed_lines() {
        let mut draft = PoDraft::default();
        let first = source(false, &[dec!(100)]);
        let second = source(false, &[dec!(25)]);
        select_requisition(&mut draft, &first, &HashSet::new()).unwrap();
        select_requisition(&mut draft, &second, &HashSet::new()).unwrap();

        assert_eq!(draft.requisitions.len(), 2);
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.items[0].requisition_id, Some(first.id));
        assert_eq!(draft.items[1].requisition_id, Some(second.id));
    }

    #[test]
    fn fully_consumed_lines_are_not_offered_again() {
        let mut draft = PoDraft::default();
        let src = source(false, &[dec!(0), dec!(15)]);
        select_requisition(&mut draft, &src, &HashSet::new()).unwrap();
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].balance_qty, Some(dec!(15)));
    }

    #[test]
    fn reselecting_an_already_selected_requisition_is_a_no_op() {
        let mut draft = PoDraft::default();
        let src = source(false, &[dec!(10)]);
        select_requisition(&mut draft, &src, &HashSet::new()).unwrap();
        select_requisition(&mut draft, &src, &HashSet::new()).unwrap();
        assert_eq!(draft.requisitions.len(), 1);
        assert_eq!(draft.items.len(), 1);
    }

    #[test]
    fn deselection_removes_lines_and_membership() {
        let mut draft = PoDraft::default();
        let keep = source(false, &[dec!(10)]);
        let drop = source(false, &[dec!(20), dec!(30)]);
        select_requisition(&mut draft, &keep, &HashSet::new()).unwrap();
        select_requisition(&mut draft, &drop, &HashSet::new()).unwrap();

        deselect_requisition(&mut draft, drop.id);

        assert_eq!(draft.requisitions.len(), 1);
        assert_eq!(draft.requisitions[0].requisition_id, keep.id);
        assert_eq!(draft.items.len(), 1);
        assert_eq!(draft.items[0].requisition_id, Some(keep.id));
    }
}
