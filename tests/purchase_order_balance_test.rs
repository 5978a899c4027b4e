//! Balance and lock tests for the requisition -> purchase order chain:
//! partial consumption, full consumption locking, over-consumption
//! rejection, lock release, and approved-PO immutability.

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use siteproc_api::{
    commands::purchaseorders::{
        ApprovePurchaseOrderCommand, CreatePurchaseOrderCommand, DeletePurchaseOrderCommand,
        PurchaseOrderLineInput, SubmitPurchaseOrderCommand, UpdatePurchaseOrderCommand,
    },
    entities::{purchase_order::PurchaseOrderStatus, ItemType, ProcurementType},
    errors::ServiceError,
    linkage::PoDraft,
};
use uuid::Uuid;

fn po_command(
    app: &TestApp,
    requisitions: Vec<Uuid>,
    lines: Vec<PurchaseOrderLineInput>,
) -> CreatePurchaseOrderCommand {
    CreatePurchaseOrderCommand {
        company_id: app.company_id,
        actor_id: app.actor_id,
        purchase_type: ProcurementType::General,
        item_type: ItemType::Material,
        supplier_id: Uuid::new_v4(),
        supplier_name: "Apex Building Supplies".to_string(),
        project_id: None,
        project_name: None,
        order_date: NaiveDate::from_ymd_opt(2026, 3, 5),
        delivery_date: NaiveDate::from_ymd_opt(2026, 3, 25),
        delivery_location: Some("North site store".to_string()),
        mode_of_payment: Some("30 days credit".to_string()),
        approver_id: Some(app.approver_id),
        requisitions,
        lines,
    }
}

fn to_line_inputs(draft: &PoDraft, qty: Decimal) -> Vec<PurchaseOrderLineInput> {
    draft
        .items
        .iter()
        .map(|line| PurchaseOrderLineInput {
            item_id: line.item_id,
            item_name: line.item_name.clone(),
            unit: line.unit.clone(),
            boq_qty: line.boq_qty,
            balance_qty: line.balance_qty,
            purchase_qty: qty,
            rate: line.rate,
            requisition_id: line.requisition_id,
            requisition_number: line.requisition_number.clone(),
            requisition_line_id: line.requisition_line_id,
            delivery_date: line.delivery_date,
        })
        .collect()
}

async fn select_into_draft(app: &TestApp, requisition_id: Uuid) -> PoDraft {
    app.services
        .purchase_orders
        .toggle_requisition(app.company_id, PoDraft::default(), requisition_id, true, None)
        .await
        .expect("select requisition into draft")
}

#[tokio::test]
async fn scenario_a_partial_consumption_leaves_requisition_open() {
    let app = TestApp::new().await;
    let requisition_id = app
        .approved_requisition(vec![app.cement_line(dec!(100))])
        .await;

    let draft = select_into_draft(&app, requisition_id).await;
    assert_eq!(draft.items.len(), 1);
    assert_eq!(draft.items[0].balance_qty, Some(dec!(100)));

    let result = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(60)),
        ))
        .await
        .expect("save PO drawing 60 of 100");
    assert_eq!(result.po_number, "PO-00001");
    assert_eq!(result.total_amount, dec!(600));
    assert!(result.locked_requisitions.is_empty());

    let requisition = app
        .services
        .requisitions
        .get_requisition(&requisition_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!requisition.is_locked);

    // Remaining balance offered to the next PO is 40.
    let next_draft = select_into_draft(&app, requisition_id).await;
    assert_eq!(next_draft.items[0].balance_qty, Some(dec!(40)));
}

#[tokio::test]
async fn scenario_b_full_consumption_locks_the_requisition() {
    let app = TestApp::new().await;
    let requisition_id = app
        .approved_requisition(vec![app.cement_line(dec!(100))])
        .await;

    let draft = select_into_draft(&app, requisition_id).await;
    app.services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(60)),
        ))
        .await
        .unwrap();

    let draft = select_into_draft(&app, requisition_id).await;
    let result = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(40)),
        ))
        .await
        .expect("save PO drawing the remaining 40");
    assert_eq!(result.locked_requisitions, vec![requisition_id]);

    let requisition = app
        .services
        .requisitions
        .get_requisition(&requisition_id)
        .await
        .unwrap()
        .unwrap();
    assert!(requisition.is_locked);

    // A third PO cannot select the locked requisition.
    let err = app
        .services
        .purchase_orders
        .toggle_requisition(
            app.company_id,
            PoDraft::default(),
            requisition_id,
            true,
            None,
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::RequisitionLocked(id) if id == requisition_id);

    // And it disappears from the selectable list.
    let approved = app
        .services
        .requisitions
        .get_approved(&app.company_id, None)
        .await
        .unwrap();
    assert!(approved.iter().all(|r| r.id != requisition_id));
}

#[tokio::test]
async fn scenario_c_overconsumption_is_rejected_before_any_write() {
    let app = TestApp::new().await;
    let requisition_id = app
        .approved_requisition(vec![app.cement_line(dec!(100))])
        .await;

    let draft = select_into_draft(&app, requisition_id).await;
    app.services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(60)),
        ))
        .await
        .unwrap();

    // 50 against a remaining balance of 40.
    let draft = select_into_draft(&app, requisition_id).await;
    let err = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(50)),
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidQuantity(_));

    // No partial write: only the first PO exists and the balance is intact.
    let pos = app
        .services
        .purchase_orders
        .list_purchase_orders(&app.company_id)
        .await
        .unwrap();
    assert_eq!(pos.len(), 1);

    let draft = select_into_draft(&app, requisition_id).await;
    assert_eq!(draft.items[0].balance_qty, Some(dec!(40)));
}

#[tokio::test]
async fn lock_releases_when_the_consuming_purchase_is_removed_or_reduced() {
    let app = TestApp::new().await;
    let requisition_id = app
        .approved_requisition(vec![app.cement_line(dec!(100))])
        .await;

    let draft = select_into_draft(&app, requisition_id).await;
    let po = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(100)),
        ))
        .await
        .unwrap();
    assert_eq!(po.locked_requisitions, vec![requisition_id]);

    // Reducing the consuming line reopens the requisition.
    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&po.id)
        .await
        .unwrap()
        .unwrap();
    let base = po_command(&app, vec![requisition_id], vec![]);
    app.services
        .purchase_orders
        .update_purchase_order(UpdatePurchaseOrderCommand {
            id: po.id,
            actor_id: app.actor_id,
            purchase_type: base.purchase_type,
            item_type: base.item_type,
            supplier_id: base.supplier_id,
            supplier_name: base.supplier_name,
            project_id: None,
            project_name: None,
            order_date: base.order_date,
            delivery_date: base.delivery_date,
            delivery_location: base.delivery_location,
            mode_of_payment: base.mode_of_payment,
            approver_id: base.approver_id,
            requisitions: vec![requisition_id],
            lines: detail
                .1
                .iter()
                .map(|line| PurchaseOrderLineInput {
                    item_id: line.item_id,
                    item_name: line.item_name.clone(),
                    unit: line.unit.clone(),
                    boq_qty: line.boq_qty,
                    balance_qty: line.balance_qty,
                    purchase_qty: dec!(70),
                    rate: line.rate,
                    requisition_id: line.requisition_id,
                    requisition_number: line.requisition_number.clone(),
                    requisition_line_id: line.requisition_line_id,
                    delivery_date: line.delivery_date,
                })
                .collect(),
        })
        .await
        .expect("reduce consuming quantity");

    let requisition = app
        .services
        .requisitions
        .get_requisition(&requisition_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!requisition.is_locked);

    // Deleting the PO releases the rest.
    app.services
        .purchase_orders
        .delete_purchase_order(DeletePurchaseOrderCommand {
            id: po.id,
            actor_id: app.actor_id,
        })
        .await
        .unwrap();

    let draft = select_into_draft(&app, requisition_id).await;
    assert_eq!(draft.items[0].balance_qty, Some(dec!(100)));
}

#[tokio::test]
async fn locked_requisition_stays_selectable_for_the_editing_po() {
    let app = TestApp::new().await;
    let requisition_id = app
        .approved_requisition(vec![app.cement_line(dec!(100))])
        .await;

    let draft = select_into_draft(&app, requisition_id).await;
    let po = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(100)),
        ))
        .await
        .unwrap();

    // Locked for everyone else, still listed for the PO that consumed it.
    let approved = app
        .services
        .requisitions
        .get_approved(&app.company_id, Some(po.id))
        .await
        .unwrap();
    assert!(approved.iter().any(|r| r.id == requisition_id));

    // Toggling it back on while editing that PO is allowed; its own
    // consumption is excluded, so the full balance is offered.
    let draft = app
        .services
        .purchase_orders
        .toggle_requisition(
            app.company_id,
            PoDraft::default(),
            requisition_id,
            true,
            Some(po.id),
        )
        .await
        .expect("originally selected requisition is exempt from the lock");
    assert_eq!(draft.items[0].balance_qty, Some(dec!(100)));
}

#[tokio::test]
async fn requisition_number_without_id_is_a_referential_fault() {
    let app = TestApp::new().await;

    let line = PurchaseOrderLineInput {
        item_id: Some(Uuid::new_v4()),
        item_name: "Cement".to_string(),
        unit: "bag".to_string(),
        boq_qty: None,
        balance_qty: None,
        purchase_qty: dec!(10),
        rate: dec!(10),
        requisition_id: None,
        requisition_number: Some("REQ-00001".to_string()),
        requisition_line_id: None,
        delivery_date: None,
    };

    let err = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(&app, vec![], vec![line]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ReferentialIntegrityFault(_));
}

#[tokio::test]
async fn direct_purchase_orders_have_no_requisition_linkage() {
    let app = TestApp::new().await;

    let line = PurchaseOrderLineInput {
        item_id: Some(Uuid::new_v4()),
        item_name: "Diesel".to_string(),
        unit: "litre".to_string(),
        boq_qty: None,
        balance_qty: None,
        purchase_qty: dec!(200),
        rate: dec!(1.5),
        requisition_id: None,
        requisition_number: None,
        requisition_line_id: None,
        delivery_date: None,
    };

    let result = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(&app, vec![], vec![line]))
        .await
        .expect("direct PO saves without requisitions");
    assert_eq!(result.po_number, "PO-00001");
    assert_eq!(result.total_amount, dec!(300.0));

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&result.id)
        .await
        .unwrap()
        .unwrap();
    assert!(detail.2.is_empty());
    assert!(detail.1[0].requisition_id.is_none());
}

#[tokio::test]
async fn scenario_e_approved_po_accepts_no_edits() {
    let app = TestApp::new().await;
    let requisition_id = app
        .approved_requisition(vec![app.cement_line(dec!(100))])
        .await;

    let draft = select_into_draft(&app, requisition_id).await;
    let po = app
        .services
        .purchase_orders
        .create_purchase_order(po_command(
            &app,
            vec![requisition_id],
            to_line_inputs(&draft, dec!(60)),
        ))
        .await
        .unwrap();

    app.services
        .purchase_orders
        .submit_purchase_order(SubmitPurchaseOrderCommand {
            id: po.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap();
    app.services
        .purchase_orders
        .approve_purchase_order(ApprovePurchaseOrderCommand {
            id: po.id,
            actor_id: app.approver_id,
            comment: "supplier confirmed".to_string(),
        })
        .await
        .unwrap();

    let stored = app
        .services
        .purchase_orders
        .get_purchase_order(&po.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, PurchaseOrderStatus::Approved);

    // No field mutation accepted, regardless of actor.
    let base = po_command(&app, vec![requisition_id], vec![]);
    let err = app
        .services
        .purchase_orders
        .update_purchase_order(UpdatePurchaseOrderCommand {
            id: po.id,
            actor_id: app.approver_id,
            purchase_type: base.purchase_type,
            item_type: base.item_type,
            supplier_id: base.supplier_id,
            supplier_name: "Someone Else".to_string(),
            project_id: None,
            project_name: None,
            order_date: base.order_date,
            delivery_date: base.delivery_date,
            delivery_location: base.delivery_location,
            mode_of_payment: base.mode_of_payment,
            approver_id: base.approver_id,
            requisitions: vec![requisition_id],
            lines: to_line_inputs(&select_into_draft(&app, requisition_id).await, dec!(10)),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // Deletion is refused too.
    let err = app
        .services
        .purchase_orders
        .delete_purchase_order(DeletePurchaseOrderCommand {
            id: po.id,
            actor_id: app.actor_id,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}
