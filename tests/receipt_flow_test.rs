//! Receipt-driven downstream statuses: Sent/Open via the dispatch path,
//! PartiallyReceived/Closed via recorded receipts. The approval machine
//! never produces these states.

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::TestApp;
use rust_decimal_macros::dec;
use siteproc_api::{
    commands::purchaseorders::{
        receive_purchase_order_command::{AdjustmentType, ReceiptLineInput}, ApprovePurchaseOrderCommand,
        CreatePurchaseOrderCommand, PurchaseOrderLineInput, ReceivePurchaseOrderCommand,
        SubmitPurchaseOrderCommand, UpdateDownstreamStatusCommand,
    },
    entities::{purchase_order::PurchaseOrderStatus, ItemType, ProcurementType},
    errors::ServiceError,
};
use uuid::Uuid;

fn direct_line(name: &str, qty: rust_decimal::Decimal) -> PurchaseOrderLineInput {
    PurchaseOrderLineInput {
        item_id: Some(Uuid::new_v4()),
        item_name: name.to_string(),
        unit: "nos".to_string(),
        boq_qty: None,
        balance_qty: None,
        purchase_qty: qty,
        rate: dec!(25),
        requisition_id: None,
        requisition_number: None,
        requisition_line_id: None,
        delivery_date: None,
    }
}

async fn approved_direct_po(app: &TestApp, lines: Vec<PurchaseOrderLineInput>) -> Uuid {
    let created = app
        .services
        .purchase_orders
        .create_purchase_order(CreatePurchaseOrderCommand {
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
            requisitions: vec![],
            lines,
        })
        .await
        .expect("create PO");

    app.services
        .purchase_orders
        .submit_purchase_order(SubmitPurchaseOrderCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .expect("submit PO");
    app.services
        .purchase_orders
        .approve_purchase_order(ApprovePurchaseOrderCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "confirmed with supplier".to_string(),
        })
        .await
        .expect("approve PO");

    created.id
}

#[tokio::test]
async fn receipts_drive_partially_received_and_closed() {
    let app = TestApp::new().await;
    let po_id = approved_direct_po(
        &app,
        vec![direct_line("Shovels", dec!(10)), direct_line("Helmets", dec!(5))],
    )
    .await;

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&po_id)
        .await
        .unwrap()
        .unwrap();
    let (shovels, helmets) = (detail.1[0].id, detail.1[1].id);

    app.services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po_id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id: shovels,
                received_qty: dec!(10),
                adjustment_type: AdjustmentType::Receipt,
            }],
            notes: None,
        })
        .await
        .unwrap();

    let po = app
        .services
        .purchase_orders
        .get_purchase_order(&po_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);

    app.services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po_id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id: helmets,
                received_qty: dec!(5),
                adjustment_type: AdjustmentType::Receipt,
            }],
            notes: Some("second delivery".to_string()),
        })
        .await
        .unwrap();

    let po = app
        .services
        .purchase_orders
        .get_purchase_order(&po_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Closed);
}

#[tokio::test]
async fn over_receipt_is_rejected() {
    let app = TestApp::new().await;
    let po_id = approved_direct_po(&app, vec![direct_line("Shovels", dec!(10))]).await;

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&po_id)
        .await
        .unwrap()
        .unwrap();

    let err = app
        .services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po_id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id: detail.1[0].id,
                received_qty: dec!(11),
                adjustment_type: AdjustmentType::Receipt,
            }],
            notes: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidQuantity(_));
}

#[tokio::test]
async fn receipts_require_an_approved_purchase_order() {
    let app = TestApp::new().await;

    let created = app
        .services
        .purchase_orders
        .create_purchase_order(CreatePurchaseOrderCommand {
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
            requisitions: vec![],
            lines: vec![direct_line("Shovels", dec!(10))],
        })
        .await
        .unwrap();

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&created.id)
        .await
        .unwrap()
        .unwrap();

    let err = app
        .services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: created.id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id: detail.1[0].id,
                received_qty: dec!(1),
                adjustment_type: AdjustmentType::Receipt,
            }],
            notes: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn dispatch_path_owns_sent_and_open() {
    let app = TestApp::new().await;
    let po_id = approved_direct_po(&app, vec![direct_line("Shovels", dec!(10))]).await;

    app.services
        .purchase_orders
        .update_downstream_status(UpdateDownstreamStatusCommand {
            id: po_id,
            actor_id: app.actor_id,
            new_status: PurchaseOrderStatus::Sent,
        })
        .await
        .unwrap();
    app.services
        .purchase_orders
        .update_downstream_status(UpdateDownstreamStatusCommand {
            id: po_id,
            actor_id: app.actor_id,
            new_status: PurchaseOrderStatus::Open,
        })
        .await
        .unwrap();

    let po = app
        .services
        .purchase_orders
        .get_purchase_order(&po_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::Open);

    // Receipt-owned states cannot be set through the dispatch path.
    let err = app
        .services
        .purchase_orders
        .update_downstream_status(UpdateDownstreamStatusCommand {
            id: po_id,
            actor_id: app.actor_id,
            new_status: PurchaseOrderStatus::Closed,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn returns_reopen_a_closed_purchase_order() {
    let app = TestApp::new().await;
    let po_id = approved_direct_po(&app, vec![direct_line("Shovels", dec!(10))]).await;

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&po_id)
        .await
        .unwrap()
        .unwrap();
    let line_id = detail.1[0].id;

    app.services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po_id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id,
                received_qty: dec!(10),
                adjustment_type: AdjustmentType::Receipt,
            }],
            notes: None,
        })
        .await
        .unwrap();

    // Four damaged units go back to the supplier.
    app.services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po_id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id,
                received_qty: dec!(4),
                adjustment_type: AdjustmentType::Return,
            }],
            notes: Some("damaged in transit".to_string()),
        })
        .await
        .unwrap();

    let po = app
        .services
        .purchase_orders
        .get_purchase_order(&po_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(po.status, PurchaseOrderStatus::PartiallyReceived);

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&po_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.1[0].received_qty, dec!(6));

    // Returning more than was received is rejected.
    let err = app
        .services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po_id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id,
                received_qty: dec!(7),
                adjustment_type: AdjustmentType::Return,
            }],
            notes: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidQuantity(_));
}
