//! Reporting projection tests: the per-item quantity chain joining
//! estimation, requisitions, purchase orders, and receipts, plus the
//! catalog checks on project-bound material requisitions.

mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use common::TestApp;
use rust_decimal_macros::dec;
use siteproc_api::{
    commands::{
        purchaseorders::{
            receive_purchase_order_command::{AdjustmentType, ReceiptLineInput}, ApprovePurchaseOrderCommand,
            CreatePurchaseOrderCommand, PurchaseOrderLineInput, ReceivePurchaseOrderCommand,
            SubmitPurchaseOrderCommand,
        },
        requisitions::{CreateRequisitionCommand, RequisitionLineInput},
    },
    entities::{ItemType, ProcurementType},
    errors::ServiceError,
    services::estimation::MaterialRequirement,
};
use uuid::Uuid;

#[tokio::test]
async fn procurement_summary_joins_the_whole_quantity_chain() {
    let app = TestApp::new().await;
    let project_id = Uuid::new_v4();
    let cement_id = Uuid::new_v4();

    app.estimation.set_materials(
        project_id,
        vec![MaterialRequirement {
            material_id: cement_id,
            material_name: "Cement".to_string(),
            unit: "bag".to_string(),
            material_rate: dec!(10),
            total_qty: dec!(500),
        }],
    );

    // Project requisition against the BOQ entry.
    app.services
        .requisitions
        .create_requisition(CreateRequisitionCommand {
            company_id: app.company_id,
            actor_id: app.actor_id,
            requisition_type: ProcurementType::Project,
            item_type: ItemType::Material,
            project_id: Some(project_id),
            project_name: Some("Harbour warehouse".to_string()),
            requisition_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            required_by_date: NaiveDate::from_ymd_opt(2026, 3, 20),
            approver_id: Some(app.approver_id),
            lines: vec![RequisitionLineInput {
                item_id: Some(cement_id),
                item_name: "Cement".to_string(),
                unit: "bag".to_string(),
                boq_qty: Some(dec!(500)),
                requested_qty: dec!(300),
                rate: dec!(10),
            }],
        })
        .await
        .expect("create project requisition");

    // Project purchase order covering part of it.
    let po = app
        .services
        .purchase_orders
        .create_purchase_order(CreatePurchaseOrderCommand {
            company_id: app.company_id,
            actor_id: app.actor_id,
            purchase_type: ProcurementType::Project,
            item_type: ItemType::Material,
            supplier_id: Uuid::new_v4(),
            supplier_name: "Apex Building Supplies".to_string(),
            project_id: Some(project_id),
            project_name: Some("Harbour warehouse".to_string()),
            order_date: NaiveDate::from_ymd_opt(2026, 3, 5),
            delivery_date: NaiveDate::from_ymd_opt(2026, 3, 25),
            delivery_location: Some("Harbour site".to_string()),
            mode_of_payment: Some("30 days credit".to_string()),
            approver_id: Some(app.approver_id),
            requisitions: vec![],
            lines: vec![PurchaseOrderLineInput {
                item_id: Some(cement_id),
                item_name: "Cement".to_string(),
                unit: "bag".to_string(),
                boq_qty: Some(dec!(500)),
                balance_qty: None,
                purchase_qty: dec!(180),
                rate: dec!(10),
                requisition_id: None,
                requisition_number: None,
                requisition_line_id: None,
                delivery_date: None,
            }],
        })
        .await
        .expect("create project PO");

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
            comment: "go ahead".to_string(),
        })
        .await
        .unwrap();

    let detail = app
        .services
        .purchase_orders
        .get_purchase_order_detail(&po.id)
        .await
        .unwrap()
        .unwrap();
    app.services
        .purchase_orders
        .receive_purchase_order(ReceivePurchaseOrderCommand {
            id: po.id,
            actor_id: app.actor_id,
            items_received: vec![ReceiptLineInput {
                line_id: detail.1[0].id,
                received_qty: dec!(50),
                adjustment_type: AdjustmentType::Receipt,
            }],
            notes: None,
        })
        .await
        .unwrap();

    let summary = app
        .services
        .reporting
        .procurement_summary(app.company_id, project_id)
        .await
        .unwrap();

    assert_eq!(summary.len(), 1);
    let row = &summary[0];
    assert_eq!(row.item_id, Some(cement_id));
    assert_eq!(row.quantities.estimated_qty, dec!(500));
    assert_eq!(row.quantities.requisitioned_qty, dec!(300));
    assert_eq!(row.quantities.purchased_qty, dec!(180));
    assert_eq!(row.quantities.received_qty, dec!(50));
    assert_eq!(row.quantities.purchase_outstanding(), dec!(120));
    assert_eq!(row.quantities.receipt_outstanding(), dec!(130));
}

#[tokio::test]
async fn project_material_lines_must_match_the_estimation_catalog() {
    let app = TestApp::new().await;
    let project_id = Uuid::new_v4();
    let cement_id = Uuid::new_v4();

    app.estimation.set_materials(
        project_id,
        vec![MaterialRequirement {
            material_id: cement_id,
            material_name: "Cement".to_string(),
            unit: "bag".to_string(),
            material_rate: dec!(10),
            total_qty: dec!(500),
        }],
    );

    let command = |line: RequisitionLineInput| CreateRequisitionCommand {
        company_id: app.company_id,
        actor_id: app.actor_id,
        requisition_type: ProcurementType::Project,
        item_type: ItemType::Material,
        project_id: Some(project_id),
        project_name: Some("Harbour warehouse".to_string()),
        requisition_date: NaiveDate::from_ymd_opt(2026, 3, 2),
        required_by_date: NaiveDate::from_ymd_opt(2026, 3, 20),
        approver_id: None,
        lines: vec![line],
    };

    // Unknown item.
    let err = app
        .services
        .requisitions
        .create_requisition(command(RequisitionLineInput {
            item_id: Some(Uuid::new_v4()),
            item_name: "Bitumen".to_string(),
            unit: "drum".to_string(),
            boq_qty: None,
            requested_qty: dec!(5),
            rate: dec!(90),
        }))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ReferentialIntegrityFault(_));

    // Known item, wrong unit.
    let err = app
        .services
        .requisitions
        .create_requisition(command(RequisitionLineInput {
            item_id: Some(cement_id),
            item_name: "Cement".to_string(),
            unit: "tonne".to_string(),
            boq_qty: Some(dec!(500)),
            requested_qty: dec!(10),
            rate: dec!(10),
        }))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ReferentialIntegrityFault(_));

    // BOQ defaults come pre-filled from the estimation entry.
    let defaults = app
        .services
        .requisitions
        .default_lines_from_estimation(project_id, ItemType::Material)
        .await
        .unwrap();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].item_id, Some(cement_id));
    assert_eq!(defaults[0].boq_qty, Some(dec!(500)));
    assert_eq!(defaults[0].requested_qty, dec!(500));
    assert_eq!(defaults[0].rate, dec!(10));
}
