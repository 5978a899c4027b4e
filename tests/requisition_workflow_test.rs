//! Approval workflow tests for requisitions: submission guards, the
//! approve/reject cycle, the frozen window, and the append-only comment
//! trail.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use siteproc_api::{
    commands::requisitions::{
        ApproveRequisitionCommand, ConvertRequisitionToDraftCommand, DeleteRequisitionCommand,
        RejectRequisitionCommand, SubmitRequisitionCommand, UpdateRequisitionCommand,
    },
    entities::ApprovalStatus,
    errors::ServiceError,
};

#[tokio::test]
async fn submission_requires_an_approver() {
    let app = TestApp::new().await;

    let created = app
        .services
        .requisitions
        .create_requisition(app.create_command(vec![app.cement_line(dec!(100))], None))
        .await
        .expect("create requisition");

    let err = app
        .services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::MissingRequiredField(_));

    // Same document with an approver designated goes through.
    let base = app.create_command(vec![app.cement_line(dec!(100))], Some(app.approver_id));
    app.services
        .requisitions
        .update_requisition(UpdateRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            requisition_type: base.requisition_type,
            item_type: base.item_type,
            project_id: None,
            project_name: None,
            requisition_date: base.requisition_date,
            required_by_date: base.required_by_date,
            approver_id: base.approver_id,
            lines: base.lines,
        })
        .await
        .expect("set approver");

    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: Some("please review".to_string()),
        })
        .await
        .expect("submit requisition");

    let requisition = app
        .services
        .requisitions
        .get_requisition(&created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, ApprovalStatus::ApprovalRequest);
}

#[tokio::test]
async fn requisition_numbers_are_sequential() {
    let app = TestApp::new().await;

    let first = app
        .services
        .requisitions
        .create_requisition(app.create_command(vec![app.cement_line(dec!(10))], None))
        .await
        .unwrap();
    let second = app
        .services
        .requisitions
        .create_requisition(app.create_command(vec![app.cement_line(dec!(20))], None))
        .await
        .unwrap();

    assert_eq!(first.requisition_number, "REQ-00001");
    assert_eq!(second.requisition_number, "REQ-00002");
}

#[tokio::test]
async fn amounts_are_derived_from_quantity_and_rate() {
    let app = TestApp::new().await;

    let created = app
        .services
        .requisitions
        .create_requisition(app.create_command(vec![app.cement_line(dec!(100))], None))
        .await
        .unwrap();

    assert_eq!(created.total_amount, dec!(1000));

    let (_, lines) = app
        .services
        .requisitions
        .get_requisition_with_lines(&created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].amount, dec!(1000));
}

#[tokio::test]
async fn approval_requires_designated_actor_and_comment() {
    let app = TestApp::new().await;

    let created = app
        .services
        .requisitions
        .create_requisition(
            app.create_command(vec![app.cement_line(dec!(50))], Some(app.approver_id)),
        )
        .await
        .unwrap();
    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap();

    // Wrong actor.
    let err = app
        .services
        .requisitions
        .approve_requisition(ApproveRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: "fine by me".to_string(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // Right actor, empty comment.
    let err = app
        .services
        .requisitions
        .approve_requisition(ApproveRequisitionCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "  ".to_string(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // Right actor and comment.
    app.services
        .requisitions
        .approve_requisition(ApproveRequisitionCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "quantities match the estimate".to_string(),
        })
        .await
        .unwrap();

    let requisition = app
        .services
        .requisitions
        .get_requisition(&created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, ApprovalStatus::Approved);

    // Approved is terminal.
    let err = app
        .services
        .requisitions
        .approve_requisition(ApproveRequisitionCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "again".to_string(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn reject_then_convert_to_draft_allows_resubmission() {
    let app = TestApp::new().await;

    let created = app
        .services
        .requisitions
        .create_requisition(
            app.create_command(vec![app.cement_line(dec!(30))], Some(app.approver_id)),
        )
        .await
        .unwrap();
    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap();

    app.services
        .requisitions
        .reject_requisition(RejectRequisitionCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "wrong grade of cement".to_string(),
        })
        .await
        .unwrap();

    let requisition = app
        .services
        .requisitions
        .get_requisition(&created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, ApprovalStatus::Rejected);

    app.services
        .requisitions
        .convert_to_draft(ConvertRequisitionToDraftCommand {
            id: created.id,
            actor_id: app.actor_id,
        })
        .await
        .unwrap();

    let requisition = app
        .services
        .requisitions
        .get_requisition(&created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(requisition.status, ApprovalStatus::Draft);
    // Approver selection persists through the reset.
    assert_eq!(requisition.approver_id, Some(app.approver_id));

    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .expect("resubmission after draft reset");
}

#[tokio::test]
async fn document_is_frozen_while_awaiting_approval() {
    let app = TestApp::new().await;

    let created = app
        .services
        .requisitions
        .create_requisition(
            app.create_command(vec![app.cement_line(dec!(10))], Some(app.approver_id)),
        )
        .await
        .unwrap();
    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap();

    let base = app.create_command(vec![app.cement_line(dec!(99))], Some(app.approver_id));
    let err = app
        .services
        .requisitions
        .update_requisition(UpdateRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            requisition_type: base.requisition_type,
            item_type: base.item_type,
            project_id: None,
            project_name: None,
            requisition_date: base.requisition_date,
            required_by_date: base.required_by_date,
            approver_id: base.approver_id,
            lines: base.lines,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let err = app
        .services
        .requisitions
        .delete_requisition(DeleteRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn submission_requires_at_least_one_line() {
    let app = TestApp::new().await;

    // A draft may be saved with zero lines.
    let created = app
        .services
        .requisitions
        .create_requisition(app.create_command(vec![], Some(app.approver_id)))
        .await
        .expect("draft with no lines saves");

    // But it cannot enter approval.
    let err = app
        .services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::MissingRequiredField(_));
}

#[tokio::test]
async fn approval_trail_is_appended_per_decision() {
    let app = TestApp::new().await;

    let created = app
        .services
        .requisitions
        .create_requisition(
            app.create_command(vec![app.cement_line(dec!(5))], Some(app.approver_id)),
        )
        .await
        .unwrap();

    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: Some("first attempt".to_string()),
        })
        .await
        .unwrap();
    app.services
        .requisitions
        .reject_requisition(RejectRequisitionCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "supplier rate looks off".to_string(),
        })
        .await
        .unwrap();
    app.services
        .requisitions
        .convert_to_draft(ConvertRequisitionToDraftCommand {
            id: created.id,
            actor_id: app.actor_id,
        })
        .await
        .unwrap();
    app.services
        .requisitions
        .submit_requisition(SubmitRequisitionCommand {
            id: created.id,
            actor_id: app.actor_id,
            comment: None,
        })
        .await
        .unwrap();
    app.services
        .requisitions
        .approve_requisition(ApproveRequisitionCommand {
            id: created.id,
            actor_id: app.approver_id,
            comment: "rate corrected".to_string(),
        })
        .await
        .unwrap();

    let history = app
        .services
        .requisitions
        .approval_history(&created.id)
        .await
        .unwrap();

    // submit (with comment), reject, approve; the comment-less submit and
    // the draft reset add nothing.
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].status, ApprovalStatus::ApprovalRequest);
    assert_eq!(history[0].author_id, app.actor_id);
    assert_eq!(history[1].status, ApprovalStatus::Rejected);
    assert_eq!(history[1].author_id, app.approver_id);
    assert_eq!(history[2].status, ApprovalStatus::Approved);
    assert_eq!(history[2].comment, "rate corrected");
}
