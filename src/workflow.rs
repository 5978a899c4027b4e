//! Approval workflow shared by requisitions and purchase orders.
//!
//! The machine is deliberately pure: `(status, action, context) -> Result`
//! with no persistence or rendering concerns. Commands call [`apply`] before
//! touching the store, so an invalid transition never reaches the database.
//! The machine is identical for both document kinds; what else becomes
//! read-only in each state is the owning manager's business.

use uuid::Uuid;

use crate::entities::ApprovalStatus;
use crate::errors::ServiceError;

/// The four edges of the approval graph:
/// `Draft -> ApprovalRequest -> {Approved, Rejected}`, `Rejected -> Draft`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ApprovalAction {
    Submit,
    Approve,
    Reject,
    ConvertToDraft,
}

/// Identity and payload accompanying a transition attempt.
#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    /// Who is attempting the transition.
    pub actor_id: Uuid,
    /// The approver designated on the document, if any.
    pub approver_id: Option<Uuid>,
    /// Comment supplied with the action.
    pub comment: Option<&'a str>,
}

impl<'a> TransitionContext<'a> {
    fn has_comment(&self) -> bool {
        self.comment.map(|c| !c.trim().is_empty()).unwrap_or(false)
    }
}

/// Applies `action` to `status`, returning the new status or the guard
/// failure. `Approved` is terminal.
pub fn apply(
    status: ApprovalStatus,
    action: ApprovalAction,
    ctx: &TransitionContext<'_>,
) -> Result<ApprovalStatus, ServiceError> {
    use ApprovalAction::*;
    use ApprovalStatus::*;

    match (status, action) {
        (Draft, Submit) => {
            if ctx.approver_id.is_none() {
                return Err(ServiceError::MissingRequiredField("approver".to_string()));
            }
            Ok(ApprovalRequest)
        }
        (ApprovalRequest, Approve) => {
            guard_decision(ctx, Approve)?;
            Ok(Approved)
        }
        (ApprovalRequest, Reject) => {
            guard_decision(ctx, Reject)?;
            Ok(Rejected)
        }
        (Rejected, ConvertToDraft) => Ok(Draft),
        (from, action) => Err(ServiceError::InvalidTransition(format!(
            "{} is not valid from status {}",
            action, from
        ))),
    }
}

fn guard_decision(ctx: &TransitionContext<'_>, action: ApprovalAction) -> Result<(), ServiceError> {
    match ctx.approver_id {
        Some(approver) if approver == ctx.actor_id => {}
        _ => {
            return Err(ServiceError::InvalidTransition(format!(
                "only the designated approver may {}",
                action
            )))
        }
    }
    if !ctx.has_comment() {
        return Err(ServiceError::InvalidTransition(format!(
            "a comment is required to {}",
            action
        )));
    }
    Ok(())
}

/// Documents accept field mutation only while Draft or Rejected.
pub fn is_editable(status: ApprovalStatus) -> bool {
    matches!(status, ApprovalStatus::Draft | ApprovalStatus::Rejected)
}

/// Deletion follows the same window as editing.
pub fn is_deletable(status: ApprovalStatus) -> bool {
    is_editable(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn ctx(actor: Uuid, approver: Option<Uuid>, comment: Option<&str>) -> TransitionContext<'_> {
        TransitionContext {
            actor_id: actor,
            approver_id: approver,
            comment,
        }
    }

    #[test]
    fn submit_requires_approver() {
        let actor = Uuid::new_v4();
        let err = apply(
            ApprovalStatus::Draft,
            ApprovalAction::Submit,
            &ctx(actor, None, None),
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::MissingRequiredField(_));

        let next = apply(
            ApprovalStatus::Draft,
            ApprovalAction::Submit,
            &ctx(actor, Some(Uuid::new_v4()), None),
        )
        .unwrap();
        assert_eq!(next, ApprovalStatus::ApprovalRequest);
    }

    #[test]
    fn approve_requires_designated_approver_and_comment() {
        let approver = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let err = apply(
            ApprovalStatus::ApprovalRequest,
            ApprovalAction::Approve,
            &ctx(stranger, Some(approver), Some("ok")),
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::InvalidTransition(_));

        let err = apply(
            ApprovalStatus::ApprovalRequest,
            ApprovalAction::Approve,
            &ctx(approver, Some(approver), Some("   ")),
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::InvalidTransition(_));

        let next = apply(
            ApprovalStatus::ApprovalRequest,
            ApprovalAction::Approve,
            &ctx(approver, Some(approver), Some("looks right")),
        )
        .unwrap();
        assert_eq!(next, ApprovalStatus::Approved);
    }

    #[test]
    fn reject_is_symmetric_with_approve() {
        let approver = Uuid::new_v4();
        let next = apply(
            ApprovalStatus::ApprovalRequest,
            ApprovalAction::Reject,
            &ctx(approver, Some(approver), Some("wrong supplier")),
        )
        .unwrap();
        assert_eq!(next, ApprovalStatus::Rejected);
    }

    #[test]
    fn convert_to_draft_needs_no_comment() {
        let next = apply(
            ApprovalStatus::Rejected,
            ApprovalAction::ConvertToDraft,
            &ctx(Uuid::new_v4(), None, None),
        )
        .unwrap();
        assert_eq!(next, ApprovalStatus::Draft);
    }

    // Every edge outside the documented graph must fail, regardless of how
    // well-formed the context is.
    #[rstest]
    #[case(ApprovalStatus::Draft, ApprovalAction::Approve)]
    #[case(ApprovalStatus::Draft, ApprovalAction::Reject)]
    #[case(ApprovalStatus::Draft, ApprovalAction::ConvertToDraft)]
    #[case(ApprovalStatus::ApprovalRequest, ApprovalAction::Submit)]
    #[case(ApprovalStatus::ApprovalRequest, ApprovalAction::ConvertToDraft)]
    #[case(ApprovalStatus::Approved, ApprovalAction::Submit)]
    #[case(ApprovalStatus::Approved, ApprovalAction::Approve)]
    #[case(ApprovalStatus::Approved, ApprovalAction::Reject)]
    #[case(ApprovalStatus::Approved, ApprovalAction::ConvertToDraft)]
    #[case(ApprovalStatus::Rejected, ApprovalAction::Submit)]
    #[case(ApprovalStatus::Rejected, ApprovalAction::Approve)]
    #[case(ApprovalStatus::Rejected, ApprovalAction::Reject)]
    fn transition_closure(#[case] from: ApprovalStatus, #[case] action: ApprovalAction) {
        let approver = Uuid::new_v4();
        let err = apply(from, action, &ctx(approver, Some(approver), Some("comment"))).unwrap_err();
        assert_matches!(err, ServiceError::InvalidTransition(_));
    }

    #[test]
    fn edit_window_is_draft_or_rejected() {
        assert!(is_editable(ApprovalStatus::Draft));
        assert!(is_editable(ApprovalStatus::Rejected));
        assert!(!is_editable(ApprovalStatus::ApprovalRequest));
        assert!(!is_editable(ApprovalStatus::Approved));
        assert!(is_deletable(ApprovalStatus::Rejected));
        assert!(!is_deletable(ApprovalStatus::Approved));
    }
}
