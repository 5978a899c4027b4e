use crate::{
    db::DbPool,
    entities::{approval_comment, document_sequence, ApprovalStatus, DocumentKind},
    errors::ServiceError,
    events::EventSender,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

pub mod purchaseorders;
pub mod requisitions;

/// Command trait for implementing the Command Pattern
///
/// This trait allows for encapsulating all the logic needed to execute a business operation
/// into a single object that can be validated, executed, and produce events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    ///
    /// # Returns
    /// * `Result<Self::Result, ServiceError>` - The result of command execution or an error
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

/// Draws the next sequential document number for `kind`, formatted as
/// `PREFIX-00001`. Must run inside the transaction that persists the
/// document so the number is assigned exactly once.
pub(crate) async fn next_document_number<C: ConnectionTrait>(
    conn: &C,
    kind: &str,
    prefix: &str,
) -> Result<String, ServiceError> {
    let value = match document_sequence::Entity::find_by_id(kind.to_string())
        .one(conn)
        .await
        .map_err(ServiceError::DatabaseError)?
    {
        Some(seq) => {
            let value = seq.next_value;
            let mut active: document_sequence::ActiveModel = seq.into();
            active.next_value = Set(value + 1);
            active
                .update(conn)
                .await
                .map_err(ServiceError::DatabaseError)?;
            value
        }
        None => {
            document_sequence::ActiveModel {
                kind: Set(kind.to_string()),
                next_value: Set(2),
            }
            .insert(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;
            1
        }
    };

    Ok(format!("{}-{:05}", prefix, value))
}

/// Appends one entry to the shared approval log. The log is append-only;
/// nothing in the system edits or removes rows.
pub(crate) async fn append_approval_comment<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    document_kind: DocumentKind,
    status: ApprovalStatus,
    author_id: Uuid,
    comment: &str,
) -> Result<(), ServiceError> {
    approval_comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        document_id: Set(document_id),
        document_kind: Set(document_kind),
        status: Set(status),
        author_id: Set(author_id),
        comment: Set(comment.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::DatabaseError)?;

    Ok(())
}
