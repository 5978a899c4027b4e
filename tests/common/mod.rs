#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database};
use siteproc_api::{
    commands::requisitions::{
        ApproveRequisitionCommand, CreateRequisitionCommand, RequisitionLineInput,
        SubmitRequisitionCommand,
    },
    db::{run_migrations, DbPool},
    entities::{ItemType, ProcurementType},
    events::{Event, EventSender},
    handlers::AppServices,
    services::estimation::InMemoryEstimationProvider,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness around an in-memory SQLite database with the embedded
/// migrator applied and the service container wired up.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub estimation: Arc<InMemoryEstimationProvider>,
    pub company_id: Uuid,
    pub actor_id: Uuid,
    pub approver_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps the in-memory database alive and
        // shared across the whole test.
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        opts.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .sqlx_logging(false);

        let db = Database::connect(opts).await.expect("connect sqlite");
        run_migrations(&db).await.expect("run migrations");
        let db = Arc::new(db);

        let (tx, mut rx) = mpsc::channel::<Event>(256);
        let event_task = tokio::spawn(async move { while rx.recv().await.is_some() {} });
        let event_sender = Arc::new(EventSender::new(tx));

        let estimation = Arc::new(InMemoryEstimationProvider::new());
        let services = AppServices::new(db.clone(), event_sender, estimation.clone());

        Self {
            db,
            services,
            estimation,
            company_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            approver_id: Uuid::new_v4(),
            _event_task: event_task,
        }
    }

    pub fn cement_line(&self, requested_qty: Decimal) -> RequisitionLineInput {
        RequisitionLineInput {
            item_id: Some(Uuid::new_v4()),
            item_name: "Cement".to_string(),
            unit: "bag".to_string(),
            boq_qty: Some(dec!(500)),
            requested_qty,
            rate: dec!(10),
        }
    }

    pub fn create_command(
        &self,
        lines: Vec<RequisitionLineInput>,
        approver_id: Option<Uuid>,
    ) -> CreateRequisitionCommand {
        CreateRequisitionCommand {
            company_id: self.company_id,
            actor_id: self.actor_id,
            requisition_type: ProcurementType::General,
            item_type: ItemType::Material,
            project_id: None,
            project_name: None,
            requisition_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            required_by_date: NaiveDate::from_ymd_opt(2026, 3, 20),
            approver_id,
            lines,
        }
    }

    /// Creates a requisition, submits it, and approves it. Returns its id.
    pub async fn approved_requisition(&self, lines: Vec<RequisitionLineInput>) -> Uuid {
        let created = self
            .services
            .requisitions
            .create_requisition(self.create_command(lines, Some(self.approver_id)))
            .await
            .expect("create requisition");

        self.services
            .requisitions
            .submit_requisition(SubmitRequisitionCommand {
                id: created.id,
                actor_id: self.actor_id,
                comment: None,
            })
            .await
            .expect("submit requisition");

        self.services
            .requisitions
            .approve_requisition(ApproveRequisitionCommand {
                id: created.id,
                actor_id: self.approver_id,
                comment: "approved for procurement".to_string(),
            })
            .await
            .expect("approve requisition");

        created.id
    }
}
