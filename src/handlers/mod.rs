pub mod common;
pub mod purchase_orders;
pub mod reports;
pub mod requisitions;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    estimation::EstimationProvider, purchase_orders::PurchaseOrderService,
    reporting::ReportingService, requisitions::RequisitionService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub requisitions: Arc<RequisitionService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub reporting: Arc<ReportingService>,
}

impl AppServices {
    /// Build the service container shared by all handlers.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        estimation: Arc<dyn EstimationProvider>,
    ) -> Self {
        Self {
            requisitions: Arc::new(RequisitionService::new(
                db_pool.clone(),
                event_sender.clone(),
                estimation.clone(),
            )),
            purchase_orders: Arc::new(PurchaseOrderService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            reporting: Arc::new(ReportingService::new(db_pool, estimation)),
        }
    }
}
