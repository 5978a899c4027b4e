pub mod estimation;
pub mod purchase_orders;
pub mod reporting;
pub mod requisitions;
