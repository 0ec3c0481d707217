pub mod return_order_repository;

pub use return_order_repository::{HeaderAudit, ReturnOrderRepository};
