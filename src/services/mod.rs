pub mod cancellation;
pub mod return_orders;
pub mod status_workflow;

pub use cancellation::{CancelReceipt, CancellationIssuer};
pub use return_orders::ReturnOrderService;
