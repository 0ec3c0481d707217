use crate::{errors::ServiceError, services::return_orders::ReturnOrderService};
use async_trait::async_trait;

/// Command trait for implementing the Command Pattern
///
/// Each inbound request is decoded into a command object that validates
/// itself and is executed against the `ReturnOrderService`.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    async fn execute(self, service: &ReturnOrderService) -> Result<Self::Result, ServiceError>;
}

pub mod return_orders;

pub use return_orders::{
    CancelReturnOrderCommand, ConfirmReturnOrderCommand, CreateReturnOrderCommand,
    NewReturnLine, UpdateReturnOrderCommand,
};
