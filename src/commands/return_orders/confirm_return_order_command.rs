use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    commands::Command, errors::ServiceError, models::ReturnOrderAggregate,
    services::return_orders::ReturnOrderService,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmReturnOrderCommand {
    #[validate(length(min = 1, message = "Order number is required"))]
    pub order_no: String,
    #[validate(length(min = 1, message = "Actor is required"))]
    pub actor_id: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "Version must be positive"))]
    pub expected_version: Option<i32>,
}

impl ConfirmReturnOrderCommand {
    pub fn new(order_no: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            order_no: order_no.into(),
            actor_id: actor_id.into(),
            expected_version: None,
        }
    }
}

#[async_trait]
impl Command for ConfirmReturnOrderCommand {
    type Result = ReturnOrderAggregate;

    async fn execute(self, service: &ReturnOrderService) -> Result<Self::Result, ServiceError> {
        service.confirm(self).await
    }
}
