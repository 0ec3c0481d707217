use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    commands::Command,
    errors::ServiceError,
    services::{cancellation::CancelReceipt, return_orders::ReturnOrderService},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelReturnOrderCommand {
    #[validate(length(min = 1, message = "Order number is required"))]
    pub order_no: String,
    #[validate(length(min = 1, message = "Actor is required"))]
    pub actor_id: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Remark is too long"))]
    pub remark: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Version must be positive"))]
    pub expected_version: Option<i32>,
}

impl CancelReturnOrderCommand {
    pub fn new(order_no: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            order_no: order_no.into(),
            actor_id: actor_id.into(),
            remark: None,
            expected_version: None,
        }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = Some(remark.into());
        self
    }
}

#[async_trait]
impl Command for CancelReturnOrderCommand {
    type Result = CancelReceipt;

    async fn execute(self, service: &ReturnOrderService) -> Result<Self::Result, ServiceError> {
        service.cancel(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn remark_and_version_are_optional() {
        let cmd: CancelReturnOrderCommand =
            serde_json::from_str(r#"{"order_no":"AB0001","actor_id":"carol"}"#).unwrap();
        assert!(cmd.validate().is_ok());
        assert_eq!(cmd.remark, None);

        let cmd = CancelReturnOrderCommand::new("AB0001", "carol").with_remark("damaged");
        assert_eq!(cmd.remark.as_deref(), Some("damaged"));
    }

    #[test]
    fn blank_actor_is_rejected() {
        assert!(CancelReturnOrderCommand::new("AB0001", "").validate().is_err());
    }
}
