use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::create_return_order_command::{ensure_unique_skus, NewReturnLine};
use crate::{
    commands::Command,
    errors::ServiceError,
    models::{
        diff::{LinePatch, OrderPatch},
        ReturnOrderAggregate,
    },
    services::return_orders::ReturnOrderService,
};

/// Partial update of a return order. Every header field is optional; lines
/// can be patched by SKU, added, or removed in the same request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateReturnOrderCommand {
    #[validate(length(min = 1, message = "Order number is required"))]
    pub order_no: String,
    #[validate(length(min = 1, message = "Updater is required"))]
    pub update_by: String,
    #[serde(flatten)]
    pub header: OrderPatch,
    #[serde(default)]
    pub lines: Vec<LinePatch>,
    #[serde(default)]
    pub add_lines: Vec<NewReturnLine>,
    #[serde(default)]
    pub remove_lines: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Version must be positive"))]
    pub expected_version: Option<i32>,
}

fn reject_blank(field: &str, value: &Option<String>) -> Result<(), ServiceError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ServiceError::ValidationError(format!(
            "{} must not be blank",
            field
        ))),
        _ => Ok(()),
    }
}

impl UpdateReturnOrderCommand {
    pub fn new(order_no: impl Into<String>, update_by: impl Into<String>) -> Self {
        Self {
            order_no: order_no.into(),
            update_by: update_by.into(),
            ..Default::default()
        }
    }

    /// Input checks that need no storage access. Whether the addressed SKUs
    /// exist is decided against the stored aggregate.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;

        reject_blank("so_no", &self.header.so_no)?;
        reject_blank("customer_id", &self.header.customer_id)?;
        if let Some(id) = self.header.channel_id.filter(|id| *id < 1) {
            return Err(ServiceError::ValidationError(format!("invalid channel_id {}", id)));
        }
        if let Some(id) = self.header.warehouse_id.filter(|id| *id < 1) {
            return Err(ServiceError::ValidationError(format!("invalid warehouse_id {}", id)));
        }

        ensure_unique_skus(self.lines.iter().map(|l| l.sku.as_str()))?;
        ensure_unique_skus(self.remove_lines.iter().map(String::as_str))?;
        for line in &self.add_lines {
            line.check()?;
        }
        ensure_unique_skus(self.add_lines.iter().map(|l| l.sku.as_str()))?;

        let removed: HashSet<&str> = self.remove_lines.iter().map(String::as_str).collect();
        if let Some(patch) = self.lines.iter().find(|l| removed.contains(l.sku.as_str())) {
            return Err(ServiceError::ValidationError(format!(
                "line {} cannot be both updated and removed",
                patch.sku
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Command for UpdateReturnOrderCommand {
    type Result = ReturnOrderAggregate;

    async fn execute(self, service: &ReturnOrderService) -> Result<Self::Result, ServiceError> {
        service.update(self).await
    }
}
