use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_non_negative_price;
use crate::{
    commands::Command,
    entities::{return_order, return_order_line},
    errors::ServiceError,
    models::{aggregate::check_line_quantities, ReturnOrderAggregate, StatusConf, StatusReturn},
    services::return_orders::ReturnOrderService,
};

/// One line of a new return order, or a line added by an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewReturnLine {
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[serde(default)]
    pub item_name: String,
    pub qty: i32,
    pub return_qty: i32,
    #[validate(custom = "validate_non_negative_price")]
    pub price: Decimal,
    #[serde(default)]
    pub alter_sku: Option<String>,
    #[serde(default)]
    pub tracking_no: Option<String>,
}

impl NewReturnLine {
    /// Field rules plus `0 < return_qty <= qty` and `price >= 0`.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        check_line_quantities(&self.sku, self.qty, self.return_qty, None, self.price)
    }

    pub fn to_model(
        &self,
        order_no: &str,
        line_no: i32,
        create_by: &str,
        now: DateTime<Utc>,
    ) -> return_order_line::Model {
        return_order_line::Model {
            order_no: order_no.to_string(),
            sku: self.sku.clone(),
            line_no,
            item_name: self.item_name.clone(),
            qty: self.qty,
            return_qty: self.return_qty,
            check_qty: None,
            price: self.price,
            alter_sku: self.alter_sku.clone(),
            tracking_no: self.tracking_no.clone(),
            create_by: create_by.to_string(),
            create_date: now,
            update_by: None,
            update_date: None,
        }
    }
}

/// Rejects a batch of new lines that repeats a SKU.
pub(crate) fn ensure_unique_skus<'a>(
    skus: impl IntoIterator<Item = &'a str>,
) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for sku in skus {
        if !seen.insert(sku) {
            return Err(ServiceError::ValidationError(format!(
                "SKU {} appears more than once",
                sku
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReturnOrderCommand {
    #[validate(length(min = 1, max = 64, message = "Order number is required"))]
    pub order_no: String,
    #[validate(length(min = 1, message = "Sales order number is required"))]
    pub so_no: String,
    #[serde(default)]
    pub sr_no: Option<String>,
    #[serde(default)]
    pub tracking_no: Option<String>,
    #[validate(length(min = 1, message = "Customer ID is required"))]
    pub customer_id: String,
    #[validate(range(min = 1, message = "Channel ID is required"))]
    pub channel_id: i32,
    #[validate(range(min = 1, message = "Warehouse ID is required"))]
    pub warehouse_id: i32,
    #[serde(default)]
    pub logistic: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub so_status_id: Option<i32>,
    #[serde(default)]
    pub mkp_status_id: Option<i32>,
    #[validate(length(min = 1, message = "Creator is required"))]
    pub create_by: String,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<NewReturnLine>,
}

impl CreateReturnOrderCommand {
    /// Runs every input check that needs no storage access.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        for line in &self.lines {
            line.check()?;
        }
        ensure_unique_skus(self.lines.iter().map(|l| l.sku.as_str()))
    }

    /// Builds the rows to insert. The header starts in `Draft`/`Pending` and
    /// lines are numbered in submission order.
    pub fn to_models(
        &self,
        now: DateTime<Utc>,
    ) -> (return_order::Model, Vec<return_order_line::Model>) {
        let header = return_order::Model {
            order_no: self.order_no.clone(),
            so_no: self.so_no.clone(),
            sr_no: self.sr_no.clone(),
            tracking_no: self.tracking_no.clone(),
            customer_id: self.customer_id.clone(),
            channel_id: self.channel_id,
            warehouse_id: self.warehouse_id,
            logistic: self.logistic.clone(),
            reason: self.reason.clone(),
            so_status_id: self.so_status_id,
            mkp_status_id: self.mkp_status_id,
            status_return_id: StatusReturn::Pending,
            status_conf_id: StatusConf::Draft,
            opt_status_id: None,
            ax_status_id: None,
            platf_status_id: None,
            status_check_id: None,
            cancel_id: None,
            create_by: self.create_by.clone(),
            create_date: now,
            update_by: None,
            update_date: None,
            confirm_by: None,
            confirm_date: None,
            check_by: None,
            version: 1,
        };

        let lines = self
            .lines
            .iter()
            .zip(1..)
            .map(|(line, line_no)| line.to_model(&self.order_no, line_no, &self.create_by, now))
            .collect();

        (header, lines)
    }
}

#[async_trait]
impl Command for CreateReturnOrderCommand {
    type Result = ReturnOrderAggregate;

    async fn execute(self, service: &ReturnOrderService) -> Result<Self::Result, ServiceError> {
        service.create(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn command() -> CreateReturnOrderCommand {
        CreateReturnOrderCommand {
            order_no: "AB0001".into(),
            so_no: "SO-1".into(),
            sr_no: None,
            tracking_no: None,
            customer_id: "CUST-1".into(),
            channel_id: 1,
            warehouse_id: 1,
            logistic: "FLASH".into(),
            reason: "damaged".into(),
            so_status_id: None,
            mkp_status_id: None,
            create_by: "alice".into(),
            lines: vec![NewReturnLine {
                sku: "SKU1".into(),
                item_name: "Kettle".into(),
                qty: 10,
                return_qty: 3,
                price: dec!(199.05),
                alter_sku: None,
                tracking_no: None,
            }],
        }
    }

    #[test]
    fn accepts_a_well_formed_command() {
        assert!(command().check().is_ok());
    }

    #[test]
    fn rejects_missing_required_fields() {
        let mut cmd = command();
        cmd.customer_id.clear();
        assert_matches!(cmd.check(), Err(ServiceError::ValidationError(_)));

        let mut cmd = command();
        cmd.lines.clear();
        assert_matches!(cmd.check(), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn rejects_bad_lines() {
        let mut cmd = command();
        cmd.lines[0].return_qty = 11;
        assert_matches!(cmd.check(), Err(ServiceError::ValidationError(_)));

        let mut cmd = command();
        cmd.lines[0].price = dec!(-1);
        assert_matches!(cmd.check(), Err(ServiceError::ValidationError(_)));

        let mut cmd = command();
        let dup = cmd.lines[0].clone();
        cmd.lines.push(dup);
        assert_matches!(
            cmd.check(),
            Err(ServiceError::ValidationError(msg)) if msg.contains("SKU1")
        );
    }

    #[test]
    fn models_start_in_draft_with_numbered_lines() {
        let mut cmd = command();
        cmd.lines.push(NewReturnLine {
            sku: "SKU2".into(),
            ..cmd.lines[0].clone()
        });
        let now = Utc::now();
        let (header, lines) = cmd.to_models(now);

        assert_eq!(header.status_conf_id, StatusConf::Draft);
        assert_eq!(header.status_return_id, StatusReturn::Pending);
        assert_eq!(header.version, 1);
        assert_eq!(header.create_date, now);
        assert_eq!(
            lines.iter().map(|l| (l.sku.as_str(), l.line_no)).collect::<Vec<_>>(),
            vec![("SKU1", 1), ("SKU2", 2)]
        );
    }
}
