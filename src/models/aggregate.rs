use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{return_order, return_order_line};
use crate::errors::ServiceError;
use crate::models::status::StatusConf;

/// A return order header together with all of its lines, in creation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnOrderAggregate {
    pub header: return_order::Model,
    pub lines: Vec<return_order_line::Model>,
}

impl ReturnOrderAggregate {
    pub fn order_no(&self) -> &str {
        &self.header.order_no
    }

    pub fn status(&self) -> StatusConf {
        self.header.status_conf_id
    }

    pub fn line(&self, sku: &str) -> Option<&return_order_line::Model> {
        self.lines.iter().find(|line| line.sku == sku)
    }
}

/// Enforces `0 < return_qty <= qty`, `price >= 0` and `check_qty >= 0`.
pub fn check_line_quantities(
    sku: &str,
    qty: i32,
    return_qty: i32,
    check_qty: Option<i32>,
    price: Decimal,
) -> Result<(), ServiceError> {
    if return_qty <= 0 {
        return Err(ServiceError::ValidationError(format!(
            "line {}: return quantity must be greater than zero",
            sku
        )));
    }
    if return_qty > qty {
        return Err(ServiceError::ValidationError(format!(
            "line {}: return quantity {} exceeds ordered quantity {}",
            sku, return_qty, qty
        )));
    }
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "line {}: price must not be negative",
            sku
        )));
    }
    if let Some(check) = check_qty {
        if check < 0 {
            return Err(ServiceError::ValidationError(format!(
                "line {}: checked quantity must not be negative",
                sku
            )));
        }
    }
    Ok(())
}
