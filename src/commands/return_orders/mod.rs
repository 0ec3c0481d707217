pub mod cancel_return_order_command;
pub mod confirm_return_order_command;
pub mod create_return_order_command;
pub mod update_return_order_command;

pub use cancel_return_order_command::CancelReturnOrderCommand;
pub use confirm_return_order_command::ConfirmReturnOrderCommand;
pub use create_return_order_command::{CreateReturnOrderCommand, NewReturnLine};
pub use update_return_order_command::UpdateReturnOrderCommand;

use rust_decimal::Decimal;
use validator::ValidationError;

fn validate_non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        let mut err = ValidationError::new("range");
        err.message = Some("Price must not be negative".into());
        Err(err)
    }
}
