pub mod cancel_record;
pub mod return_order;
pub mod return_order_line;
