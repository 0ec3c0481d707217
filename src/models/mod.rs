pub mod aggregate;
pub mod diff;
pub mod status;

pub use aggregate::ReturnOrderAggregate;
pub use status::{StatusConf, StatusReturn};
