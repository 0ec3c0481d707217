use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Confirmation state of a return order header (`status_conf_id`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum StatusConf {
    #[sea_orm(num_value = 1)]
    Draft,
    #[sea_orm(num_value = 2)]
    Confirm,
    #[sea_orm(num_value = 3)]
    Cancel,
}

impl StatusConf {
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusConf::Cancel)
    }
}

/// Return-progress state of a return order header (`status_return_id`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
pub enum StatusReturn {
    #[sea_orm(num_value = 1)]
    Pending,
    #[sea_orm(num_value = 2)]
    Cancelled,
}

impl StatusReturn {
    pub fn is_terminal(self) -> bool {
        matches!(self, StatusReturn::Cancelled)
    }
}
