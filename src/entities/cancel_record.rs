use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit row written when a return order is cancelled.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cancel_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub cancel_id: i32,
    /// `order_no` of the cancelled order.
    pub ref_id: String,
    pub cancel_by: String,
    pub cancel_date: DateTime<Utc>,
    pub remark: Option<String>,
    pub cancel_status: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
