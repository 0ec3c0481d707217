use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_order_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_no: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub sku: String,
    /// Position within the order; lines are always read back in this order.
    pub line_no: i32,
    pub item_name: String,
    pub qty: i32,
    pub return_qty: i32,
    pub check_qty: Option<i32>,
    pub price: Decimal,
    pub alter_sku: Option<String>,
    pub tracking_no: Option<String>,
    pub create_by: String,
    pub create_date: DateTime<Utc>,
    pub update_by: Option<String>,
    pub update_date: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::return_order::Entity",
        from = "Column::OrderNo",
        to = "super::return_order::Column::OrderNo"
    )]
    Order,
}

impl Related<super::return_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
