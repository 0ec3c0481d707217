use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::status::{StatusConf, StatusReturn};

/// Header row of a return order. Status and audit columns are written only
/// through the repository so the workflow rules stay in one place.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_no: String,
    pub so_no: String,
    pub sr_no: Option<String>,
    pub tracking_no: Option<String>,
    pub customer_id: String,
    pub channel_id: i32,
    pub warehouse_id: i32,
    pub logistic: String,
    pub reason: String,

    pub so_status_id: Option<i32>,
    pub mkp_status_id: Option<i32>,
    pub status_return_id: StatusReturn,
    pub status_conf_id: StatusConf,
    pub opt_status_id: Option<i32>,
    pub ax_status_id: Option<i32>,
    pub platf_status_id: Option<i32>,
    pub status_check_id: Option<i32>,

    pub cancel_id: Option<i32>,

    pub create_by: String,
    pub create_date: DateTime<Utc>,
    pub update_by: Option<String>,
    pub update_date: Option<DateTime<Utc>>,
    pub confirm_by: Option<String>,
    pub confirm_date: Option<DateTime<Utc>>,
    pub check_by: Option<String>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::return_order_line::Entity")]
    Lines,
    #[sea_orm(
        belongs_to = "super::cancel_record::Entity",
        from = "Column::CancelId",
        to = "super::cancel_record::Column::CancelId"
    )]
    CancelRecord,
}

impl Related<super::return_order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::cancel_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CancelRecord.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
