//! Field-level diffing of partial updates against stored rows.
//!
//! A patch carries one `Option` per updatable column: `None` leaves the column
//! alone, `Some(value)` proposes a new value. Nullable columns use
//! `Option<Option<T>>` so a patch can also clear them. Diffing keeps only the
//! proposals that differ from what is stored; everything here is pure.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::entities::{return_order, return_order_line};

/// Distinguishes an explicit `null` (clear the column) from an absent key.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

fn changed<T: PartialEq + Clone>(proposed: &Option<T>, current: &T) -> Option<T> {
    match proposed {
        Some(value) if value != current => Some(value.clone()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub so_no: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub sr_no: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub tracking_no: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logistic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub so_status_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub mkp_status_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub opt_status_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub ax_status_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub platf_status_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub status_check_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub check_by: Option<Option<String>>,
}

/// One header column that differs from the stored row, with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderFieldChange {
    SoNo(String),
    SrNo(Option<String>),
    TrackingNo(Option<String>),
    CustomerId(String),
    ChannelId(i32),
    WarehouseId(i32),
    Logistic(String),
    Reason(String),
    SoStatusId(Option<i32>),
    MkpStatusId(Option<i32>),
    OptStatusId(Option<i32>),
    AxStatusId(Option<i32>),
    PlatfStatusId(Option<i32>),
    StatusCheckId(Option<i32>),
    CheckBy(Option<String>),
}

impl OrderFieldChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::SoNo(_) => "so_no",
            Self::SrNo(_) => "sr_no",
            Self::TrackingNo(_) => "tracking_no",
            Self::CustomerId(_) => "customer_id",
            Self::ChannelId(_) => "channel_id",
            Self::WarehouseId(_) => "warehouse_id",
            Self::Logistic(_) => "logistic",
            Self::Reason(_) => "reason",
            Self::SoStatusId(_) => "so_status_id",
            Self::MkpStatusId(_) => "mkp_status_id",
            Self::OptStatusId(_) => "opt_status_id",
            Self::AxStatusId(_) => "ax_status_id",
            Self::PlatfStatusId(_) => "platf_status_id",
            Self::StatusCheckId(_) => "status_check_id",
            Self::CheckBy(_) => "check_by",
        }
    }
}

/// Minimal set of header changes; empty means the patch is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderChanges(Vec<OrderFieldChange>);

impl OrderChanges {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderFieldChange> {
        self.0.iter()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.0.iter().map(OrderFieldChange::field_name).collect()
    }
}

impl FromIterator<OrderFieldChange> for OrderChanges {
    fn from_iter<I: IntoIterator<Item = OrderFieldChange>>(iter: I) -> Self {
        OrderChanges(iter.into_iter().collect())
    }
}

pub fn diff_order(current: &return_order::Model, patch: &OrderPatch) -> OrderChanges {
    use OrderFieldChange as F;

    [
        changed(&patch.so_no, &current.so_no).map(F::SoNo),
        changed(&patch.sr_no, &current.sr_no).map(F::SrNo),
        changed(&patch.tracking_no, &current.tracking_no).map(F::TrackingNo),
        changed(&patch.customer_id, &current.customer_id).map(F::CustomerId),
        changed(&patch.channel_id, &current.channel_id).map(F::ChannelId),
        changed(&patch.warehouse_id, &current.warehouse_id).map(F::WarehouseId),
        changed(&patch.logistic, &current.logistic).map(F::Logistic),
        changed(&patch.reason, &current.reason).map(F::Reason),
        changed(&patch.so_status_id, &current.so_status_id).map(F::SoStatusId),
        changed(&patch.mkp_status_id, &current.mkp_status_id).map(F::MkpStatusId),
        changed(&patch.opt_status_id, &current.opt_status_id).map(F::OptStatusId),
        changed(&patch.ax_status_id, &current.ax_status_id).map(F::AxStatusId),
        changed(&patch.platf_status_id, &current.platf_status_id).map(F::PlatfStatusId),
        changed(&patch.status_check_id, &current.status_check_id).map(F::StatusCheckId),
        changed(&patch.check_by, &current.check_by).map(F::CheckBy),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Partial update of a single line, addressed by SKU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePatch {
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_qty: Option<i32>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub check_qty: Option<Option<i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub alter_sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub tracking_no: Option<Option<String>>,
}

impl LinePatch {
    pub fn for_sku(sku: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFieldChange {
    ItemName(String),
    Qty(i32),
    ReturnQty(i32),
    CheckQty(Option<i32>),
    Price(Decimal),
    AlterSku(Option<String>),
    TrackingNo(Option<String>),
}

impl LineFieldChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::ItemName(_) => "item_name",
            Self::Qty(_) => "qty",
            Self::ReturnQty(_) => "return_qty",
            Self::CheckQty(_) => "check_qty",
            Self::Price(_) => "price",
            Self::AlterSku(_) => "alter_sku",
            Self::TrackingNo(_) => "tracking_no",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineChanges(Vec<LineFieldChange>);

impl LineChanges {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LineFieldChange> {
        self.0.iter()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.0.iter().map(LineFieldChange::field_name).collect()
    }

    /// Returns `line` with the changes applied, leaving audit columns as is.
    pub fn merged_into(&self, line: &return_order_line::Model) -> return_order_line::Model {
        let mut merged = line.clone();
        for change in &self.0 {
            match change.clone() {
                LineFieldChange::ItemName(v) => merged.item_name = v,
                LineFieldChange::Qty(v) => merged.qty = v,
                LineFieldChange::ReturnQty(v) => merged.return_qty = v,
                LineFieldChange::CheckQty(v) => merged.check_qty = v,
                LineFieldChange::Price(v) => merged.price = v,
                LineFieldChange::AlterSku(v) => merged.alter_sku = v,
                LineFieldChange::TrackingNo(v) => merged.tracking_no = v,
            }
        }
        merged
    }
}

impl FromIterator<LineFieldChange> for LineChanges {
    fn from_iter<I: IntoIterator<Item = LineFieldChange>>(iter: I) -> Self {
        LineChanges(iter.into_iter().collect())
    }
}

pub fn diff_line(current: &return_order_line::Model, patch: &LinePatch) -> LineChanges {
    use LineFieldChange as F;

    [
        changed(&patch.item_name, &current.item_name).map(F::ItemName),
        changed(&patch.qty, &current.qty).map(F::Qty),
        changed(&patch.return_qty, &current.return_qty).map(F::ReturnQty),
        changed(&patch.check_qty, &current.check_qty).map(F::CheckQty),
        changed(&patch.price, &current.price).map(F::Price),
        changed(&patch.alter_sku, &current.alter_sku).map(F::AlterSku),
        changed(&patch.tracking_no, &current.tracking_no).map(F::TrackingNo),
    ]
    .into_iter()
    .flatten()
    .collect()
}
