use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use tracing::{debug, error, warn};

use crate::entities::cancel_record::{self, Entity as CancelRecord};
use crate::entities::return_order::{self, Column, Entity as ReturnOrder};
use crate::entities::return_order_line::{self, Entity as ReturnOrderLine};
use crate::errors::ServiceError;
use crate::models::aggregate::ReturnOrderAggregate;
use crate::models::diff::{LineChanges, LineFieldChange, OrderChanges, OrderFieldChange};
use crate::models::status::{StatusConf, StatusReturn};

/// Actor, timestamp and optional version fence applied to every header write.
#[derive(Debug, Clone)]
pub struct HeaderAudit {
    pub actor: String,
    pub at: DateTime<Utc>,
    /// When set, the write only lands while the stored `version` still matches.
    pub expected_version: Option<i32>,
}

impl HeaderAudit {
    pub fn new(actor: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            actor: actor.into(),
            at,
            expected_version: None,
        }
    }

    pub fn with_expected_version(mut self, version: Option<i32>) -> Self {
        self.expected_version = version;
        self
    }
}

fn storage_failure(operation: &str, order_no: &str, e: DbErr) -> ServiceError {
    error!(operation = %operation, order_no = %order_no, error = %e, "Return order storage operation failed");
    ServiceError::DatabaseError(e)
}

fn insert_failure(operation: &str, order_no: &str, e: DbErr) -> ServiceError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = e.sql_err() {
        warn!(operation = %operation, order_no = %order_no, detail = %detail, "Duplicate key on insert");
        return ServiceError::Conflict(format!("return order {} already exists", order_no));
    }
    storage_failure(operation, order_no, e)
}

/// Why a guarded header write affected no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissedWrite {
    Gone,
    Cancelled,
    StaleVersion { expected: i32, found: i32 },
    Status(StatusConf),
}

impl MissedWrite {
    fn into_error(self, order_no: &str) -> ServiceError {
        match self {
            MissedWrite::Gone => ServiceError::not_found(order_no),
            MissedWrite::Cancelled => ServiceError::already_cancelled(order_no),
            MissedWrite::StaleVersion { expected, found } => ServiceError::Conflict(format!(
                "order {} was modified concurrently (expected version {}, found {})",
                order_no, expected, found
            )),
            MissedWrite::Status(status) => ServiceError::Conflict(format!(
                "order {} is in status {} and cannot be changed",
                order_no, status
            )),
        }
    }
}

fn header_assignment(change: &OrderFieldChange) -> (Column, SimpleExpr) {
    match change.clone() {
        OrderFieldChange::SoNo(v) => (Column::SoNo, Expr::value(v)),
        OrderFieldChange::SrNo(v) => (Column::SrNo, Expr::value(v)),
        OrderFieldChange::TrackingNo(v) => (Column::TrackingNo, Expr::value(v)),
        OrderFieldChange::CustomerId(v) => (Column::CustomerId, Expr::value(v)),
        OrderFieldChange::ChannelId(v) => (Column::ChannelId, Expr::value(v)),
        OrderFieldChange::WarehouseId(v) => (Column::WarehouseId, Expr::value(v)),
        OrderFieldChange::Logistic(v) => (Column::Logistic, Expr::value(v)),
        OrderFieldChange::Reason(v) => (Column::Reason, Expr::value(v)),
        OrderFieldChange::SoStatusId(v) => (Column::SoStatusId, Expr::value(v)),
        OrderFieldChange::MkpStatusId(v) => (Column::MkpStatusId, Expr::value(v)),
        OrderFieldChange::OptStatusId(v) => (Column::OptStatusId, Expr::value(v)),
        OrderFieldChange::AxStatusId(v) => (Column::AxStatusId, Expr::value(v)),
        OrderFieldChange::PlatfStatusId(v) => (Column::PlatfStatusId, Expr::value(v)),
        OrderFieldChange::StatusCheckId(v) => (Column::StatusCheckId, Expr::value(v)),
        OrderFieldChange::CheckBy(v) => (Column::CheckBy, Expr::value(v)),
    }
}

fn line_assignment(change: &LineFieldChange) -> (return_order_line::Column, SimpleExpr) {
    use return_order_line::Column as L;

    match change.clone() {
        LineFieldChange::ItemName(v) => (L::ItemName, Expr::value(v)),
        LineFieldChange::Qty(v) => (L::Qty, Expr::value(v)),
        LineFieldChange::ReturnQty(v) => (L::ReturnQty, Expr::value(v)),
        LineFieldChange::CheckQty(v) => (L::CheckQty, Expr::value(v)),
        LineFieldChange::Price(v) => (L::Price, Expr::value(v)),
        LineFieldChange::AlterSku(v) => (L::AlterSku, Expr::value(v)),
        LineFieldChange::TrackingNo(v) => (L::TrackingNo, Expr::value(v)),
    }
}

fn header_active_model(m: &return_order::Model) -> return_order::ActiveModel {
    return_order::ActiveModel {
        order_no: Set(m.order_no.clone()),
        so_no: Set(m.so_no.clone()),
        sr_no: Set(m.sr_no.clone()),
        tracking_no: Set(m.tracking_no.clone()),
        customer_id: Set(m.customer_id.clone()),
        channel_id: Set(m.channel_id),
        warehouse_id: Set(m.warehouse_id),
        logistic: Set(m.logistic.clone()),
        reason: Set(m.reason.clone()),
        so_status_id: Set(m.so_status_id),
        mkp_status_id: Set(m.mkp_status_id),
        status_return_id: Set(m.status_return_id),
        status_conf_id: Set(m.status_conf_id),
        opt_status_id: Set(m.opt_status_id),
        ax_status_id: Set(m.ax_status_id),
        platf_status_id: Set(m.platf_status_id),
        status_check_id: Set(m.status_check_id),
        cancel_id: Set(m.cancel_id),
        create_by: Set(m.create_by.clone()),
        create_date: Set(m.create_date),
        update_by: Set(m.update_by.clone()),
        update_date: Set(m.update_date),
        confirm_by: Set(m.confirm_by.clone()),
        confirm_date: Set(m.confirm_date),
        check_by: Set(m.check_by.clone()),
        version: Set(m.version),
    }
}

fn line_active_model(m: &return_order_line::Model) -> return_order_line::ActiveModel {
    return_order_line::ActiveModel {
        order_no: Set(m.order_no.clone()),
        sku: Set(m.sku.clone()),
        line_no: Set(m.line_no),
        item_name: Set(m.item_name.clone()),
        qty: Set(m.qty),
        return_qty: Set(m.return_qty),
        check_qty: Set(m.check_qty),
        price: Set(m.price),
        alter_sku: Set(m.alter_sku.clone()),
        tracking_no: Set(m.tracking_no.clone()),
        create_by: Set(m.create_by.clone()),
        create_date: Set(m.create_date),
        update_by: Set(m.update_by.clone()),
        update_date: Set(m.update_date),
    }
}

/// Persistence for the return order aggregate (header, lines, cancel records).
///
/// Every method takes the connection to run on, so the same calls work against
/// the pool or inside a transaction handed out by `TransactionCoordinator`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReturnOrderRepository;

impl ReturnOrderRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn exists<C: ConnectionTrait>(&self, db: &C, order_no: &str) -> Result<bool, ServiceError> {
        let found: Option<String> = ReturnOrder::find_by_id(order_no.to_string())
            .select_only()
            .column(Column::OrderNo)
            .into_tuple()
            .one(db)
            .await
            .map_err(|e| storage_failure("exists", order_no, e))?;
        Ok(found.is_some())
    }

    pub async fn find_header<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
    ) -> Result<Option<return_order::Model>, ServiceError> {
        ReturnOrder::find_by_id(order_no.to_string())
            .one(db)
            .await
            .map_err(|e| storage_failure("find_header", order_no, e))
    }

    /// Lines in creation order.
    pub async fn find_lines<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
    ) -> Result<Vec<return_order_line::Model>, ServiceError> {
        ReturnOrderLine::find()
            .filter(return_order_line::Column::OrderNo.eq(order_no))
            .order_by_asc(return_order_line::Column::LineNo)
            .all(db)
            .await
            .map_err(|e| storage_failure("find_lines", order_no, e))
    }

    pub async fn get<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
    ) -> Result<ReturnOrderAggregate, ServiceError> {
        let header = self
            .find_header(db, order_no)
            .await?
            .ok_or_else(|| ServiceError::not_found(order_no))?;
        let lines = self.find_lines(db, order_no).await?;
        Ok(ReturnOrderAggregate { header, lines })
    }

    /// Inserts the header and then every line. Run it inside `run_atomic` so a
    /// failing line leaves nothing behind.
    pub async fn create<C: ConnectionTrait>(
        &self,
        db: &C,
        header: &return_order::Model,
        lines: &[return_order_line::Model],
    ) -> Result<(), ServiceError> {
        if self.exists(db, &header.order_no).await? {
            return Err(ServiceError::Conflict(format!(
                "return order {} already exists",
                header.order_no
            )));
        }

        ReturnOrder::insert(header_active_model(header))
            .exec_without_returning(db)
            .await
            .map_err(|e| insert_failure("insert_header", &header.order_no, e))?;

        self.insert_lines(db, &header.order_no, lines).await?;
        debug!(order_no = %header.order_no, lines = lines.len(), "Inserted return order");
        Ok(())
    }

    pub async fn insert_lines<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        lines: &[return_order_line::Model],
    ) -> Result<(), ServiceError> {
        for line in lines {
            ReturnOrderLine::insert(line_active_model(line))
                .exec_without_returning(db)
                .await
                .map_err(|e| match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::Conflict(format!(
                        "line {} already exists on order {}",
                        line.sku, order_no
                    )),
                    _ => storage_failure("insert_line", order_no, e),
                })?;
        }
        Ok(())
    }

    async fn guarded_header_update<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        assignments: Vec<(Column, SimpleExpr)>,
        audit: &HeaderAudit,
        guard: Condition,
        operation: &str,
    ) -> Result<u64, ServiceError> {
        let mut update = ReturnOrder::update_many()
            .col_expr(Column::UpdateBy, Expr::value(Some(audit.actor.clone())))
            .col_expr(Column::UpdateDate, Expr::value(Some(audit.at)))
            .col_expr(Column::Version, Expr::col(Column::Version).add(1));
        for (column, expr) in assignments {
            update = update.col_expr(column, expr);
        }

        let mut condition = Condition::all().add(Column::OrderNo.eq(order_no)).add(guard);
        if let Some(version) = audit.expected_version {
            condition = condition.add(Column::Version.eq(version));
        }

        let result = update
            .filter(condition)
            .exec(db)
            .await
            .map_err(|e| storage_failure(operation, order_no, e))?;
        Ok(result.rows_affected)
    }

    /// Zero affected rows means the row is gone or the guard no longer holds.
    async fn classify_missed_update<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        audit: &HeaderAudit,
    ) -> Result<MissedWrite, ServiceError> {
        Ok(match self.find_header(db, order_no).await? {
            None => MissedWrite::Gone,
            Some(current) if current.status_conf_id == StatusConf::Cancel => MissedWrite::Cancelled,
            Some(current) => match audit.expected_version {
                Some(expected) if expected != current.version => MissedWrite::StaleVersion {
                    expected,
                    found: current.version,
                },
                _ => MissedWrite::Status(current.status_conf_id),
            },
        })
    }

    /// Writes the changed header fields plus `update_by`/`update_date`.
    /// Cancelled orders are never written. An empty change set writes nothing.
    pub async fn update_header<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        changes: &OrderChanges,
        audit: &HeaderAudit,
    ) -> Result<(), ServiceError> {
        if changes.is_empty() {
            return Ok(());
        }
        let assignments = changes.iter().map(header_assignment).collect();
        self.write_editable_header(db, order_no, assignments, audit, "update_header")
            .await
    }

    /// Bumps audit columns and version without changing business fields; used
    /// when only lines changed.
    pub async fn touch_header<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        audit: &HeaderAudit,
    ) -> Result<(), ServiceError> {
        self.write_editable_header(db, order_no, Vec::new(), audit, "touch_header")
            .await
    }

    async fn write_editable_header<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        assignments: Vec<(Column, SimpleExpr)>,
        audit: &HeaderAudit,
        operation: &str,
    ) -> Result<(), ServiceError> {
        let guard = Condition::all().add(Column::StatusConfId.ne(StatusConf::Cancel.to_value()));
        let rows = self
            .guarded_header_update(db, order_no, assignments, audit, guard, operation)
            .await?;
        if rows == 0 {
            return Err(self
                .classify_missed_update(db, order_no, audit)
                .await?
                .into_error(order_no));
        }
        Ok(())
    }

    /// Moves a draft to `Confirm`. Fails unless the stored status is `Draft`.
    pub async fn mark_confirmed<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        audit: &HeaderAudit,
    ) -> Result<(), ServiceError> {
        let assignments = vec![
            (Column::StatusConfId, Expr::value(StatusConf::Confirm.to_value())),
            (Column::ConfirmBy, Expr::value(Some(audit.actor.clone()))),
            (Column::ConfirmDate, Expr::value(Some(audit.at))),
        ];
        let guard = Condition::all().add(Column::StatusConfId.eq(StatusConf::Draft.to_value()));
        let rows = self
            .guarded_header_update(db, order_no, assignments, audit, guard, "mark_confirmed")
            .await?;
        if rows == 0 {
            return Err(match self.classify_missed_update(db, order_no, audit).await? {
                MissedWrite::Status(_) => ServiceError::not_in_draft(order_no),
                other => other.into_error(order_no),
            });
        }
        Ok(())
    }

    /// Links `cancel_id` and moves the order to `Cancel`/`Cancelled`. Returns
    /// the affected row count; zero means the order vanished, was already
    /// cancelled, or its version moved.
    pub async fn mark_cancelled<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        cancel_id: i32,
        audit: &HeaderAudit,
    ) -> Result<u64, ServiceError> {
        let assignments = vec![
            (Column::StatusConfId, Expr::value(StatusConf::Cancel.to_value())),
            (Column::StatusReturnId, Expr::value(StatusReturn::Cancelled.to_value())),
            (Column::CancelId, Expr::value(Some(cancel_id))),
        ];
        let guard = Condition::all()
            .add(Column::StatusConfId.ne(StatusConf::Cancel.to_value()))
            .add(Column::CancelId.is_null());
        self.guarded_header_update(db, order_no, assignments, audit, guard, "mark_cancelled")
            .await
    }

    pub async fn update_line<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        sku: &str,
        changes: &LineChanges,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        use return_order_line::Column as L;

        if changes.is_empty() {
            return Ok(());
        }

        let mut update = ReturnOrderLine::update_many()
            .col_expr(L::UpdateBy, Expr::value(Some(actor.to_string())))
            .col_expr(L::UpdateDate, Expr::value(Some(at)));
        for change in changes.iter() {
            let (column, expr) = line_assignment(change);
            update = update.col_expr(column, expr);
        }

        let result = update
            .filter(L::OrderNo.eq(order_no))
            .filter(L::Sku.eq(sku))
            .exec(db)
            .await
            .map_err(|e| storage_failure("update_line", order_no, e))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "line {} not found on order {}",
                sku, order_no
            )));
        }
        Ok(())
    }

    pub async fn delete_line<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        sku: &str,
    ) -> Result<u64, ServiceError> {
        use return_order_line::Column as L;

        let result = ReturnOrderLine::delete_many()
            .filter(Condition::all().add(L::OrderNo.eq(order_no)).add(L::Sku.eq(sku)))
            .exec(db)
            .await
            .map_err(|e| storage_failure("delete_line", order_no, e))?;
        Ok(result.rows_affected)
    }

    /// Removes lines, then the header. Deleting an absent order succeeds and
    /// reports zero rows. Cancel records are kept.
    pub async fn delete<C: ConnectionTrait>(&self, db: &C, order_no: &str) -> Result<u64, ServiceError> {
        ReturnOrderLine::delete_many()
            .filter(return_order_line::Column::OrderNo.eq(order_no))
            .exec(db)
            .await
            .map_err(|e| storage_failure("delete_lines", order_no, e))?;

        let result = ReturnOrder::delete_many()
            .filter(Column::OrderNo.eq(order_no))
            .exec(db)
            .await
            .map_err(|e| storage_failure("delete_header", order_no, e))?;
        Ok(result.rows_affected)
    }

    pub async fn insert_cancel_record<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
        cancel_by: &str,
        remark: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<cancel_record::Model, ServiceError> {
        cancel_record::ActiveModel {
            ref_id: Set(order_no.to_string()),
            cancel_by: Set(cancel_by.to_string()),
            cancel_date: Set(at),
            remark: Set(remark),
            cancel_status: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| storage_failure("insert_cancel_record", order_no, e))
    }

    /// Cancel records written for `order_no`, oldest first.
    pub async fn cancel_records_for<C: ConnectionTrait>(
        &self,
        db: &C,
        order_no: &str,
    ) -> Result<Vec<cancel_record::Model>, ServiceError> {
        CancelRecord::find()
            .filter(cancel_record::Column::RefId.eq(order_no))
            .order_by_asc(cancel_record::Column::CancelId)
            .all(db)
            .await
            .map_err(|e| storage_failure("cancel_records_for", order_no, e))
    }
}
