use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    clock::Clock,
    commands::{
        CancelReturnOrderCommand, ConfirmReturnOrderCommand, CreateReturnOrderCommand,
        UpdateReturnOrderCommand,
    },
    db::TransactionCoordinator,
    entities::{cancel_record, return_order_line},
    errors::ServiceError,
    events::{EventSender, ReturnOrderEvent},
    models::{
        aggregate::check_line_quantities,
        diff::{diff_line, diff_order, LineChanges, OrderChanges},
        ReturnOrderAggregate,
    },
    repositories::{HeaderAudit, ReturnOrderRepository},
    services::{
        cancellation::{CancelReceipt, CancellationIssuer},
        status_workflow,
    },
};

fn record_outcome<T>(operation: &'static str, result: &Result<T, ServiceError>) {
    let outcome = match result {
        Ok(_) => "success".to_string(),
        Err(e) => e.kind().to_string(),
    };
    counter!("return_orders.operation", 1, "operation" => operation, "outcome" => outcome);
}

fn ensure_version(
    aggregate: &ReturnOrderAggregate,
    expected: Option<i32>,
) -> Result<(), ServiceError> {
    match expected {
        Some(v) if v != aggregate.header.version => Err(ServiceError::Conflict(format!(
            "order {} was modified concurrently (expected version {}, found {})",
            aggregate.order_no(),
            v,
            aggregate.header.version
        ))),
        _ => Ok(()),
    }
}

/// Everything an update will write, computed from the stored aggregate
/// before any transaction opens.
#[derive(Debug, Default)]
struct UpdatePlan {
    header: OrderChanges,
    lines: Vec<(String, LineChanges)>,
    removed: Vec<String>,
    added: Vec<return_order_line::Model>,
}

impl UpdatePlan {
    fn is_noop(&self) -> bool {
        self.header.is_empty()
            && self.lines.is_empty()
            && self.removed.is_empty()
            && self.added.is_empty()
    }

    fn changed_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self
            .header
            .field_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for (sku, changes) in &self.lines {
            fields.extend(
                changes
                    .field_names()
                    .into_iter()
                    .map(|f| format!("lines[{}].{}", sku, f)),
            );
        }
        fields.extend(self.removed.iter().map(|sku| format!("lines[{}]-", sku)));
        fields.extend(self.added.iter().map(|l| format!("lines[{}]+", l.sku)));
        fields
    }
}

fn plan_update(
    current: &ReturnOrderAggregate,
    cmd: &UpdateReturnOrderCommand,
    now: DateTime<Utc>,
) -> Result<UpdatePlan, ServiceError> {
    let order_no = current.order_no();
    let mut plan = UpdatePlan {
        header: diff_order(&current.header, &cmd.header),
        ..Default::default()
    };

    for patch in &cmd.lines {
        let line = current.line(&patch.sku).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "line {} does not exist on order {}",
                patch.sku, order_no
            ))
        })?;
        let changes = diff_line(line, patch);
        if changes.is_empty() {
            continue;
        }
        let merged = changes.merged_into(line);
        check_line_quantities(
            &merged.sku,
            merged.qty,
            merged.return_qty,
            merged.check_qty,
            merged.price,
        )?;
        plan.lines.push((patch.sku.clone(), changes));
    }

    for sku in &cmd.remove_lines {
        if current.line(sku).is_none() {
            return Err(ServiceError::ValidationError(format!(
                "line {} does not exist on order {}",
                sku, order_no
            )));
        }
        plan.removed.push(sku.clone());
    }

    let removed: HashSet<&str> = plan.removed.iter().map(String::as_str).collect();
    let mut next_line_no = current.lines.iter().map(|l| l.line_no).max().unwrap_or(0) + 1;
    for line in &cmd.add_lines {
        if current.line(&line.sku).is_some() && !removed.contains(line.sku.as_str()) {
            return Err(ServiceError::Conflict(format!(
                "line {} already exists on order {}",
                line.sku, order_no
            )));
        }
        plan.added
            .push(line.to_model(order_no, next_line_no, &cmd.update_by, now));
        next_line_no += 1;
    }

    if current.lines.len() - plan.removed.len() + plan.added.len() == 0 {
        return Err(ServiceError::ValidationError(format!(
            "order {} must keep at least one line",
            order_no
        )));
    }

    Ok(plan)
}

/// Create/Update/Confirm/Cancel/Delete use cases over the return order
/// aggregate.
#[derive(Clone)]
pub struct ReturnOrderService {
    coordinator: TransactionCoordinator,
    repo: ReturnOrderRepository,
    cancellation: CancellationIssuer,
    clock: Arc<dyn Clock>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReturnOrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: Arc<dyn Clock>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let coordinator = TransactionCoordinator::new(db);
        let repo = ReturnOrderRepository::new();
        let cancellation = CancellationIssuer::new(coordinator.clone(), repo, clock.clone());
        Self {
            coordinator,
            repo,
            cancellation,
            clock,
            event_sender,
        }
    }

    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    pub fn repository(&self) -> ReturnOrderRepository {
        self.repo
    }

    async fn publish(&self, event: ReturnOrderEvent) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to publish return order event");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, order_no: &str) -> Result<ReturnOrderAggregate, ServiceError> {
        self.repo.get(self.coordinator.connection(), order_no).await
    }

    /// Cancel records written for an order, oldest first. Records outlive a
    /// hard delete of the order.
    #[instrument(skip(self))]
    pub async fn cancel_records(
        &self,
        order_no: &str,
    ) -> Result<Vec<cancel_record::Model>, ServiceError> {
        self.repo
            .cancel_records_for(self.coordinator.connection(), order_no)
            .await
    }

    #[instrument(skip(self, cmd), fields(order_no = %cmd.order_no, actor = %cmd.create_by))]
    pub async fn create(
        &self,
        cmd: CreateReturnOrderCommand,
    ) -> Result<ReturnOrderAggregate, ServiceError> {
        let result = self.create_inner(&cmd).await;
        record_outcome("create", &result);

        match &result {
            Ok(order) => {
                info!(order_no = %cmd.order_no, lines = order.lines.len(), "Return order created");
                self.publish(ReturnOrderEvent::OrderCreated {
                    order_no: cmd.order_no.clone(),
                    create_by: cmd.create_by.clone(),
                    line_count: order.lines.len(),
                })
                .await;
            }
            Err(e) => warn!(order_no = %cmd.order_no, error = %e, "Failed to create return order"),
        }
        result
    }

    async fn create_inner(
        &self,
        cmd: &CreateReturnOrderCommand,
    ) -> Result<ReturnOrderAggregate, ServiceError> {
        cmd.check()?;

        let (header, lines) = cmd.to_models(self.clock.now());
        let repo = self.repo;

        self.coordinator
            .run_atomic(move |txn| {
                Box::pin(async move {
                    repo.create(txn, &header, &lines).await?;
                    repo.get(txn, &header.order_no).await
                })
            })
            .await
    }

    #[instrument(skip(self, cmd), fields(order_no = %cmd.order_no, actor = %cmd.update_by))]
    pub async fn update(
        &self,
        cmd: UpdateReturnOrderCommand,
    ) -> Result<ReturnOrderAggregate, ServiceError> {
        let result = self.update_inner(&cmd).await;
        record_outcome("update", &result);

        match result {
            Ok((order, fields)) if fields.is_empty() => {
                info!(order_no = %cmd.order_no, "Update carried no changes");
                Ok(order)
            }
            Ok((order, fields)) => {
                info!(order_no = %cmd.order_no, changed = ?fields, "Return order updated");
                self.publish(ReturnOrderEvent::OrderUpdated {
                    order_no: cmd.order_no.clone(),
                    update_by: cmd.update_by.clone(),
                    changed_fields: fields,
                })
                .await;
                Ok(order)
            }
            Err(e) => {
                warn!(order_no = %cmd.order_no, error = %e, "Failed to update return order");
                Err(e)
            }
        }
    }

    async fn update_inner(
        &self,
        cmd: &UpdateReturnOrderCommand,
    ) -> Result<(ReturnOrderAggregate, Vec<String>), ServiceError> {
        cmd.check()?;

        let current = self
            .repo
            .get(self.coordinator.connection(), &cmd.order_no)
            .await?;
        status_workflow::ensure_can_edit(&current.header)?;
        ensure_version(&current, cmd.expected_version)?;

        let now = self.clock.now();
        let plan = plan_update(&current, cmd, now)?;
        if plan.is_noop() {
            return Ok((current, Vec::new()));
        }

        let fields = plan.changed_fields();
        let audit =
            HeaderAudit::new(cmd.update_by.clone(), now).with_expected_version(cmd.expected_version);
        let order_no = cmd.order_no.clone();
        let repo = self.repo;

        let order = self
            .coordinator
            .run_atomic(move |txn| {
                Box::pin(async move {
                    // Header first: its guarded write fails if the order was
                    // cancelled or changed since it was read.
                    if plan.header.is_empty() {
                        repo.touch_header(txn, &order_no, &audit).await?;
                    } else {
                        repo.update_header(txn, &order_no, &plan.header, &audit).await?;
                    }

                    for (sku, changes) in &plan.lines {
                        repo.update_line(txn, &order_no, sku, changes, &audit.actor, audit.at)
                            .await?;
                    }
                    for sku in &plan.removed {
                        if repo.delete_line(txn, &order_no, sku).await? == 0 {
                            return Err(ServiceError::Conflict(format!(
                                "line {} was removed concurrently from order {}",
                                sku, order_no
                            )));
                        }
                    }
                    repo.insert_lines(txn, &order_no, &plan.added).await?;

                    let order = repo.get(txn, &order_no).await?;
                    if order.lines.is_empty() {
                        return Err(ServiceError::ValidationError(format!(
                            "order {} must keep at least one line",
                            order_no
                        )));
                    }
                    Ok(order)
                })
            })
            .await?;

        Ok((order, fields))
    }

    #[instrument(skip(self, cmd), fields(order_no = %cmd.order_no, actor = %cmd.actor_id))]
    pub async fn confirm(
        &self,
        cmd: ConfirmReturnOrderCommand,
    ) -> Result<ReturnOrderAggregate, ServiceError> {
        let now = self.clock.now();
        let result = self.confirm_inner(&cmd, now).await;
        record_outcome("confirm", &result);

        match &result {
            Ok(_) => {
                info!(order_no = %cmd.order_no, "Return order confirmed");
                self.publish(ReturnOrderEvent::OrderConfirmed {
                    order_no: cmd.order_no.clone(),
                    confirm_by: cmd.actor_id.clone(),
                    confirmed_at: now,
                })
                .await;
            }
            Err(e) => warn!(order_no = %cmd.order_no, error = %e, "Failed to confirm return order"),
        }
        result
    }

    async fn confirm_inner(
        &self,
        cmd: &ConfirmReturnOrderCommand,
        now: DateTime<Utc>,
    ) -> Result<ReturnOrderAggregate, ServiceError> {
        cmd.validate()?;

        let current = self
            .repo
            .get(self.coordinator.connection(), &cmd.order_no)
            .await?;
        status_workflow::ensure_can_confirm(&current.header)?;
        ensure_version(&current, cmd.expected_version)?;

        let audit =
            HeaderAudit::new(cmd.actor_id.clone(), now).with_expected_version(cmd.expected_version);
        let order_no = cmd.order_no.clone();
        let repo = self.repo;

        self.coordinator
            .run_atomic(move |txn| {
                Box::pin(async move {
                    repo.mark_confirmed(txn, &order_no, &audit).await?;
                    repo.get(txn, &order_no).await
                })
            })
            .await
    }

    #[instrument(skip(self, cmd), fields(order_no = %cmd.order_no, actor = %cmd.actor_id))]
    pub async fn cancel(&self, cmd: CancelReturnOrderCommand) -> Result<CancelReceipt, ServiceError> {
        let result = match cmd.validate() {
            Ok(()) => {
                self.cancellation
                    .cancel(
                        &cmd.order_no,
                        &cmd.actor_id,
                        cmd.remark.clone(),
                        cmd.expected_version,
                    )
                    .await
            }
            Err(e) => Err(e.into()),
        };
        record_outcome("cancel", &result);

        match &result {
            Ok(receipt) => {
                self.publish(ReturnOrderEvent::OrderCancelled {
                    order_no: cmd.order_no.clone(),
                    cancel_id: receipt.cancel_id,
                    cancel_by: cmd.actor_id.clone(),
                    cancelled_at: receipt.cancelled_at,
                })
                .await;
            }
            Err(e) => warn!(order_no = %cmd.order_no, error = %e, "Failed to cancel return order"),
        }
        result
    }

    /// Hard delete of the order and its lines. Meant for erroneous data, not
    /// for business cancellation.
    #[instrument(skip(self))]
    pub async fn delete(&self, order_no: &str) -> Result<(), ServiceError> {
        let result = self.delete_inner(order_no).await;
        record_outcome("delete", &result);

        match &result {
            Ok(()) => {
                info!(order_no = %order_no, "Return order deleted");
                self.publish(ReturnOrderEvent::OrderDeleted {
                    order_no: order_no.to_string(),
                })
                .await;
            }
            Err(ServiceError::NotFound(_)) => {
                warn!(order_no = %order_no, "Delete requested for unknown return order")
            }
            Err(e) => error!(order_no = %order_no, error = %e, "Failed to delete return order"),
        }
        result
    }

    async fn delete_inner(&self, order_no: &str) -> Result<(), ServiceError> {
        if !self.repo.exists(self.coordinator.connection(), order_no).await? {
            return Err(ServiceError::not_found(order_no));
        }

        let repo = self.repo;
        let order_no = order_no.to_string();
        self.coordinator
            .run_atomic(move |txn| {
                Box::pin(async move {
                    repo.delete(txn, &order_no).await?;
                    Ok(())
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::NewReturnLine;
    use crate::entities::return_order;
    use crate::models::diff::LinePatch;
    use crate::models::status::{StatusConf, StatusReturn};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn aggregate() -> ReturnOrderAggregate {
        let now = Utc::now();
        let line = |sku: &str, line_no| return_order_line::Model {
            order_no: "AB0001".into(),
            sku: sku.into(),
            line_no,
            item_name: "Kettle".into(),
            qty: 10,
            return_qty: 3,
            check_qty: None,
            price: dec!(199.05),
            alter_sku: None,
            tracking_no: None,
            create_by: "alice".into(),
            create_date: now,
            update_by: None,
            update_date: None,
        };
        ReturnOrderAggregate {
            header: return_order::Model {
                order_no: "AB0001".into(),
                so_no: "SO-1".into(),
                sr_no: None,
                tracking_no: None,
                customer_id: "CUST-1".into(),
                channel_id: 1,
                warehouse_id: 1,
                logistic: "FLASH".into(),
                reason: "damaged".into(),
                so_status_id: None,
                mkp_status_id: None,
                status_return_id: StatusReturn::Pending,
                status_conf_id: StatusConf::Draft,
                opt_status_id: None,
                ax_status_id: None,
                platf_status_id: None,
                status_check_id: None,
                cancel_id: None,
                create_by: "alice".into(),
                create_date: now,
                update_by: None,
                update_date: None,
                confirm_by: None,
                confirm_date: None,
                check_by: None,
                version: 1,
            },
            lines: vec![line("SKU1", 1), line("SKU2", 2)],
        }
    }

    fn new_line(sku: &str) -> NewReturnLine {
        NewReturnLine {
            sku: sku.into(),
            item_name: "Fan".into(),
            qty: 2,
            return_qty: 1,
            price: dec!(10),
            alter_sku: None,
            tracking_no: None,
        }
    }

    #[test]
    fn identical_values_plan_nothing() {
        let mut cmd = UpdateReturnOrderCommand::new("AB0001", "bob");
        cmd.header.reason = Some("damaged".into());
        cmd.lines.push(LinePatch {
            return_qty: Some(3),
            ..LinePatch::for_sku("SKU1")
        });
        let plan = plan_update(&aggregate(), &cmd, Utc::now()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn merged_line_must_respect_quantities() {
        let mut cmd = UpdateReturnOrderCommand::new("AB0001", "bob");
        cmd.lines.push(LinePatch {
            qty: Some(2),
            ..LinePatch::for_sku("SKU1")
        });
        assert_matches!(
            plan_update(&aggregate(), &cmd, Utc::now()),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn unknown_sku_is_a_validation_error() {
        let mut cmd = UpdateReturnOrderCommand::new("AB0001", "bob");
        cmd.lines.push(LinePatch {
            return_qty: Some(1),
            ..LinePatch::for_sku("NOPE")
        });
        assert_matches!(
            plan_update(&aggregate(), &cmd, Utc::now()),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn added_lines_continue_numbering_and_existing_sku_conflicts() {
        let mut cmd = UpdateReturnOrderCommand::new("AB0001", "bob");
        cmd.add_lines.push(new_line("SKU3"));
        let plan = plan_update(&aggregate(), &cmd, Utc::now()).unwrap();
        assert_eq!(plan.added[0].line_no, 3);
        assert_eq!(plan.added[0].create_by, "bob");
        assert_eq!(plan.changed_fields(), vec!["lines[SKU3]+".to_string()]);

        let mut cmd = UpdateReturnOrderCommand::new("AB0001", "bob");
        cmd.add_lines.push(new_line("SKU1"));
        assert_matches!(
            plan_update(&aggregate(), &cmd, Utc::now()),
            Err(ServiceError::Conflict(_))
        );
    }

    #[test]
    fn removing_every_line_is_rejected() {
        let mut cmd = UpdateReturnOrderCommand::new("AB0001", "bob");
        cmd.remove_lines = vec!["SKU1".into(), "SKU2".into()];
        assert_matches!(
            plan_update(&aggregate(), &cmd, Utc::now()),
            Err(ServiceError::ValidationError(msg)) if msg.contains("at least one line")
        );

        cmd.add_lines.push(new_line("SKU9"));
        let plan = plan_update(&aggregate(), &cmd, Utc::now()).unwrap();
        assert_eq!(plan.removed.len(), 2);
        assert_eq!(plan.added.len(), 1);
    }

    #[test]
    fn stale_version_conflicts() {
        assert!(ensure_version(&aggregate(), None).is_ok());
        assert!(ensure_version(&aggregate(), Some(1)).is_ok());
        assert_matches!(
            ensure_version(&aggregate(), Some(4)),
            Err(ServiceError::Conflict(_))
        );
    }
}
