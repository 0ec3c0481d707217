use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::db::TransactionCoordinator;
use crate::errors::ServiceError;
use crate::models::ReturnOrderAggregate;
use crate::repositories::{HeaderAudit, ReturnOrderRepository};
use crate::services::status_workflow;

/// Outcome of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReceipt {
    pub cancel_id: i32,
    pub cancelled_at: DateTime<Utc>,
    pub order: ReturnOrderAggregate,
}

/// Writes the cancel record and links it to the order in one transaction.
#[derive(Clone)]
pub struct CancellationIssuer {
    coordinator: TransactionCoordinator,
    repo: ReturnOrderRepository,
    clock: Arc<dyn Clock>,
}

impl CancellationIssuer {
    pub fn new(
        coordinator: TransactionCoordinator,
        repo: ReturnOrderRepository,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            coordinator,
            repo,
            clock,
        }
    }

    #[instrument(skip(self, remark), fields(order_no = %order_no, cancel_by = %cancel_by))]
    pub async fn cancel(
        &self,
        order_no: &str,
        cancel_by: &str,
        remark: Option<String>,
        expected_version: Option<i32>,
    ) -> Result<CancelReceipt, ServiceError> {
        let current = self
            .repo
            .find_header(self.coordinator.connection(), order_no)
            .await?
            .ok_or_else(|| ServiceError::not_found(order_no))?;
        status_workflow::ensure_can_cancel(&current)?;

        let now = self.clock.now();
        let audit = HeaderAudit::new(cancel_by, now).with_expected_version(expected_version);
        let repo = self.repo;
        let order_no_owned = order_no.to_string();
        let cancel_by_owned = cancel_by.to_string();

        let (cancel_id, order) = self
            .coordinator
            .run_atomic(move |txn| {
                Box::pin(async move {
                    let record = repo
                        .insert_cancel_record(txn, &order_no_owned, &cancel_by_owned, remark, now)
                        .await?;

                    let rows = repo
                        .mark_cancelled(txn, &order_no_owned, record.cancel_id, &audit)
                        .await?;
                    if rows == 0 {
                        // Rolls back the cancel record as well.
                        return Err(match repo.find_header(txn, &order_no_owned).await? {
                            None => ServiceError::Conflict(format!(
                                "order {} was removed before it could be cancelled",
                                order_no_owned
                            )),
                            Some(h) if !status_workflow::can_cancel(&h) => {
                                ServiceError::already_cancelled(&order_no_owned)
                            }
                            Some(_) => ServiceError::Conflict(format!(
                                "order {} was modified concurrently",
                                order_no_owned
                            )),
                        });
                    }

                    let order = repo.get(txn, &order_no_owned).await?;
                    Ok((record.cancel_id, order))
                })
            })
            .await?;

        counter!("return_orders.cancellations", 1);
        info!(order_no = %order_no, cancel_id, "Return order cancelled");

        Ok(CancelReceipt {
            cancel_id,
            cancelled_at: now,
            order,
        })
    }
}
